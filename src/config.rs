use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::value::{Map, Value};
use crate::ResolveOptions;

/// Settings read from `tfresolve.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Root variable values
    #[serde(default)]
    pub vars: BTreeMap<String, toml::Value>,
    /// Variable files, relative to the configuration file
    #[serde(default)]
    pub var_files: Vec<PathBuf>,
    /// Replace failing attributes by null
    #[serde(default)]
    pub lenient: bool,
    /// Abort on unparsable files (default: true)
    pub stop_on_hcl_error: Option<bool>,
    /// Value of `terraform.workspace`
    pub workspace: Option<String>,
}

impl Settings {
    /// Resolve options described by these settings. Relative var files
    /// are taken relative to `base`.
    pub fn to_options(&self, base: &Path) -> ResolveOptions {
        let defaults = ResolveOptions::default();
        ResolveOptions {
            vars: self
                .vars
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_value(v.clone())))
                .collect::<Map>(),
            var_files: self.var_files.iter().map(|f| base.join(f)).collect(),
            lenient: self.lenient,
            stop_on_hcl_error: self.stop_on_hcl_error.unwrap_or(defaults.stop_on_hcl_error),
            workspace: self.workspace.clone().unwrap_or(defaults.workspace),
        }
    }
}

fn toml_to_value(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(d) => Value::String(d.to_string()),
        toml::Value::Array(a) => Value::List(a.into_iter().map(toml_to_value).collect()),
        toml::Value::Table(t) => Value::Map(t.into_iter().map(|(k, v)| (k, toml_to_value(v))).collect()),
    }
}

/// Load settings from tfresolve.toml in the current directory
pub fn load_config() -> Result<Option<Settings>> {
    load_config_from_path(Path::new("tfresolve.toml"))
}

/// Load settings from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Option<Settings>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let settings: Settings =
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(settings))
}
