//! Module calls: locating the called directory, resolving it with the
//! call's arguments and exposing its outputs to the caller.
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, EvalError, ParseError, ResolutionError};
use crate::frontend::directory::Resolver;
use crate::frontend::meta::{InstanceKey, ModulePath, ID_KEY, META_KEY};
use crate::frontend::scope::Scope;
use crate::frontend::source::SourceBlock;
use crate::value::{Map, Value};
use crate::{Document, Loader};

/// Arguments of a module block that configure the call rather than the
/// called module.
pub const MODULE_META_ARGUMENTS: &[&str] = &[
    "source",
    "version",
    "count",
    "for_each",
    "providers",
    "depends_on",
];

/// Module manifest written by `terraform init`.
#[derive(Debug, Default, Deserialize)]
pub struct Manifest {
    #[serde(rename = "Modules", default)]
    modules: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Source", default)]
    source: String,
    #[serde(rename = "Dir")]
    dir: String,
}

impl Manifest {
    pub const PATH: &'static str = ".terraform/modules/modules.json";

    /// Reads the manifest under `root`, if there is a readable one.
    pub fn load(root: &Path, loader: &dyn Loader) -> Option<Self> {
        let path = root.join(Self::PATH);
        let content = loader.load(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                log::warn!("ignoring malformed module manifest {}: {e}", path.display());
                None
            }
        }
    }

    fn dir_for(&self, key: &str) -> Option<&str> {
        let entry = self.modules.iter().find(|m| m.key == key)?;
        log::debug!("module {key} installed from {} in {}", entry.source, entry.dir);
        Some(&entry.dir)
    }
}

/// What one module block contributes to its caller.
pub(crate) struct ModuleOutcome {
    /// One `module` instance per repetition of the call.
    pub instances: Vec<Map>,
    /// Documents of the called directories, in call order.
    pub contents: Vec<Document>,
    /// Value bound to `module.<label>`.
    pub outputs: Value,
}

impl Resolver<'_> {
    pub(crate) fn call_module(
        &self,
        block: &SourceBlock,
        scope: &Scope,
        dir: &Path,
        module_path: &ModulePath,
        stack: &mut Vec<PathBuf>,
    ) -> Result<ModuleOutcome, Error> {
        let label = block.label(0).ok_or_else(|| {
            Error::eval(
                block.location(),
                EvalError::Unsupported("module block needs a name label".into()),
            )
        })?;
        let expanded = self.blocks().expand(block, scope, label, |key| {
            module_path.address("module", label, key)
        })?;

        let mut instances = Vec::with_capacity(expanded.len());
        let mut contents = Vec::with_capacity(expanded.len());
        let mut outputs = Vec::with_capacity(expanded.len());
        for (iteration, instance) in expanded {
            let source = instance
                .get("source")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ResolutionError::MissingSource {
                    label: label.to_string(),
                })?;
            let target = self.locate(label, &source, dir, module_path)?;
            let args: Map = instance
                .iter()
                .filter(|(k, _)| {
                    k.as_str() != META_KEY
                        && k.as_str() != ID_KEY
                        && !MODULE_META_ARGUMENTS.contains(&k.as_str())
                })
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();

            log::debug!("module {label}: resolving {}", target.display());
            let child_path = module_path.child(label, &iteration.key);
            let result = match self.resolve_dir(&target, Some(args), &child_path, stack) {
                Err(Error::Parse(ParseError::MissingDirectory { .. })) => {
                    return Err(ResolutionError::ModuleNotFound {
                        label: label.to_string(),
                        address: source,
                    }
                    .into())
                }
                other => other?,
            };
            instances.push(instance);
            contents.push(result.document);
            outputs.push((iteration.key, Value::Map(result.outputs)));
        }

        Ok(ModuleOutcome {
            instances,
            contents,
            outputs: collect_outputs(block, outputs),
        })
    }

    /// Directory of a module source. Local paths are relative to the
    /// calling directory; anything else must have been installed by
    /// `terraform init`.
    fn locate(
        &self,
        label: &str,
        source: &str,
        dir: &Path,
        module_path: &ModulePath,
    ) -> Result<PathBuf, Error> {
        if source.starts_with("./") || source.starts_with("../") || Path::new(source).is_absolute() {
            return Ok(dir.join(source));
        }
        let key = module_path.manifest_key(label);
        self.manifest
            .as_ref()
            .and_then(|m| m.dir_for(&key))
            .map(|installed| self.root.join(installed))
            .ok_or_else(|| {
                ResolutionError::ModuleNotFound {
                    label: label.to_string(),
                    address: source.to_string(),
                }
                .into()
            })
    }
}

/// `module.<label>`: the outputs map of a single call, a list of them for
/// `count`, a map of them for `for_each`. Null when the repetition is unknown.
fn collect_outputs(block: &SourceBlock, outputs: Vec<(InstanceKey, Value)>) -> Value {
    let repeated = block.attribute("count").is_some() || block.attribute("for_each").is_some();
    if !repeated {
        return outputs.into_iter().next().map(|(_, v)| v).unwrap_or_default();
    }
    if block.attribute("for_each").is_some() {
        let mut map = Map::new();
        for (key, value) in outputs {
            match key {
                InstanceKey::Key(k) => {
                    map.insert(k.to_template_string().unwrap_or_default(), value);
                }
                _ => return Value::Null,
            }
        }
        return Value::Map(map);
    }
    let mut list = Vec::with_capacity(outputs.len());
    for (key, value) in outputs {
        match key {
            InstanceKey::Index(_) => list.push(value),
            _ => return Value::Null,
        }
    }
    Value::List(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MapLoader, ResolveOptions};

    fn resolve(loader: &MapLoader) -> Result<Document, Error> {
        let options = ResolveOptions::default();
        Resolver::new(Path::new("/work"), loader, &options).resolve()
    }

    fn paths(document: &Document, kind: &str) -> Vec<String> {
        document[kind]
            .iter()
            .map(|i| i[META_KEY].get("path").and_then(Value::as_str).unwrap().to_string())
            .collect()
    }

    #[test]
    fn module_arguments_become_child_variables() {
        let loader = MapLoader::new()
            .with_file(
                "/work/main.tf",
                r#"
module "net" {
  source = "./modules/net"
  cidr   = "10.0.0.0/16"
  count  = 2
}

resource "aws_instance" "web" {
  subnet = module.net[1].subnet
}
"#,
            )
            .with_file(
                "/work/modules/net/main.tf",
                r#"
variable "cidr" {}

resource "aws_vpc" "this" {
  cidr_block = var.cidr
  ws         = terraform.workspace
}

output "subnet" {
  value = cidrsubnet(var.cidr, 8, 1)
}
"#,
            );
        let doc = resolve(&loader).unwrap();
        assert_eq!(paths(&doc, "module"), vec!["module.net[0]", "module.net[1]"]);
        assert_eq!(
            paths(&doc, "aws_vpc"),
            vec!["net[0].aws_vpc.this", "net[1].aws_vpc.this"]
        );
        assert_eq!(doc["aws_vpc"][0]["cidr_block"], Value::from("10.0.0.0/16"));
        assert_eq!(doc["module"][0]["source"], Value::from("./modules/net"));
        assert_eq!(doc["aws_instance"][0]["subnet"], Value::from("10.0.1.0/24"));
        // caller instances come before module contents
        let kinds: Vec<_> = doc.keys().map(String::as_str).collect();
        assert_eq!(kinds, vec!["aws_instance", "module", "aws_vpc"]);
    }

    #[test]
    fn module_scopes_do_not_inherit_caller_variables() {
        let loader = MapLoader::new()
            .with_file(
                "/work/main.tf",
                "variable \"secret\" { default = 1 }\nmodule \"m\" { source = \"./m\" }\n",
            )
            .with_file("/work/m/main.tf", "resource \"x\" \"y\" { v = var.secret }\n");
        assert!(resolve(&loader).is_err());
    }

    #[test]
    fn installed_modules_are_found_through_the_manifest() {
        let loader = MapLoader::new()
            .with_file(
                "/work/main.tf",
                "module \"vpc\" {\n  source  = \"terraform-aws-modules/vpc/aws\"\n  version = \"5.0.0\"\n}\n",
            )
            .with_file(
                "/work/.terraform/modules/modules.json",
                r#"{"Modules":[{"Key":"","Source":"","Dir":"."},{"Key":"vpc","Source":"registry.terraform.io/terraform-aws-modules/vpc/aws","Dir":".terraform/modules/vpc"}]}"#,
            )
            .with_file("/work/.terraform/modules/vpc/main.tf", "resource \"aws_vpc\" \"this\" {}\n");
        let doc = resolve(&loader).unwrap();
        assert_eq!(paths(&doc, "aws_vpc"), vec!["vpc.aws_vpc.this"]);
    }

    #[test]
    fn missing_modules_are_resolution_errors() {
        let loader = MapLoader::new()
            .with_file("/work/main.tf", "module \"gone\" { source = \"./gone\" }\n");
        assert!(matches!(
            resolve(&loader),
            Err(Error::Resolution(ResolutionError::ModuleNotFound { .. }))
        ));

        let loader = MapLoader::new()
            .with_file("/work/main.tf", "module \"remote\" { source = \"git::https://example.com/m.git\" }\n");
        assert!(matches!(
            resolve(&loader),
            Err(Error::Resolution(ResolutionError::ModuleNotFound { .. }))
        ));

        let loader = MapLoader::new().with_file("/work/main.tf", "module \"nosrc\" {}\n");
        assert!(matches!(
            resolve(&loader),
            Err(Error::Resolution(ResolutionError::MissingSource { .. }))
        ));
    }

    #[test]
    fn cycles_report_the_chain() {
        let loader = MapLoader::new()
            .with_file("/work/main.tf", "module \"a\" { source = \"./a\" }\n")
            .with_file("/work/a/main.tf", "module \"b\" { source = \"../b\" }\n")
            .with_file("/work/b/main.tf", "module \"a\" { source = \"../a\" }\n");
        match resolve(&loader) {
            Err(Error::Resolution(ResolutionError::Cycle { chain })) => {
                let chain: Vec<_> = chain.iter().map(|p| p.display().to_string()).collect();
                assert_eq!(chain, vec!["/work", "/work/a", "/work/b", "/work/a"]);
            }
            other => panic!("expected a cycle error, got {other:?}"),
        }
    }

    #[test]
    fn for_each_module_outputs_are_keyed() {
        let block = crate::frontend::source::parse_source(
            "main.tf",
            "module \"m\" {\n  for_each = {}\n}\n",
        )
        .unwrap()
        .blocks
        .remove(0);
        let outputs = vec![(InstanceKey::Key(Value::from("a")), Value::from(1i64))];
        assert_eq!(
            collect_outputs(&block, outputs),
            Value::Map(crate::map! { "a" => 1i64 })
        );
    }
}
