use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::info;
use std::path::{Path, PathBuf};
use tfresolve::{config, resolve_directory, value::Value, Document, FsLoader, ResolveOptions};

#[derive(Parser)]
#[command(name = "tfresolve")]
#[command(about = "Resolve a Terraform configuration directory into JSON", long_about = None)]
struct Cli {
    /// Configuration directory (default: current directory)
    #[arg(value_name = "DIR", default_value = ".")]
    dir: PathBuf,

    /// Set a root variable: --var key=value (repeatable)
    #[arg(long, value_parser = parse_key_val::<String, String>)]
    var: Vec<(String, String)>,

    /// Load variables from a .tfvars file. Can repeat.
    #[arg(long)]
    var_file: Vec<PathBuf>,

    /// Replace attributes that fail to evaluate by null
    #[arg(long)]
    lenient: bool,

    /// Skip files that fail to parse instead of aborting
    #[arg(long)]
    skip_hcl_errors: bool,

    /// Settings file (default: tfresolve.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print instance counts per type instead of the document
    #[arg(long)]
    summary: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let options = build_options(&cli)?;

    let document = resolve_directory(&cli.dir, &FsLoader, &options)
        .with_context(|| format!("resolving {}", cli.dir.display()))?;
    info!(
        "Resolved {} instances of {} types",
        document.values().map(Vec::len).sum::<usize>(),
        document.len()
    );

    if cli.summary {
        print!("{}", summary(&document));
    } else {
        println!("{}", serde_json::to_string_pretty(&document)?);
    }
    Ok(())
}

/// Settings file first, then command-line flags on top.
fn build_options(cli: &Cli) -> Result<ResolveOptions> {
    let settings = match &cli.config {
        Some(path) => Some(
            config::load_config_from_path(path)
                .with_context(|| format!("failed to load {}", path.display()))?
                .ok_or_else(|| anyhow!("{} not found", path.display()))?,
        ),
        None => config::load_config().with_context(|| "failed to load tfresolve.toml")?,
    };
    let base = cli
        .config
        .as_deref()
        .and_then(Path::parent)
        .unwrap_or_else(|| Path::new("."));

    let mut options = match settings {
        Some(settings) => settings.to_options(base),
        None => ResolveOptions::default(),
    };
    options.var_files.extend(cli.var_file.iter().cloned());
    for (k, v) in &cli.var {
        options.vars.insert(k.clone(), Value::from(v.as_str()));
    }
    options.lenient |= cli.lenient;
    if cli.skip_hcl_errors {
        options.stop_on_hcl_error = false;
    }
    Ok(options)
}

fn summary(document: &Document) -> String {
    document
        .iter()
        .map(|(kind, instances)| format!("{kind}: {}\n", instances.len()))
        .collect()
}

fn parse_key_val<K, V>(s: &str) -> Result<(K, V)>
where
    K: std::str::FromStr,
    V: std::str::FromStr,
    <K as std::str::FromStr>::Err: std::fmt::Display,
    <V as std::str::FromStr>::Err: std::fmt::Display,
{
    let pos = s.find('=').ok_or_else(|| anyhow!("expected key=value"))?;
    let key = s[..pos]
        .parse()
        .map_err(|e| anyhow!("failed to parse key: {}", e))?;
    let value = s[pos + 1..]
        .parse()
        .map_err(|e| anyhow!("failed to parse value: {}", e))?;
    Ok((key, value))
}
