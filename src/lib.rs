pub mod config;
pub mod error;
pub mod frontend;
pub mod value;

use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

pub use error::{Error, EvalError, ParseError, ResolutionError};
pub use frontend::Resolver;
use value::Map;

/// Resolved configuration: instances grouped by block type, in first-seen order.
pub type Document = IndexMap<String, Vec<Map>>;

// Loader abstraction: lets callers control how directories are listed and
// files are read.
pub trait Loader {
    /// Regular files directly inside `dir`. A missing directory is
    /// reported as [io::ErrorKind::NotFound].
    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
    fn load(&self, path: &Path) -> io::Result<String>;
}

/// Reads from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLoader;

impl Loader for FsLoader {
    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        Ok(files)
    }

    fn load(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// In-memory file tree, mostly for tests.
#[derive(Debug, Default, Clone)]
pub struct MapLoader {
    files: BTreeMap<PathBuf, String>,
    dirs: BTreeSet<PathBuf>,
}

impl MapLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Registers a directory that exists even when it holds no files.
    pub fn with_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.dirs.insert(path.into());
        self
    }
}

impl Loader for MapLoader {
    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let exists = self.dirs.contains(dir) || self.files.keys().any(|p| p.starts_with(dir));
        if !exists {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such directory: {}", dir.display()),
            ));
        }
        Ok(self
            .files
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .cloned()
            .collect())
    }

    fn load(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("missing file: {}", path.display()),
            )
        })
    }
}

/// Knobs of a resolution run.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Root variable values; they win over every tfvars file.
    pub vars: Map,
    /// Extra variable files, applied after `*.auto.tfvars`.
    pub var_files: Vec<PathBuf>,
    /// Replace failing attribute evaluations by null instead of aborting.
    pub lenient: bool,
    /// Abort on files that fail to parse. When off they are skipped.
    pub stop_on_hcl_error: bool,
    /// Value of `terraform.workspace`.
    pub workspace: String,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        ResolveOptions {
            vars: Map::new(),
            var_files: Vec::new(),
            lenient: false,
            stop_on_hcl_error: true,
            workspace: "default".to_string(),
        }
    }
}

// Pure API: resolve the configuration directory at `path` using a Loader.
pub fn resolve_directory(
    path: &Path,
    loader: &dyn Loader,
    options: &ResolveOptions,
) -> Result<Document, Error> {
    Resolver::new(path, loader, options).resolve()
}

/// Resolves a directory on disk with default options.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Document, Error> {
    resolve_directory(path.as_ref(), &FsLoader, &ResolveOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::meta::{ID_KEY, META_KEY};
    use crate::map;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn p(s: &str) -> PathBuf {
        PathBuf::from(s)
    }

    fn resolve(loader: &MapLoader) -> Result<Document, Error> {
        resolve_directory(&p("/root"), loader, &ResolveOptions::default())
    }

    fn strip_ids(value: &mut Value) {
        match value {
            Value::Map(map) => {
                map.shift_remove(ID_KEY);
                map.values_mut().for_each(strip_ids);
            }
            Value::List(items) => items.iter_mut().for_each(strip_ids),
            _ => {}
        }
    }

    fn counts(document: &Document) -> Vec<(&str, usize)> {
        document.iter().map(|(k, v)| (k.as_str(), v.len())).collect()
    }

    fn meta_field<'d>(instance: &'d Map, field: &str) -> &'d Value {
        instance[META_KEY].get(field).unwrap_or(&Value::Null)
    }

    #[test]
    fn empty_directory_resolves_to_empty_document() {
        let loader = MapLoader::new().with_dir("/root");
        assert!(resolve(&loader).unwrap().is_empty());

        let loader = MapLoader::new().with_file("/root/README.md", "# nothing here");
        assert!(resolve(&loader).unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_a_parse_error() {
        let err = resolve(&MapLoader::new()).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::MissingDirectory { .. })));
        assert!(err.to_string().contains("no such file or directory"));
    }

    #[test]
    fn non_emitted_blocks_leave_no_buckets() {
        let loader = MapLoader::new().with_file(
            "/root/main.tf",
            r#"
terraform {
  required_version = ">= 1.0"
}

provider "aws" {
  region = "us-east-1"
}

variable "x" {}

data "aws_caller_identity" "current" {}

output "x" {
  value = var.x
}

resource "aws_s3_bucket" "none" {
  count = 0
}
"#,
        );
        assert!(resolve(&loader).unwrap().is_empty());
    }

    #[test]
    fn dynamic_content_scenario() {
        let loader = MapLoader::new().with_file(
            "/root/main.tf",
            r#"resource "some_resource" "this" {
  count = 2
  prop1 = "one"

  dynamic "loop_one" {
    for_each = [true, false, null]
    iterator = item

    content {
      other = item.value
    }
  }

  static {
    name = "first"
  }

  prop2 = "two"

  dynamic "loop_two" {
    for_each = [1, 2, 3]

    content {
      other = loop_two.value
    }
  }

  static {
    name = "second"
  }

  dynamic "loop_one" {
    for_each = ["aaa", "bbb", "ccc"]

    content {
      other = loop_one.value
    }
  }

  prop3 = "end"
}
"#,
        );
        let doc = resolve(&loader).unwrap();
        assert_eq!(counts(&doc), vec![("some_resource", 2)]);

        let ids: BTreeSet<_> = doc["some_resource"]
            .iter()
            .map(|i| i[ID_KEY].as_str().map(str::to_string))
            .collect();
        assert_eq!(ids.len(), 2);

        let mut instances: Vec<Value> = doc["some_resource"]
            .iter()
            .cloned()
            .map(Value::Map)
            .collect();
        instances.iter_mut().for_each(strip_ids);
        for instance in &mut instances {
            if let Value::Map(m) = instance {
                if let Some(Value::Map(meta)) = m.get_mut(META_KEY) {
                    meta.shift_remove("path");
                }
            }
        }

        let entry = |line_start: usize, line_end: usize, key: &str, value: Value| {
            let mut m = map! {
                META_KEY => Value::Map(map! {
                    "filename" => "main.tf",
                    "line_start" => line_start,
                    "line_end" => line_end,
                }),
            };
            m.insert(key.to_string(), value);
            Value::Map(m)
        };
        let expected = Value::Map(map! {
            META_KEY => Value::Map(map! {
                "filename" => "main.tf",
                "label" => "some_resource",
                "line_start" => 1usize,
                "line_end" => 41usize,
            }),
            "count" => 2i64,
            "prop1" => "one",
            "prop2" => "two",
            "prop3" => "end",
            "loop_one" => vec![
                entry(9, 11, "other", Value::from(true)),
                entry(9, 11, "other", Value::from(false)),
                entry(9, 11, "other", Value::Null),
                entry(35, 37, "other", Value::from("aaa")),
                entry(35, 37, "other", Value::from("bbb")),
                entry(35, 37, "other", Value::from("ccc")),
            ],
            "loop_two" => vec![
                entry(23, 25, "other", Value::from(1i64)),
                entry(23, 25, "other", Value::from(2i64)),
                entry(23, 25, "other", Value::from(3i64)),
            ],
            "static" => vec![
                entry(14, 16, "name", Value::from("first")),
                entry(28, 30, "name", Value::from("second")),
            ],
        });
        assert_eq!(instances, vec![expected.clone(), expected]);
        assert_eq!(
            meta_field(&doc["some_resource"][1], "path"),
            &Value::from("some_resource.this[1]")
        );
    }

    #[test]
    fn shared_module_labels_union_buckets() {
        let lambda = r#"
variable "name" {}

resource "aws_lambda_function" "this" {
  function_name = var.name
}

resource "aws_lambda_permission" "allow" {
  count = 2
  function_name = var.name
}

output "arn" {
  value = aws_lambda_function.this.arn
}
"#;
        let notify = r#"
variable "env" {}

module "lambda" {
  source = "../lambda"
  name   = "notify-${var.env}"
}

resource "aws_sns_topic" "this" {
  name = var.env
  lambda_arn = module.lambda.arn
}
"#;
        let loader = MapLoader::new()
            .with_file(
                "/root/main.tf",
                r#"
module "notify_slack_qa" {
  source = "./notify"
  env    = "qa"
}

module "notify_slack_saas" {
  source = "./notify"
  env    = "saas"
}
"#,
            )
            .with_file("/root/notify/main.tf", notify)
            .with_file("/root/lambda/main.tf", lambda);

        let doc = resolve(&loader).unwrap();
        let labels: Vec<_> = doc["module"].iter().map(|m| meta_field(m, "label").clone()).collect();
        assert_eq!(
            labels,
            vec![
                Value::from("notify_slack_qa"),
                Value::from("notify_slack_saas"),
                Value::from("lambda"),
                Value::from("lambda"),
            ]
        );
        let mut buckets = counts(&doc);
        buckets.sort();
        assert_eq!(
            buckets,
            vec![
                ("aws_lambda_function", 2),
                ("aws_lambda_permission", 4),
                ("aws_sns_topic", 2),
                ("module", 4),
            ]
        );
        let paths: Vec<_> = doc["aws_lambda_function"]
            .iter()
            .map(|i| meta_field(i, "path").clone())
            .collect();
        assert_eq!(
            paths,
            vec![
                Value::from("notify_slack_qa.lambda.aws_lambda_function.this"),
                Value::from("notify_slack_saas.lambda.aws_lambda_function.this"),
            ]
        );
        assert_eq!(
            meta_field(&doc["module"][2], "path"),
            &Value::from("notify_slack_qa.module.lambda")
        );
        assert_eq!(doc["aws_lambda_function"][1]["function_name"], Value::from("notify-saas"));
        // outputs of a provider-computed attribute stay unknown
        assert_eq!(doc["aws_sns_topic"][0]["lambda_arn"], Value::Null);
    }

    #[test]
    fn addressable_and_nested_meta_differ() {
        let loader = MapLoader::new().with_file(
            "/root/main.tf",
            "resource \"aws_eks_cluster\" \"example\" {\n  vpc_config {\n    subnet_ids = []\n  }\n}\n",
        );
        let doc = resolve(&loader).unwrap();
        let cluster = &doc["aws_eks_cluster"][0];
        let mut keys: Vec<_> = cluster[META_KEY].as_map().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["filename", "label", "line_end", "line_start", "path"]);

        let nested = cluster["vpc_config"].get(META_KEY).unwrap().as_map().unwrap();
        let mut keys: Vec<_> = nested.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["filename", "line_end", "line_start"]);
        assert!(cluster["vpc_config"].get(ID_KEY).is_some());
    }

    #[test]
    fn self_calling_module_is_a_cycle() {
        let loader = MapLoader::new().with_file("/root/main.tf", "module \"me\" { source = \"./\" }\n");
        assert!(matches!(
            resolve(&loader),
            Err(Error::Resolution(ResolutionError::Cycle { .. }))
        ));
    }
}
