//! Instance identity: addresses, `__tfmeta` records and synthetic ids.
use std::sync::atomic::{AtomicU64, Ordering};

use crate::frontend::source::SourceSpan;
use crate::value::{Map, Value};

/// Reserved key holding the source-location record of an instance.
pub const META_KEY: &str = "__tfmeta";
/// Reserved key holding the synthetic id of an instance.
pub const ID_KEY: &str = "id";

/// Hands out run-local ids. One generator is shared by every directory
/// resolved in a run, so ids never collide across modules.
#[derive(Debug, Default)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("tfr-{n:06}")
    }
}

/// Which repetition produced an instance.
#[derive(Debug, Clone, PartialEq)]
pub enum InstanceKey {
    /// Not repeated, or repeated over an unknown collection.
    Single,
    Index(usize),
    Key(Value),
}

impl InstanceKey {
    /// Address suffix: `[0]`, `["name"]` or nothing.
    pub fn suffix(&self) -> String {
        match self {
            InstanceKey::Single => String::new(),
            InstanceKey::Index(i) => format!("[{i}]"),
            InstanceKey::Key(Value::String(s)) => format!("[{s:?}]"),
            InstanceKey::Key(other) => match other.to_template_string() {
                Some(s) => format!("[{s}]"),
                None => format!("[{}]", serde_json::to_string(other).unwrap_or_default()),
            },
        }
    }
}

/// Position of a directory in the module call tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModulePath {
    labels: Vec<String>,
    prefix: String,
}

impl ModulePath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Path of the directory called by `label` from this one.
    pub fn child(&self, label: &str, key: &InstanceKey) -> Self {
        let mut labels = self.labels.clone();
        labels.push(label.to_string());
        ModulePath {
            labels,
            prefix: format!("{}{label}{}.", self.prefix, key.suffix()),
        }
    }

    /// Dotted chain of call labels leading to `label`, as keyed in the
    /// module manifest written by `terraform init`.
    pub fn manifest_key(&self, label: &str) -> String {
        let mut labels = self.labels.clone();
        labels.push(label.to_string());
        labels.join(".")
    }

    /// `<prefix><kind>.<name><suffix>`
    pub fn address(&self, kind: &str, name: &str, key: &InstanceKey) -> String {
        format!("{}{kind}.{name}{}", self.prefix, key.suffix())
    }
}

/// Metadata of an independently addressable instance.
pub fn block_meta(span: &SourceSpan, label: &str, path: &str) -> Value {
    let mut meta = Map::new();
    meta.insert("filename".into(), Value::from(span.filename.as_str()));
    meta.insert("label".into(), Value::from(label));
    meta.insert("line_start".into(), Value::from(span.line_start));
    meta.insert("line_end".into(), Value::from(span.line_end));
    meta.insert("path".into(), Value::from(path));
    Value::Map(meta)
}

/// Metadata of a nested block, which has no address of its own.
pub fn nested_meta(span: &SourceSpan) -> Value {
    let mut meta = Map::new();
    meta.insert("filename".into(), Value::from(span.filename.as_str()));
    meta.insert("line_start".into(), Value::from(span.line_start));
    meta.insert("line_end".into(), Value::from(span.line_end));
    Value::Map(meta)
}

/// Starts an instance map with its metadata and a fresh id.
pub fn stamped(meta: Value, ids: &IdGenerator) -> Map {
    let mut instance = Map::new();
    instance.insert(META_KEY.into(), meta);
    instance.insert(ID_KEY.into(), Value::String(ids.next_id()));
    instance
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> SourceSpan {
        SourceSpan {
            filename: "main.tf".into(),
            line_start: 1,
            line_end: 15,
        }
    }

    #[test]
    fn ids_are_unique() {
        let ids = IdGenerator::new();
        let a = ids.next_id();
        let b = ids.next_id();
        assert_ne!(a, b);
    }

    #[test]
    fn suffixes() {
        assert_eq!(InstanceKey::Single.suffix(), "");
        assert_eq!(InstanceKey::Index(2).suffix(), "[2]");
        assert_eq!(InstanceKey::Key(Value::from("a")).suffix(), "[\"a\"]");
        assert_eq!(InstanceKey::Key(Value::from(3i64)).suffix(), "[3]");
    }

    #[test]
    fn module_paths_chain_labels() {
        let root = ModulePath::root();
        assert_eq!(
            root.address("aws_subnet", "example", &InstanceKey::Index(1)),
            "aws_subnet.example[1]"
        );

        let qa = root.child("notify_slack_qa", &InstanceKey::Single);
        let lambda = qa.child("lambda", &InstanceKey::Key(Value::from("x")));
        assert_eq!(
            lambda.address("aws_lambda_function", "this", &InstanceKey::Single),
            "notify_slack_qa.lambda[\"x\"].aws_lambda_function.this"
        );
        assert_eq!(qa.manifest_key("lambda"), "notify_slack_qa.lambda");
    }

    #[test]
    fn block_meta_has_all_fields() {
        let meta = block_meta(&span(), "aws_eks_cluster", "aws_eks_cluster.example");
        let meta = meta.as_map().unwrap();
        assert_eq!(meta.len(), 5);
        assert_eq!(meta["label"], Value::from("aws_eks_cluster"));
        assert_eq!(meta["line_end"], Value::from(15usize));
    }

    #[test]
    fn nested_meta_omits_label_and_path() {
        let meta = nested_meta(&span());
        let meta = meta.as_map().unwrap();
        assert_eq!(meta.len(), 3);
        assert!(!meta.contains_key("label"));
        assert!(!meta.contains_key("path"));
    }

    #[test]
    fn stamped_instances_start_with_meta_and_id() {
        let ids = IdGenerator::new();
        let instance = stamped(nested_meta(&span()), &ids);
        let keys: Vec<_> = instance.keys().map(String::as_str).collect();
        assert_eq!(keys, vec![META_KEY, ID_KEY]);
    }
}
