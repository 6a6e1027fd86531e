use std::collections::HashMap;

use crate::error::EvalError;
use crate::value::{Map, Value};

/// Names available during expression evaluation.
///
/// Scopes are layered: a child sees every binding of its parent unless it
/// shadows the name. The resolver builds one root scope per directory and
/// layers children on top of it:
/// - `var`, `local`, `path`, `terraform` and placeholders for declared
///   resources, data sources and modules at the directory root
/// - `count.index` or `each.key`/`each.value` for expanded instances
/// - the iterator object inside `dynamic` block content
/// - loop variables of `for` expressions
///
/// # Example
/// ```
/// use tfresolve::frontend::scope::Scope;
/// use tfresolve::value::Value;
///
/// let mut root = Scope::root();
/// root.bind("name", Value::from("world"));
/// let mut child = root.child();
/// child.bind("name", Value::from("bob"));
/// assert_eq!(child.lookup("name").unwrap(), &Value::from("bob"));
/// assert_eq!(root.lookup("name").unwrap(), &Value::from("world"));
/// ```
#[derive(Debug, Default)]
pub struct Scope<'p> {
    parent: Option<&'p Scope<'p>>,
    bindings: HashMap<String, Value>,
}

impl<'p> Scope<'p> {
    pub fn root() -> Scope<'static> {
        Scope {
            parent: None,
            bindings: HashMap::new(),
        }
    }

    pub fn child(&self) -> Scope<'_> {
        Scope {
            parent: Some(self),
            bindings: HashMap::new(),
        }
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.bind(name, value);
        self
    }

    pub fn lookup(&self, name: &str) -> Result<&Value, EvalError> {
        match self.bindings.get(name) {
            Some(value) => Ok(value),
            None => match self.parent {
                Some(parent) => parent.lookup(name),
                None => Err(EvalError::UnknownVariable(name.to_string())),
            },
        }
    }

    /// Binds `count.index` for one `count` iteration.
    pub fn bind_count(&mut self, index: Value) {
        let mut count = Map::new();
        count.insert("index".into(), index);
        self.bind("count", Value::Map(count));
    }

    /// Binds `each.key` and `each.value` for one `for_each` iteration.
    pub fn bind_each(&mut self, key: Value, value: Value) {
        self.bind("each", iteration_object(key, value));
    }
}

/// `{ key = .., value = .. }` as bound for `each` and dynamic iterators.
pub fn iteration_object(key: Value, value: Value) -> Value {
    let mut object = Map::new();
    object.insert("key".into(), key);
    object.insert("value".into(), value);
    Value::Map(object)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_delegates_to_parent() {
        let mut root = Scope::root();
        root.bind("a", Value::from(1i64));
        let child = root.child().with("b", Value::from(2i64));
        assert_eq!(child.lookup("a").unwrap(), &Value::from(1i64));
        assert_eq!(child.lookup("b").unwrap(), &Value::from(2i64));
        assert!(root.lookup("b").is_err());
    }

    #[test]
    fn missing_names_are_eval_errors() {
        let root = Scope::root();
        assert_eq!(
            root.lookup("nope").unwrap_err(),
            EvalError::UnknownVariable("nope".into())
        );
    }

    #[test]
    fn each_binding_exposes_key_and_value() {
        let mut scope = Scope::root();
        scope.bind_each(Value::from("k"), Value::from(3i64));
        let each = scope.lookup("each").unwrap();
        assert_eq!(each.get("key"), Some(&Value::from("k")));
        assert_eq!(each.get("value"), Some(&Value::from(3i64)));
    }
}
