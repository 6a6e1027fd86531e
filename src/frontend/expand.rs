//! Block expansion: `count`, `for_each`, nested blocks and `dynamic` blocks.
use indexmap::IndexMap;

use crate::error::{Error, EvalError};
use crate::frontend::eval::{iterate, Evaluator};
use crate::frontend::meta::{self, IdGenerator, InstanceKey, ID_KEY, META_KEY};
use crate::frontend::scope::{iteration_object, Scope};
use crate::frontend::source::{SourceAttribute, SourceBlock};
use crate::value::{Map, Value};

/// How one instance of a repeated block is bound.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    None,
    Count(Value),
    Each { key: Value, value: Value },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Iteration {
    pub key: InstanceKey,
    pub binding: Binding,
}

impl Iteration {
    fn single(binding: Binding) -> Self {
        Iteration {
            key: InstanceKey::Single,
            binding,
        }
    }

    /// Adds `count`/`each` and `self` to an instance scope.
    pub fn bind(&self, scope: &mut Scope) {
        match &self.binding {
            Binding::None => {}
            Binding::Count(index) => scope.bind_count(index.clone()),
            Binding::Each { key, value } => scope.bind_each(key.clone(), value.clone()),
        }
        scope.bind("self", Value::Null);
    }
}

/// Evaluates attributes and nested blocks of configuration blocks.
pub struct BlockResolver<'a> {
    pub evaluator: &'a Evaluator,
    pub ids: &'a IdGenerator,
    pub lenient: bool,
}

impl BlockResolver<'_> {
    /// Expands a top-level block into one instance per repetition.
    ///
    /// `address` builds the instance path from its repetition key.
    pub fn expand(
        &self,
        block: &SourceBlock,
        scope: &Scope,
        label: &str,
        address: impl Fn(&InstanceKey) -> String,
    ) -> Result<Vec<(Iteration, Map)>, Error> {
        let mut instances = Vec::new();
        for iteration in self.repetitions(block, scope)? {
            let mut child = scope.child();
            iteration.bind(&mut child);
            let meta = meta::block_meta(&block.span, label, &address(&iteration.key));
            let mut instance = meta::stamped(meta, self.ids);
            self.resolve_body(block, &child, &mut instance)?;
            instances.push((iteration, instance));
        }
        Ok(instances)
    }

    /// Repetitions declared by `count` or `for_each`, in iteration order.
    pub fn repetitions(&self, block: &SourceBlock, scope: &Scope) -> Result<Vec<Iteration>, Error> {
        let count = block.attribute("count");
        let for_each = block.attribute("for_each");
        match (count, for_each) {
            (Some(_), Some(_)) => Err(Error::eval(
                block.location(),
                EvalError::InvalidRepetition {
                    kind: "count",
                    message: "\"count\" and \"for_each\" cannot be used together".into(),
                },
            )),
            (Some(attr), None) => {
                let value = self.attribute(block, attr, scope)?;
                count_iterations(value).map_err(|e| Error::eval(block.location(), e))
            }
            (None, Some(attr)) => {
                let value = self.attribute(block, attr, scope)?;
                for_each_iterations(value).map_err(|e| Error::eval(block.location(), e))
            }
            (None, None) => Ok(vec![Iteration::single(Binding::None)]),
        }
    }

    /// Evaluates attributes and nested blocks of `block` into `out`.
    pub fn resolve_body(&self, block: &SourceBlock, scope: &Scope, out: &mut Map) -> Result<(), Error> {
        for attr in &block.attributes {
            if attr.key == ID_KEY || attr.key == META_KEY {
                continue;
            }
            let value = self.attribute(block, attr, scope)?;
            out.insert(attr.key.clone(), value);
        }

        let mut groups: IndexMap<&str, Group> = IndexMap::new();
        for nested in &block.blocks {
            if nested.ident == "dynamic" {
                let (target, entries) = self.dynamic(nested, scope)?;
                if entries.is_empty() {
                    log::debug!("{}: dynamic \"{target}\" produced no entries", nested.location());
                    continue;
                }
                let group = groups.entry(target).or_default();
                group.repeated = true;
                group.entries.extend(entries);
            } else {
                let mut entry = meta::stamped(meta::nested_meta(&nested.span), self.ids);
                self.resolve_body(nested, scope, &mut entry)?;
                groups
                    .entry(nested.ident.as_str())
                    .or_default()
                    .entries
                    .push(Value::Map(entry));
            }
        }

        for (name, group) in groups {
            let value = if !group.repeated && group.entries.len() == 1 {
                group.entries.into_iter().next().unwrap_or_default()
            } else {
                Value::List(group.entries)
            };
            out.insert(name.to_string(), value);
        }
        Ok(())
    }

    /// Expands `dynamic "<target>" { for_each = ..., content { ... } }` into
    /// the entries it contributes to `<target>`.
    fn dynamic<'b>(&self, block: &'b SourceBlock, scope: &Scope) -> Result<(&'b str, Vec<Value>), Error> {
        let invalid = |message: &str| {
            Error::eval(
                block.location(),
                EvalError::InvalidRepetition {
                    kind: "dynamic block",
                    message: message.to_string(),
                },
            )
        };
        let target = block.label(0).ok_or_else(|| invalid("missing block type label"))?;
        let content = block
            .blocks
            .iter()
            .find(|b| b.ident == "content")
            .ok_or_else(|| invalid("missing \"content\" block"))?;
        let for_each = block
            .attribute("for_each")
            .ok_or_else(|| invalid("missing \"for_each\" attribute"))?;
        let iterator = match block.attribute("iterator") {
            Some(attr) => match &attr.expr {
                hcl::Expression::Variable(v) => v.as_str().to_string(),
                _ => return Err(invalid("\"iterator\" must be a bare identifier")),
            },
            None => target.to_string(),
        };

        let collection = self.attribute(block, for_each, scope)?;
        let Some(items) = iterate(collection).map_err(|e| Error::eval(block.location(), e))? else {
            return Ok((target, Vec::new()));
        };

        let mut entries = Vec::with_capacity(items.len());
        for (key, value) in items {
            let child = scope.child().with(iterator.as_str(), iteration_object(key, value));
            let mut entry = meta::stamped(meta::nested_meta(&content.span), self.ids);
            self.resolve_body(content, &child, &mut entry)?;
            entries.push(Value::Map(entry));
        }
        Ok((target, entries))
    }

    /// Evaluates one attribute. In lenient mode failures become Null.
    pub fn attribute(&self, block: &SourceBlock, attr: &SourceAttribute, scope: &Scope) -> Result<Value, Error> {
        match self.evaluator.evaluate(&attr.expr, scope) {
            Ok(value) => Ok(value),
            Err(e) if self.lenient => {
                log::warn!(
                    "{}:{}: {}: {e}; using null",
                    block.span.filename,
                    attr.line,
                    attr.key
                );
                Ok(Value::Null)
            }
            Err(e) => Err(Error::eval(
                format!("{}:{}: {}", block.span.filename, attr.line, attr.key),
                e,
            )),
        }
    }
}

#[derive(Default)]
struct Group {
    entries: Vec<Value>,
    /// Any entry came from a `dynamic` block.
    repeated: bool,
}

fn count_iterations(value: Value) -> Result<Vec<Iteration>, EvalError> {
    let invalid = |message: String| EvalError::InvalidRepetition {
        kind: "count",
        message,
    };
    let n = match &value {
        Value::Null => return Ok(vec![Iteration::single(Binding::Count(Value::Null))]),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    let n = n.ok_or_else(|| invalid(format!("expected a number, got {}", value.kind())))?;
    if n < 0.0 || n.fract() != 0.0 {
        return Err(invalid(format!("must be a non-negative whole number, got {n}")));
    }
    Ok((0..n as usize)
        .map(|i| Iteration {
            key: InstanceKey::Index(i),
            binding: Binding::Count(Value::from(i)),
        })
        .collect())
}

fn for_each_iterations(value: Value) -> Result<Vec<Iteration>, EvalError> {
    match value {
        Value::Null => Ok(vec![Iteration::single(Binding::Each {
            key: Value::Null,
            value: Value::Null,
        })]),
        Value::Map(map) => Ok(map
            .into_iter()
            .map(|(k, v)| Iteration {
                key: InstanceKey::Key(Value::String(k.clone())),
                binding: Binding::Each {
                    key: Value::String(k),
                    value: v,
                },
            })
            .collect()),
        // sets: each element is both key and value, first occurrence wins
        Value::List(items) => {
            let mut seen: Vec<Value> = Vec::new();
            for v in items {
                if !v.is_null() && !seen.contains(&v) {
                    seen.push(v);
                }
            }
            Ok(seen
                .into_iter()
                .map(|v| Iteration {
                    key: InstanceKey::Key(v.clone()),
                    binding: Binding::Each {
                        key: v.clone(),
                        value: v,
                    },
                })
                .collect())
        }
        other => Err(EvalError::InvalidRepetition {
            kind: "for_each",
            message: format!("expected a map or set, got {}", other.kind()),
        }),
    }
}
