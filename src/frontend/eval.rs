//! Expression evaluation against a [Scope].
//!
//! Null is the "unknown" marker: most operators propagate it instead of
//! failing, so references to values that only exist after provisioning
//! flow through interpolations and calls as Null.
use hcl::eval::{Context, Evaluate};
use hcl::expr::{
    BinaryOperator, Conditional, ForExpr, FuncCall, ObjectKey, Operation, TraversalOperator,
    UnaryOperator,
};
use hcl::template::{Directive, Element, Template};
use hcl::{Expression, Traversal};

use crate::error::EvalError;
use crate::frontend::builtins::{self, number_value};
use crate::frontend::meta::META_KEY;
use crate::frontend::scope::Scope;
use crate::value::{Map, Value};

pub struct Evaluator {
    functions: Context<'static>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Evaluator {
            functions: builtins::create_context(),
        }
    }

    pub fn evaluate(&self, expr: &Expression, scope: &Scope) -> Result<Value, EvalError> {
        match expr {
            Expression::Null => Ok(Value::Null),
            Expression::Bool(b) => Ok(Value::Bool(*b)),
            Expression::Number(n) => Ok(Value::Number(n.clone())),
            Expression::String(s) => Ok(Value::String(s.clone())),
            Expression::Array(items) => items
                .iter()
                .map(|item| self.evaluate(item, scope))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Expression::Object(object) => {
                let mut map = Map::new();
                for (key, value) in object {
                    let key = self.object_key(key, scope)?;
                    map.insert(key, self.evaluate(value, scope)?);
                }
                Ok(Value::Map(map))
            }
            Expression::TemplateExpr(t) => {
                let template = Template::from_expr(t)
                    .map_err(|e| EvalError::Unsupported(format!("template: {e}")))?;
                self.template(&template, scope)
            }
            Expression::Variable(v) => scope.lookup(v.as_str()).cloned().map(unmarked),
            Expression::Traversal(tr) => self.traversal(tr, scope),
            Expression::FuncCall(call) => self.call(call, scope),
            Expression::Parenthesis(inner) => self.evaluate(inner, scope),
            Expression::Conditional(cond) => self.conditional(cond, scope),
            Expression::Operation(op) => match &**op {
                Operation::Unary(u) => {
                    let v = self.evaluate(&u.expr, scope)?;
                    match (&u.operator, v) {
                        (_, Value::Null) => Ok(Value::Null),
                        (UnaryOperator::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                        (UnaryOperator::Neg, v) => Ok(number_value(-to_number(&v, "-")?).into()),
                        (UnaryOperator::Not, v) => Err(EvalError::mismatch(format!(
                            "unsupported operand type for !: {}",
                            v.kind()
                        ))),
                    }
                }
                Operation::Binary(b) => {
                    let lhs = self.evaluate(&b.lhs_expr, scope)?;
                    let rhs = self.evaluate(&b.rhs_expr, scope)?;
                    binary(&b.operator, lhs, rhs)
                }
            },
            Expression::ForExpr(fe) => self.for_expr(fe, scope),
            other => Err(EvalError::Unsupported(format!("{other:?}"))),
        }
    }

    /// Bare identifiers are literal keys; anything else is evaluated.
    fn object_key(&self, key: &ObjectKey, scope: &Scope) -> Result<String, EvalError> {
        match key {
            ObjectKey::Identifier(ident) => Ok(ident.as_str().to_string()),
            ObjectKey::Expression(Expression::Variable(v)) => Ok(v.as_str().to_string()),
            ObjectKey::Expression(expr) => {
                let key = self.evaluate(expr, scope)?;
                key.to_template_string().ok_or_else(|| {
                    EvalError::mismatch(format!("object key must be a string, got {}", key.kind()))
                })
            }
            other => Err(EvalError::Unsupported(format!("{other:?}"))),
        }
    }

    fn template(&self, template: &Template, scope: &Scope) -> Result<Value, EvalError> {
        // "${expr}" keeps the type of expr
        if let [Element::Interpolation(ip)] = template.elements() {
            return self.evaluate(&ip.expr, scope);
        }
        Ok(self
            .render(template, scope)?
            .map_or(Value::Null, Value::String))
    }

    /// Renders a template to a string; `None` when an interpolated value is unknown.
    fn render(&self, template: &Template, scope: &Scope) -> Result<Option<String>, EvalError> {
        let mut out = String::new();
        for element in template.elements() {
            match element {
                Element::Literal(s) => out.push_str(s),
                Element::Interpolation(ip) => {
                    let v = self.evaluate(&ip.expr, scope)?;
                    match interpolate(&v)? {
                        Some(s) => out.push_str(&s),
                        None => return Ok(None),
                    }
                }
                Element::Directive(directive) => {
                    match self.directive(directive, scope)? {
                        Some(s) => out.push_str(&s),
                        None => return Ok(None),
                    }
                }
            }
        }
        Ok(Some(out))
    }

    fn directive(&self, directive: &Directive, scope: &Scope) -> Result<Option<String>, EvalError> {
        match directive {
            Directive::If(dir) => match truthy(&self.evaluate(&dir.cond_expr, scope)?)? {
                None => Ok(None),
                Some(true) => self.render(&dir.true_template, scope),
                Some(false) => match &dir.false_template {
                    Some(t) => self.render(t, scope),
                    None => Ok(Some(String::new())),
                },
            },
            Directive::For(dir) => {
                let collection = self.evaluate(&dir.collection_expr, scope)?;
                let Some(entries) = iterate(collection)? else {
                    return Ok(None);
                };
                let mut out = String::new();
                for (key, value) in entries {
                    let mut child = scope.child();
                    child.bind(dir.value_var.as_str(), value);
                    if let Some(key_var) = &dir.key_var {
                        child.bind(key_var.as_str(), key);
                    }
                    match self.render(&dir.template, &child)? {
                        Some(s) => out.push_str(&s),
                        None => return Ok(None),
                    }
                }
                Ok(Some(out))
            }
        }
    }

    fn traversal(&self, tr: &Traversal, scope: &Scope) -> Result<Value, EvalError> {
        let on = match &tr.expr {
            Expression::Variable(v) => v.as_str().to_string(),
            _ => "expression".to_string(),
        };
        let root = match &tr.expr {
            Expression::Variable(v) => scope.lookup(v.as_str())?.clone(),
            other => self.evaluate(other, scope)?,
        };
        self.apply(root, &tr.operators, on, scope).map(unmarked)
    }

    fn apply(
        &self,
        mut current: Value,
        operators: &[TraversalOperator],
        mut on: String,
        scope: &Scope,
    ) -> Result<Value, EvalError> {
        for (i, op) in operators.iter().enumerate() {
            if current.is_null() {
                return Ok(Value::Null);
            }
            match op {
                TraversalOperator::GetAttr(name) => {
                    current = get_attr(current, name.as_str(), &on)?;
                    on = format!("{on}.{name}");
                }
                TraversalOperator::Index(index) => {
                    let index = self.evaluate(index, scope)?;
                    current = get_index(current, &index, &on)?;
                    on = format!("{on}[..]");
                }
                TraversalOperator::LegacyIndex(index) => {
                    current = get_index(current, &Value::from(*index), &on)?;
                    on = format!("{on}.{index}");
                }
                TraversalOperator::AttrSplat | TraversalOperator::FullSplat => {
                    let rest = &operators[i + 1..];
                    // an attribute splat only carries the attribute accesses right after it
                    let split = match op {
                        TraversalOperator::AttrSplat => rest
                            .iter()
                            .position(|op| !matches!(op, TraversalOperator::GetAttr(_)))
                            .unwrap_or(rest.len()),
                        _ => rest.len(),
                    };
                    let (each, after) = rest.split_at(split);
                    let items = match current {
                        Value::List(items) => items,
                        single => vec![single],
                    };
                    let splatted = items
                        .into_iter()
                        .map(|item| self.apply(item, each, format!("{on}[*]"), scope))
                        .collect::<Result<Vec<_>, _>>()?;
                    return self.apply(Value::List(splatted), after, on, scope);
                }
            }
        }
        Ok(current)
    }

    fn conditional(&self, cond: &Conditional, scope: &Scope) -> Result<Value, EvalError> {
        match truthy(&self.evaluate(&cond.cond_expr, scope)?)? {
            None => Ok(Value::Null),
            Some(true) => self.evaluate(&cond.true_expr, scope),
            Some(false) => self.evaluate(&cond.false_expr, scope),
        }
    }

    fn for_expr(&self, fe: &ForExpr, scope: &Scope) -> Result<Value, EvalError> {
        let collection = self.evaluate(&fe.collection_expr, scope)?;
        let Some(entries) = iterate(collection)? else {
            return Ok(Value::Null);
        };

        let mut list = Vec::new();
        let mut map = Map::new();
        for (key, value) in entries {
            let mut child = scope.child();
            child.bind(fe.value_var.as_str(), value);
            if let Some(key_var) = &fe.key_var {
                child.bind(key_var.as_str(), key);
            }

            if let Some(cond_expr) = &fe.cond_expr {
                match truthy(&self.evaluate(cond_expr, &child)?)? {
                    Some(true) => {}
                    Some(false) => continue,
                    None => return Ok(Value::Null),
                }
            }

            let Some(key_expr) = &fe.key_expr else {
                list.push(self.evaluate(&fe.value_expr, &child)?);
                continue;
            };
            let key = self.evaluate(key_expr, &child)?;
            let key = key.to_template_string().ok_or_else(|| {
                EvalError::mismatch(format!(
                    "for expression key must be a string, got {}",
                    key.kind()
                ))
            })?;
            let value = self.evaluate(&fe.value_expr, &child)?;
            if fe.grouping {
                if let Value::List(group) = map.entry(key).or_insert_with(|| Value::List(Vec::new()))
                {
                    group.push(value);
                }
            } else if map.contains_key(&key) {
                return Err(EvalError::DuplicateKey(key));
            } else {
                map.insert(key, value);
            }
        }

        if fe.key_expr.is_some() {
            Ok(Value::Map(map))
        } else {
            Ok(Value::List(list))
        }
    }

    fn call(&self, call: &FuncCall, scope: &Scope) -> Result<Value, EvalError> {
        let name = call.name.to_string();
        match name.as_str() {
            "try" => {
                for arg in &call.args {
                    if let Ok(v) = self.evaluate(arg, scope) {
                        return Ok(v);
                    }
                }
                return Err(EvalError::Function {
                    name,
                    message: "no expression succeeded".into(),
                });
            }
            "can" => {
                let [arg] = call.args.as_slice() else {
                    return Err(EvalError::Function {
                        name,
                        message: "expects exactly one argument".into(),
                    });
                };
                return Ok(Value::Bool(self.evaluate(arg, scope).is_ok()));
            }
            n if builtins::DEFERRED.contains(&n) => return Ok(Value::Null),
            n if !builtins::is_builtin(n) => return Err(EvalError::UnknownFunction(name)),
            _ => {}
        }

        let args = call
            .args
            .iter()
            .map(|arg| self.evaluate(arg, scope))
            .collect::<Result<Vec<_>, _>>()?;
        if !builtins::NULL_TOLERANT.contains(&name.as_str()) && args.iter().any(Value::is_null) {
            return Ok(Value::Null);
        }

        let mut resolved = call.clone();
        resolved.args = args
            .into_iter()
            .map(|v| Expression::from(hcl::Value::from(v)))
            .collect();
        Expression::FuncCall(Box::new(resolved))
            .evaluate(&self.functions)
            .map(Value::from)
            .map_err(|e| EvalError::Function {
                name,
                message: e.to_string(),
            })
    }
}

/// Drops the record marker of declared blocks from a value leaving a
/// traversal.
fn unmarked(value: Value) -> Value {
    match value {
        Value::Map(map) => Value::Map(
            map.into_iter()
                .filter(|(k, _)| k != META_KEY)
                .map(|(k, v)| (k, unmarked(v)))
                .collect(),
        ),
        Value::List(items) => Value::List(items.into_iter().map(unmarked).collect()),
        other => other,
    }
}

fn get_attr(current: Value, name: &str, on: &str) -> Result<Value, EvalError> {
    match current {
        Value::Map(mut map) => match map.swap_remove(name) {
            Some(value) => Ok(value),
            // a declared block: what it does not state is computed later
            None if map.contains_key(META_KEY) => Ok(Value::Null),
            None => Err(EvalError::UnknownAttribute {
                name: name.to_string(),
                on: on.to_string(),
            }),
        },
        other => Err(EvalError::mismatch(format!(
            "cannot access attribute '{name}' on {} value {on}",
            other.kind()
        ))),
    }
}

fn get_index(current: Value, index: &Value, on: &str) -> Result<Value, EvalError> {
    match (current, index) {
        (_, Value::Null) => Ok(Value::Null),
        (Value::List(mut items), index) => {
            let i = to_number(index, "index")?;
            if i.fract() != 0.0 || i < 0.0 || i as usize >= items.len() {
                return Err(EvalError::IndexOutOfRange {
                    index: i as i64,
                    len: items.len(),
                });
            }
            Ok(items.swap_remove(i as usize))
        }
        (Value::Map(mut map), index) => {
            let key = index.to_template_string().ok_or_else(|| {
                EvalError::mismatch(format!("map key must be a string, got {}", index.kind()))
            })?;
            map.swap_remove(&key).ok_or_else(|| EvalError::UnknownAttribute {
                name: key,
                on: on.to_string(),
            })
        }
        (other, _) => Err(EvalError::mismatch(format!(
            "cannot index {} value {on}",
            other.kind()
        ))),
    }
}

fn binary(op: &BinaryOperator, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    match op {
        BinaryOperator::Eq => return Ok(Value::Bool(lhs == rhs)),
        BinaryOperator::NotEq => return Ok(Value::Bool(lhs != rhs)),
        _ => {}
    }
    if lhs.is_null() || rhs.is_null() {
        return Ok(Value::Null);
    }
    match op {
        BinaryOperator::And | BinaryOperator::Or => match (truthy(&lhs)?, truthy(&rhs)?) {
            (Some(a), Some(b)) if matches!(op, BinaryOperator::And) => Ok(Value::Bool(a && b)),
            (Some(a), Some(b)) => Ok(Value::Bool(a || b)),
            _ => Ok(Value::Null),
        },
        BinaryOperator::Less
        | BinaryOperator::LessEq
        | BinaryOperator::Greater
        | BinaryOperator::GreaterEq => {
            let (l, r) = (to_number(&lhs, "comparison")?, to_number(&rhs, "comparison")?);
            let res = match op {
                BinaryOperator::Less => l < r,
                BinaryOperator::LessEq => l <= r,
                BinaryOperator::Greater => l > r,
                _ => l >= r,
            };
            Ok(Value::Bool(res))
        }
        BinaryOperator::Plus => {
            Ok(number_value(to_number(&lhs, "+")? + to_number(&rhs, "+")?).into())
        }
        BinaryOperator::Minus => {
            Ok(number_value(to_number(&lhs, "-")? - to_number(&rhs, "-")?).into())
        }
        BinaryOperator::Mul => {
            Ok(number_value(to_number(&lhs, "*")? * to_number(&rhs, "*")?).into())
        }
        BinaryOperator::Div | BinaryOperator::Mod => {
            let (l, r) = (to_number(&lhs, "/")?, to_number(&rhs, "/")?);
            if r == 0.0 {
                return Err(EvalError::mismatch("division by zero"));
            }
            let result = if matches!(op, BinaryOperator::Div) {
                l / r
            } else {
                l % r
            };
            Ok(number_value(result).into())
        }
        other => Err(EvalError::Unsupported(format!("binary operator {other:?}"))),
    }
}

/// Entries of a collection being iterated: `(index, value)` for lists and
/// `(key, value)` for maps. `None` when the collection is unknown.
pub(crate) fn iterate(collection: Value) -> Result<Option<Vec<(Value, Value)>>, EvalError> {
    match collection {
        Value::Null => Ok(None),
        Value::List(items) => Ok(Some(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (Value::from(i), v))
                .collect(),
        )),
        Value::Map(map) => Ok(Some(
            map.into_iter().map(|(k, v)| (Value::String(k), v)).collect(),
        )),
        other => Err(EvalError::mismatch(format!(
            "cannot iterate over {} value",
            other.kind()
        ))),
    }
}

/// Boolean value of a condition; `None` when unknown.
fn truthy(v: &Value) -> Result<Option<bool>, EvalError> {
    match v {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        Value::String(s) if s == "true" => Ok(Some(true)),
        Value::String(s) if s == "false" => Ok(Some(false)),
        other => Err(EvalError::mismatch(format!(
            "condition must be a bool, got {}",
            other.kind()
        ))),
    }
}

fn interpolate(v: &Value) -> Result<Option<String>, EvalError> {
    match v {
        Value::Null => Ok(None),
        Value::List(_) | Value::Map(_) => Err(EvalError::mismatch(format!(
            "cannot interpolate {} value into a string",
            v.kind()
        ))),
        primitive => Ok(primitive.to_template_string()),
    }
}

fn to_number(v: &Value, op: &str) -> Result<f64, EvalError> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.ok_or_else(|| {
        EvalError::mismatch(format!("unsupported operand type for {op}: {}", v.kind()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map;

    fn eval_in(src: &str, scope: &Scope) -> Result<Value, EvalError> {
        let expr: Expression = src.parse().unwrap();
        Evaluator::new().evaluate(&expr, scope)
    }

    fn eval(src: &str) -> Result<Value, EvalError> {
        eval_in(src, &Scope::root())
    }

    fn vars() -> Scope<'static> {
        Scope::root()
            .with(
                "var",
                Value::Map(map! {
                    "name" => "web",
                    "port" => 8080i64,
                    "enabled" => true,
                    "tags" => Value::from(vec!["a", "b"]),
                    "unknown" => Value::Null,
                }),
            )
            .with("local", Value::Map(Map::new()))
    }

    #[test]
    fn evaluates_conditional_expression() {
        assert_eq!(eval("true ? 1 : 0").unwrap(), Value::from(1i64));
        assert_eq!(eval("\"false\" ? 1 : 0").unwrap(), Value::from(0i64));
        assert_eq!(eval("null ? 1 : 0").unwrap(), Value::Null);
    }

    #[test]
    fn conditional_only_evaluates_chosen_branch() {
        assert_eq!(eval("true ? 1 : nope.attr").unwrap(), Value::from(1i64));
    }

    #[test]
    fn evaluates_for_expression() {
        let v = eval("[for x in [1,2,3] : x]").unwrap();
        let expected = Value::from(vec![Value::from(1i64), Value::from(2i64), Value::from(3i64)]);
        assert_eq!(v, expected);
    }

    #[test]
    fn for_expression_map_form_with_filter() {
        let v = eval("{for k, v in {a = 1, b = 2, c = 3} : upper(k) => v * 10 if v != 2}").unwrap();
        assert_eq!(v, Value::Map(map! { "A" => 10i64, "C" => 30i64 }));
    }

    #[test]
    fn for_expression_rejects_duplicate_keys() {
        let err = eval("{for s in [\"a\", \"b\", \"a\"] : s => s}").unwrap_err();
        assert_eq!(err, EvalError::DuplicateKey("a".into()));
    }

    #[test]
    fn for_expression_grouping_collects_lists() {
        let v = eval("{for s in [\"a\", \"b\", \"a\"] : s => s...}").unwrap();
        assert_eq!(
            v,
            Value::Map(map! {
                "a" => Value::from(vec!["a", "a"]),
                "b" => Value::from(vec!["b"]),
            })
        );
    }

    #[test]
    fn single_interpolation_keeps_type() {
        let scope = vars();
        assert_eq!(eval_in("\"${var.port}\"", &scope).unwrap(), Value::from(8080i64));
        assert_eq!(eval_in("\"${var.enabled}\"", &scope).unwrap(), Value::Bool(true));
        assert_eq!(
            eval_in("\"${var.tags}\"", &scope).unwrap(),
            Value::from(vec!["a", "b"])
        );
        assert_eq!(
            eval_in("\"${var.name}:${var.port}\"", &scope).unwrap(),
            Value::from("web:8080")
        );
    }

    #[test]
    fn template_directives() {
        let scope = vars();
        assert_eq!(
            eval_in("\"%{ if var.enabled }on%{ else }off%{ endif }\"", &scope).unwrap(),
            Value::from("on")
        );
        assert_eq!(
            eval_in("\"%{ for t in var.tags }[${t}]%{ endfor }\"", &scope).unwrap(),
            Value::from("[a][b]")
        );
    }

    #[test]
    fn unknown_values_propagate() {
        let scope = vars();
        assert_eq!(eval_in("var.unknown + 1", &scope).unwrap(), Value::Null);
        assert_eq!(eval_in("\"id-${var.unknown}\"", &scope).unwrap(), Value::Null);
        assert_eq!(eval_in("var.unknown.deep[0]", &scope).unwrap(), Value::Null);
        assert_eq!(eval_in("upper(var.unknown)", &scope).unwrap(), Value::Null);
        assert_eq!(eval_in("var.unknown == null", &scope).unwrap(), Value::Bool(true));
        assert_eq!(
            eval_in("coalesce(var.unknown, \"x\")", &scope).unwrap(),
            Value::from("x")
        );
    }

    #[test]
    fn arithmetic_keeps_integers() {
        assert_eq!(eval("2 * 3 + 1").unwrap(), Value::from(7i64));
        assert_eq!(eval("7 % 3").unwrap(), Value::from(1i64));
        assert_eq!(eval("1 / 4").unwrap(), Value::from(0.25));
        assert_eq!(eval("-(2)").unwrap(), Value::from(-2i64));
        assert!(eval("1 / 0").is_err());
        assert!(eval("\"a\" * 2").is_err());
    }

    #[test]
    fn traversal_errors_name_their_root() {
        let err = eval_in("local.missing", &vars()).unwrap_err();
        assert!(err.is_pending_local());
        let err = eval_in("var.missing", &vars()).unwrap_err();
        assert_eq!(
            err,
            EvalError::UnknownAttribute {
                name: "missing".into(),
                on: "var".into()
            }
        );
        assert_eq!(
            eval("nope").unwrap_err(),
            EvalError::UnknownVariable("nope".into())
        );
    }

    #[test]
    fn indexing_and_splats() {
        let scope = Scope::root().with(
            "items",
            Value::from(vec![
                Value::Map(map! { "name" => "a", "port" => 1i64 }),
                Value::Map(map! { "name" => "b", "port" => 2i64 }),
            ]),
        );
        assert_eq!(eval_in("items[1].name", &scope).unwrap(), Value::from("b"));
        assert_eq!(eval_in("items.0.port", &scope).unwrap(), Value::from(1i64));
        assert_eq!(
            eval_in("items[*].name", &scope).unwrap(),
            Value::from(vec!["a", "b"])
        );
        assert_eq!(
            eval_in("items.*.port", &scope).unwrap(),
            Value::from(vec![1i64, 2i64])
        );
        assert_eq!(
            eval_in("items[5]", &scope).unwrap_err(),
            EvalError::IndexOutOfRange { index: 5, len: 2 }
        );
    }

    #[test]
    fn object_identifier_keys_are_literal() {
        let scope = Scope::root().with("name", Value::from("shadowed"));
        assert_eq!(
            eval_in("{ name = name, (name) = 1 }", &scope).unwrap(),
            Value::Map(map! { "name" => "shadowed", "shadowed" => 1i64 })
        );
    }

    #[test]
    fn function_calls() {
        assert_eq!(eval("upper(\"abc\")").unwrap(), Value::from("ABC"));
        assert_eq!(eval("max([1, 5, 2]...)").unwrap(), Value::from(5i64));
        assert_eq!(
            eval("frobnicate(1)").unwrap_err(),
            EvalError::UnknownFunction("frobnicate".into())
        );
        assert!(matches!(
            eval("tonumber(\"x\")").unwrap_err(),
            EvalError::Function { .. }
        ));
    }

    #[test]
    fn deferred_functions_are_unknown() {
        assert_eq!(eval("timestamp()").unwrap(), Value::Null);
        assert_eq!(eval("file(\"x.txt\")").unwrap(), Value::Null);
    }

    #[test]
    fn try_and_can() {
        let scope = vars();
        assert_eq!(
            eval_in("try(var.missing, var.name)", &scope).unwrap(),
            Value::from("web")
        );
        assert_eq!(eval_in("can(var.missing)", &scope).unwrap(), Value::Bool(false));
        assert_eq!(eval_in("can(var.name)", &scope).unwrap(), Value::Bool(true));
        assert!(eval_in("try(var.missing)", &scope).is_err());
    }
}
