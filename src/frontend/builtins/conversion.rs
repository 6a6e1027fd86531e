use hcl::eval::{FuncArgs, FuncDef, ParamType};
use hcl::Value;

use super::{kind, number_arg, number_value, primitive_to_string};

/// Type conversion functions
pub fn create_tostring_func() -> FuncDef {
    FuncDef::builder().param(ParamType::Any).build(|args: FuncArgs| {
        if args[0].is_null() {
            return Ok(Value::Null);
        }
        primitive_to_string(&args[0]).map(Value::from)
    })
}

pub fn create_tonumber_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::Any)
        .build(|args: FuncArgs| Ok(number_value(number_arg(&args[0])?)))
}

pub fn create_tobool_func() -> FuncDef {
    FuncDef::builder().param(ParamType::Any).build(|args: FuncArgs| match &args[0] {
        Value::Bool(b) => Ok(Value::from(*b)),
        Value::String(s) if s == "true" => Ok(Value::from(true)),
        Value::String(s) if s == "false" => Ok(Value::from(false)),
        other => Err(format!("cannot convert {} to bool", kind(other))),
    })
}

pub fn create_tolist_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::array_of(ParamType::Any))
        .build(|args: FuncArgs| Ok(args[0].clone()))
}

/// Sets are represented as lists without duplicates
pub fn create_toset_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::array_of(ParamType::Any))
        .build(|args: FuncArgs| {
            let mut result: Vec<Value> = Vec::new();
            for v in args[0].as_array().unwrap() {
                if !result.contains(v) {
                    result.push(v.clone());
                }
            }
            Ok(Value::from(result))
        })
}

pub fn create_tomap_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::object_of(ParamType::Any))
        .build(|args: FuncArgs| Ok(args[0].clone()))
}

pub fn create_jsonencode_func() -> FuncDef {
    FuncDef::builder().param(ParamType::Any).build(|args: FuncArgs| {
        serde_json::to_string(&args[0])
            .map(Value::from)
            .map_err(|e| e.to_string())
    })
}

pub fn create_jsondecode_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::String)
        .build(|args: FuncArgs| {
            let input = args[0].as_str().unwrap();
            serde_json::from_str::<Value>(input).map_err(|e| format!("invalid JSON: {e}"))
        })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::eval;
    use hcl::Value;

    #[test]
    fn test_tostring_and_tonumber() {
        assert_eq!(eval("tostring(5)").unwrap(), Value::from("5"));
        assert_eq!(eval("tostring(true)").unwrap(), Value::from("true"));
        assert_eq!(eval("tostring(null)").unwrap(), Value::Null);
        assert_eq!(eval("tonumber(\"42\")").unwrap(), Value::from(42));
        assert!(eval("tonumber(\"abc\")").is_err());
    }

    #[test]
    fn test_tobool() {
        assert_eq!(eval("tobool(\"true\")").unwrap(), Value::from(true));
        assert!(eval("tobool(\"yes\")").is_err());
    }

    #[test]
    fn test_toset_removes_duplicates() {
        assert_eq!(
            eval("toset([\"a\", \"b\", \"a\"])").unwrap(),
            Value::from(vec![Value::from("a"), Value::from("b")])
        );
    }

    #[test]
    fn test_json_roundtrip() {
        assert_eq!(
            eval("jsonencode({a = 1, b = [true, null]})").unwrap(),
            Value::from(r#"{"a":1,"b":[true,null]}"#)
        );
        let decoded = eval(r#"jsondecode("{\"x\": [1, 2]}")"#).unwrap();
        assert_eq!(
            decoded.as_object().unwrap()["x"],
            Value::from(vec![Value::from(1), Value::from(2)])
        );
    }
}
