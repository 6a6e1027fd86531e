use hcl::eval::{FuncArgs, FuncDef, ParamType};
use hcl::Value;

use super::{int_arg, kind, primitive_to_string};

/// Number of characters in a string, elements in a list or keys in a map
pub fn create_length_func() -> FuncDef {
    FuncDef::builder().param(ParamType::Any).build(|args: FuncArgs| {
        let n = match &args[0] {
            Value::String(s) => s.chars().count(),
            Value::Array(a) => a.len(),
            Value::Object(o) => o.len(),
            other => return Err(format!("cannot take the length of {}", kind(other))),
        };
        Ok(Value::from(n as u64))
    })
}

/// Concatenate multiple lists into a single list
pub fn create_concat_func() -> FuncDef {
    FuncDef::builder()
        .variadic_param(ParamType::array_of(ParamType::Any))
        .build(|args: FuncArgs| {
            let mut result: Vec<Value> = Vec::new();
            for arg in args.iter() {
                let arr = arg.as_array().unwrap();
                result.extend(arr.clone());
            }
            Ok(Value::from(result))
        })
}

/// Merge maps; later keys win
pub fn create_merge_func() -> FuncDef {
    FuncDef::builder()
        .variadic_param(ParamType::Any)
        .build(|args: FuncArgs| {
            let mut result = hcl::value::Map::new();
            for arg in args.iter() {
                match arg {
                    Value::Object(o) => {
                        for (k, v) in o {
                            result.insert(k.clone(), v.clone());
                        }
                    }
                    Value::Null => {}
                    other => return Err(format!("merge expects maps, got {}", kind(other))),
                }
            }
            Ok(Value::Object(result))
        })
}

/// `lookup(map, key, default)`
pub fn create_lookup_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::Any)
        .param(ParamType::Any)
        .variadic_param(ParamType::Any)
        .build(|args: FuncArgs| {
            let key = primitive_to_string(&args[1])?;
            let default = args.get(2);
            match &args[0] {
                Value::Null => Ok(Value::Null),
                Value::Object(o) => match (o.get(&key), default) {
                    (Some(v), _) => Ok(v.clone()),
                    (None, Some(d)) => Ok(d.clone()),
                    (None, None) => Err(format!("the given key \"{key}\" does not exist in the map")),
                },
                other => Err(format!("lookup expects a map, got {}", kind(other))),
            }
        })
}

/// `element(list, index)` wraps around the end of the list
pub fn create_element_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::array_of(ParamType::Any))
        .param(ParamType::Any)
        .build(|args: FuncArgs| {
            let arr = args[0].as_array().unwrap();
            if arr.is_empty() {
                return Err("cannot use element function with an empty list".to_string());
            }
            let idx = int_arg(&args[1])?;
            if idx < 0 {
                return Err("cannot use element function with a negative index".to_string());
            }
            Ok(arr[idx as usize % arr.len()].clone())
        })
}

pub fn create_keys_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::object_of(ParamType::Any))
        .build(|args: FuncArgs| {
            let obj = args[0].as_object().unwrap();
            Ok(Value::from(
                obj.keys().map(|k| Value::from(k.as_str())).collect::<Vec<_>>(),
            ))
        })
}

pub fn create_values_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::object_of(ParamType::Any))
        .build(|args: FuncArgs| {
            let obj = args[0].as_object().unwrap();
            Ok(Value::from(obj.values().cloned().collect::<Vec<_>>()))
        })
}

pub fn create_contains_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::array_of(ParamType::Any))
        .param(ParamType::Any)
        .build(|args: FuncArgs| {
            let arr = args[0].as_array().unwrap();
            Ok(Value::from(arr.contains(&args[1])))
        })
}

/// Remove duplicate values from a list preserving the first occurrence
pub fn create_distinct_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::array_of(ParamType::Any))
        .build(|args: FuncArgs| Ok(Value::from(dedup(args[0].as_array().unwrap()))))
}

/// Flatten a nested list into a single level list
pub fn create_flatten_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::array_of(ParamType::Any))
        .build(|args: FuncArgs| {
            fn flatten(values: &[Value], out: &mut Vec<Value>) {
                for v in values {
                    if let Some(arr) = v.as_array() {
                        flatten(arr, out);
                    } else {
                        out.push(v.clone());
                    }
                }
            }

            let arr = args[0].as_array().unwrap();
            let mut result = Vec::new();
            flatten(arr, &mut result);
            Ok(Value::from(result))
        })
}

pub fn create_reverse_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::array_of(ParamType::Any))
        .build(|args: FuncArgs| {
            let arr = args[0].as_array().unwrap();
            let result: Vec<Value> = arr.iter().cloned().rev().collect();
            Ok(Value::from(result))
        })
}

/// `slice(list, start, end)` with an exclusive end
pub fn create_slice_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::array_of(ParamType::Any))
        .param(ParamType::Any)
        .param(ParamType::Any)
        .build(|args: FuncArgs| {
            let arr = args[0].as_array().unwrap();
            let start = int_arg(&args[1])?;
            let end = int_arg(&args[2])?;
            if start < 0 || end > arr.len() as i64 || start > end {
                return Err(format!(
                    "invalid slice [{start}:{end}] for list of length {}",
                    arr.len()
                ));
            }
            Ok(Value::from(arr[start as usize..end as usize].to_vec()))
        })
}

/// Lexical sort of a list of strings
pub fn create_sort_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::array_of(ParamType::Any))
        .build(|args: FuncArgs| {
            let mut strings = args[0]
                .as_array()
                .unwrap()
                .iter()
                .map(primitive_to_string)
                .collect::<Result<Vec<_>, _>>()?;
            strings.sort();
            Ok(Value::from(
                strings.into_iter().map(Value::from).collect::<Vec<_>>(),
            ))
        })
}

/// Remove null and empty string elements
pub fn create_compact_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::array_of(ParamType::Any))
        .build(|args: FuncArgs| {
            let arr = args[0].as_array().unwrap();
            let result: Vec<Value> = arr
                .iter()
                .filter(|v| !v.is_null() && v.as_str() != Some(""))
                .cloned()
                .collect();
            Ok(Value::from(result))
        })
}

/// First argument that is neither null nor an empty string
pub fn create_coalesce_func() -> FuncDef {
    FuncDef::builder()
        .variadic_param(ParamType::Any)
        .build(|args: FuncArgs| {
            for arg in args.iter() {
                if !arg.is_null() && arg.as_str() != Some("") {
                    return Ok(arg.clone());
                }
            }
            Err("no non-null, non-empty-string arguments".to_string())
        })
}

/// First non-empty list
pub fn create_coalescelist_func() -> FuncDef {
    FuncDef::builder()
        .variadic_param(ParamType::array_of(ParamType::Any))
        .build(|args: FuncArgs| {
            for arg in args.iter() {
                if !arg.as_array().unwrap().is_empty() {
                    return Ok(arg.clone());
                }
            }
            Ok(Value::from(Vec::<Value>::new()))
        })
}

/// Return the index of a value in a list, or error if not found
pub fn create_index_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::array_of(ParamType::Any))
        .param(ParamType::Any)
        .build(|args: FuncArgs| {
            let arr = args[0].as_array().unwrap();
            let value = &args[1];
            if let Some(pos) = arr.iter().position(|v| v == value) {
                Ok(Value::from(pos as u64))
            } else {
                Err("item not found".to_string())
            }
        })
}

/// `zipmap(keys, values)`
pub fn create_zipmap_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::array_of(ParamType::Any))
        .param(ParamType::array_of(ParamType::Any))
        .build(|args: FuncArgs| {
            let keys = args[0].as_array().unwrap();
            let values = args[1].as_array().unwrap();
            if keys.len() != values.len() {
                return Err(format!(
                    "number of keys ({}) does not match number of values ({})",
                    keys.len(),
                    values.len()
                ));
            }
            let mut result = hcl::value::Map::new();
            for (k, v) in keys.iter().zip(values) {
                result.insert(primitive_to_string(k)?, v.clone());
            }
            Ok(Value::Object(result))
        })
}

/// `range(end)`, `range(start, end)` or `range(start, end, step)`
pub fn create_range_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::Any)
        .variadic_param(ParamType::Any)
        .build(|args: FuncArgs| {
            let nums = args
                .iter()
                .map(super::number_arg)
                .collect::<Result<Vec<_>, _>>()?;
            let (start, end, step) = match nums.as_slice() {
                [end] => (0.0, *end, 1.0),
                [start, end] => (*start, *end, if start <= end { 1.0 } else { -1.0 }),
                [start, end, step] => (*start, *end, *step),
                _ => return Err("range expects one to three arguments".to_string()),
            };
            if step == 0.0 {
                return Err("step must not be zero".to_string());
            }
            let mut out = Vec::new();
            let mut current = start;
            while (step > 0.0 && current < end) || (step < 0.0 && current > end) {
                out.push(super::number_value(current));
                current += step;
                if out.len() > 1024 {
                    return Err("more than 1024 values were generated".to_string());
                }
            }
            Ok(Value::from(out))
        })
}

pub fn create_setunion_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::array_of(ParamType::Any))
        .variadic_param(ParamType::array_of(ParamType::Any))
        .build(|args: FuncArgs| {
            let all: Vec<Value> = args
                .iter()
                .flat_map(|a| a.as_array().unwrap().iter().cloned())
                .collect();
            Ok(Value::from(dedup(&all)))
        })
}

pub fn create_setintersection_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::array_of(ParamType::Any))
        .variadic_param(ParamType::array_of(ParamType::Any))
        .build(|args: FuncArgs| {
            let first = dedup(args[0].as_array().unwrap());
            let result: Vec<Value> = first
                .into_iter()
                .filter(|v| {
                    args.iter()
                        .skip(1)
                        .all(|other| other.as_array().unwrap().contains(v))
                })
                .collect();
            Ok(Value::from(result))
        })
}

/// The single element of a zero or one element list
pub fn create_one_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::array_of(ParamType::Any))
        .build(|args: FuncArgs| {
            let arr = args[0].as_array().unwrap();
            match arr.as_slice() {
                [] => Ok(Value::Null),
                [only] => Ok(only.clone()),
                _ => Err(format!("must be a list with no more than one element, got {}", arr.len())),
            }
        })
}

pub fn create_alltrue_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::array_of(ParamType::Any))
        .build(|args: FuncArgs| {
            let arr = args[0].as_array().unwrap();
            Ok(Value::from(arr.iter().all(is_true)))
        })
}

pub fn create_anytrue_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::array_of(ParamType::Any))
        .build(|args: FuncArgs| {
            let arr = args[0].as_array().unwrap();
            Ok(Value::from(arr.iter().any(is_true)))
        })
}

fn is_true(v: &Value) -> bool {
    matches!(v, Value::Bool(true)) || v.as_str() == Some("true")
}

fn dedup(values: &[Value]) -> Vec<Value> {
    let mut result: Vec<Value> = Vec::new();
    for v in values {
        if !result.contains(v) {
            result.push(v.clone());
        }
    }
    result
}
