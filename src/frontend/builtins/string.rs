use hcl::eval::{FuncArgs, FuncDef, ParamType};
use hcl::Value;
use regex::Regex;

use super::{int_arg, primitive_to_string};

/// String manipulation functions
pub fn create_upper_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::Any)
        .build(|args: FuncArgs| Ok(Value::from(primitive_to_string(&args[0])?.to_uppercase())))
}

pub fn create_lower_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::Any)
        .build(|args: FuncArgs| Ok(Value::from(primitive_to_string(&args[0])?.to_lowercase())))
}

pub fn create_title_func() -> FuncDef {
    FuncDef::builder().param(ParamType::Any).build(|args: FuncArgs| {
        let s = primitive_to_string(&args[0])?;
        let mut out = String::with_capacity(s.len());
        let mut at_word_start = true;
        for c in s.chars() {
            if at_word_start && c.is_alphabetic() {
                out.extend(c.to_uppercase());
            } else {
                out.push(c);
            }
            at_word_start = !c.is_alphanumeric();
        }
        Ok(Value::from(out))
    })
}

pub fn create_chomp_func() -> FuncDef {
    FuncDef::builder().param(ParamType::Any).build(|args: FuncArgs| {
        let s = primitive_to_string(&args[0])?;
        Ok(Value::from(s.trim_end_matches(['\n', '\r'])))
    })
}

pub fn create_trimspace_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::Any)
        .build(|args: FuncArgs| Ok(Value::from(primitive_to_string(&args[0])?.trim())))
}

/// `trim(str, cutset)` removes any of the cutset characters from both ends.
pub fn create_trim_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::Any)
        .param(ParamType::String)
        .build(|args: FuncArgs| {
            let s = primitive_to_string(&args[0])?;
            let cutset: Vec<char> = args[1].as_str().unwrap().chars().collect();
            Ok(Value::from(s.trim_matches(cutset.as_slice())))
        })
}

pub fn create_trimprefix_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::Any)
        .param(ParamType::String)
        .build(|args: FuncArgs| {
            let s = primitive_to_string(&args[0])?;
            let prefix = args[1].as_str().unwrap();
            Ok(Value::from(s.strip_prefix(prefix).unwrap_or(&s)))
        })
}

pub fn create_trimsuffix_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::Any)
        .param(ParamType::String)
        .build(|args: FuncArgs| {
            let s = primitive_to_string(&args[0])?;
            let suffix = args[1].as_str().unwrap();
            Ok(Value::from(s.strip_suffix(suffix).unwrap_or(&s)))
        })
}

/// `replace(str, search, replacement)`; a search string wrapped in slashes
/// is a regular expression.
pub fn create_replace_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::Any)
        .param(ParamType::String)
        .param(ParamType::Any)
        .build(|args: FuncArgs| {
            let s = primitive_to_string(&args[0])?;
            let search = args[1].as_str().unwrap();
            let to = primitive_to_string(&args[2])?;
            if search.len() > 1 && search.starts_with('/') && search.ends_with('/') {
                let re = Regex::new(&search[1..search.len() - 1]).map_err(|e| e.to_string())?;
                // Terraform uses $1 style references like the regex crate
                Ok(Value::from(re.replace_all(&s, to.as_str()).into_owned()))
            } else {
                Ok(Value::from(s.replace(search, &to)))
            }
        })
}

/// `substr(str, offset, length)` counted in characters; a length of -1
/// takes the rest of the string.
pub fn create_substr_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::Any)
        .param(ParamType::Any)
        .param(ParamType::Any)
        .build(|args: FuncArgs| {
            let chars: Vec<char> = primitive_to_string(&args[0])?.chars().collect();
            let len = chars.len() as i64;
            let mut offset = int_arg(&args[1])?;
            let length = int_arg(&args[2])?;
            if offset < 0 {
                offset += len;
            }
            if offset < 0 || offset > len {
                return Err("offset out of range".to_string());
            }
            let end = if length < 0 {
                len
            } else {
                offset.saturating_add(length).min(len)
            };
            Ok(Value::from(
                chars[offset as usize..end as usize].iter().collect::<String>(),
            ))
        })
}

/// `format(spec, args...)` supporting the `%s %d %f %v %q %t %%` verbs.
pub fn create_format_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::String)
        .variadic_param(ParamType::Any)
        .build(|args: FuncArgs| {
            let spec = args[0].as_str().unwrap();
            let rest: Vec<&Value> = args.iter().skip(1).collect();
            let mut out = String::new();
            let mut next = 0usize;
            let mut chars = spec.chars().peekable();
            while let Some(c) = chars.next() {
                if c != '%' {
                    out.push(c);
                    continue;
                }
                let mut precision: Option<usize> = None;
                let mut modifier = String::new();
                while let Some(&m) = chars.peek() {
                    if m.is_ascii_digit() || m == '.' || m == '-' || m == '+' || m == '#' {
                        modifier.push(m);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if let Some((_, p)) = modifier.split_once('.') {
                    precision = p.parse().ok();
                }
                let verb = chars.next().ok_or("format string ends with '%'")?;
                if verb == '%' {
                    out.push('%');
                    continue;
                }
                let arg = rest
                    .get(next)
                    .ok_or_else(|| format!("not enough arguments for format verb %{verb}"))?;
                next += 1;
                let rendered = match verb {
                    's' | 'v' => match arg {
                        Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                            primitive_to_string(arg)?
                        }
                        Value::Null => "null".to_string(),
                        other => other.to_string(),
                    },
                    'd' => int_arg(arg)?.to_string(),
                    'f' => format!("{:.*}", precision.unwrap_or(6), super::number_arg(arg)?),
                    't' => match arg {
                        Value::Bool(b) => b.to_string(),
                        other => return Err(format!("%t expects a bool, got {}", super::kind(other))),
                    },
                    'q' => format!("{:?}", primitive_to_string(arg)?),
                    other => return Err(format!("unsupported format verb %{other}")),
                };
                out.push_str(&pad(&rendered, &modifier));
            }
            Ok(Value::from(out))
        })
}

/// Applies the width part of a format modifier such as `05` or `-8`.
fn pad(rendered: &str, modifier: &str) -> String {
    let width_part = modifier.split('.').next().unwrap_or("");
    let left_align = width_part.starts_with('-');
    let digits = width_part.trim_start_matches(['-', '+', '#']);
    let zero = digits.starts_with('0');
    let width: usize = digits.parse().unwrap_or(0);
    let len = rendered.chars().count();
    if len >= width {
        return rendered.to_string();
    }
    let fill = width - len;
    if left_align {
        format!("{rendered}{}", " ".repeat(fill))
    } else if zero {
        match rendered.strip_prefix('-') {
            Some(rest) => format!("-{}{rest}", "0".repeat(fill)),
            None => format!("{}{rendered}", "0".repeat(fill)),
        }
    } else {
        format!("{}{rendered}", " ".repeat(fill))
    }
}

/// `join(separator, list, ...)`
pub fn create_join_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::String)
        .param(ParamType::array_of(ParamType::Any))
        .variadic_param(ParamType::array_of(ParamType::Any))
        .build(|args: FuncArgs| {
            let separator = args[0].as_str().unwrap();
            let mut parts = Vec::new();
            for list in args.iter().skip(1) {
                for v in list.as_array().unwrap() {
                    parts.push(primitive_to_string(v)?);
                }
            }
            Ok(Value::from(parts.join(separator)))
        })
}

/// `split(separator, str)`
pub fn create_split_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::String)
        .param(ParamType::Any)
        .build(|args: FuncArgs| {
            let separator = args[0].as_str().unwrap();
            let s = primitive_to_string(&args[1])?;
            if s.is_empty() {
                return Ok(Value::from(Vec::<Value>::new()));
            }
            let parts: Vec<Value> = s.split(separator).map(Value::from).collect();
            Ok(Value::from(parts))
        })
}

pub fn create_strrev_func() -> FuncDef {
    FuncDef::builder().param(ParamType::Any).build(|args: FuncArgs| {
        Ok(Value::from(
            primitive_to_string(&args[0])?.chars().rev().collect::<String>(),
        ))
    })
}

pub fn create_startswith_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::String)
        .param(ParamType::String)
        .build(|args: FuncArgs| {
            let s = args[0].as_str().unwrap();
            let prefix = args[1].as_str().unwrap();
            Ok(Value::from(s.starts_with(prefix)))
        })
}

pub fn create_endswith_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::String)
        .param(ParamType::String)
        .build(|args: FuncArgs| {
            let s = args[0].as_str().unwrap();
            let suffix = args[1].as_str().unwrap();
            Ok(Value::from(s.ends_with(suffix)))
        })
}

const MAX_INDENT: i64 = 1 << 16;

/// `indent(spaces, str)` indents every line but the first.
pub fn create_indent_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::Any)
        .param(ParamType::Any)
        .build(|args: FuncArgs| {
            let count = int_arg(&args[0])?.max(0);
            if count > MAX_INDENT {
                return Err(format!("cannot indent by {count} spaces"));
            }
            let spaces = " ".repeat(count as usize);
            let s = primitive_to_string(&args[1])?;
            Ok(Value::from(s.replace('\n', &format!("\n{spaces}"))))
        })
}

pub fn create_regex_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::String)
        .param(ParamType::Any)
        .build(|args: FuncArgs| {
            let re = Regex::new(args[0].as_str().unwrap()).map_err(|e| e.to_string())?;
            let s = primitive_to_string(&args[1])?;
            let caps = re
                .captures(&s)
                .ok_or_else(|| "pattern did not match any part of the given string".to_string())?;
            Ok(captures_value(&re, &caps))
        })
}

pub fn create_regexall_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::String)
        .param(ParamType::Any)
        .build(|args: FuncArgs| {
            let re = Regex::new(args[0].as_str().unwrap()).map_err(|e| e.to_string())?;
            let s = primitive_to_string(&args[1])?;
            let all: Vec<Value> = re
                .captures_iter(&s)
                .map(|caps| captures_value(&re, &caps))
                .collect();
            Ok(Value::from(all))
        })
}

/// Whole match without groups, a map for named groups, a list otherwise.
fn captures_value(re: &Regex, caps: &regex::Captures<'_>) -> Value {
    let group = |m: Option<regex::Match<'_>>| m.map_or(Value::Null, |m| Value::from(m.as_str()));
    if re.captures_len() == 1 {
        return group(caps.get(0));
    }
    let named: Vec<&str> = re.capture_names().flatten().collect();
    if !named.is_empty() {
        let mut map = hcl::value::Map::new();
        for name in named {
            map.insert(name.to_string(), group(caps.name(name)));
        }
        return Value::Object(map);
    }
    Value::from((1..re.captures_len()).map(|i| group(caps.get(i))).collect::<Vec<_>>())
}
