// Built-in functions organized by category

pub mod collection;
pub mod conversion;
pub mod encoding;
pub mod network;
pub mod numeric;
pub mod string;

use hcl::eval::{Context, FuncDef};
use hcl::Value;

type Builtin = (&'static str, fn() -> FuncDef);

/// Every function a configuration may call. Anything not listed here is
/// rejected by the evaluator.
const BUILTINS: &[Builtin] = &[
    // string
    ("upper", string::create_upper_func),
    ("lower", string::create_lower_func),
    ("title", string::create_title_func),
    ("chomp", string::create_chomp_func),
    ("trimspace", string::create_trimspace_func),
    ("trim", string::create_trim_func),
    ("trimprefix", string::create_trimprefix_func),
    ("trimsuffix", string::create_trimsuffix_func),
    ("replace", string::create_replace_func),
    ("substr", string::create_substr_func),
    ("format", string::create_format_func),
    ("join", string::create_join_func),
    ("split", string::create_split_func),
    ("strrev", string::create_strrev_func),
    ("startswith", string::create_startswith_func),
    ("endswith", string::create_endswith_func),
    ("indent", string::create_indent_func),
    ("regex", string::create_regex_func),
    ("regexall", string::create_regexall_func),
    // collection
    ("length", collection::create_length_func),
    ("concat", collection::create_concat_func),
    ("merge", collection::create_merge_func),
    ("lookup", collection::create_lookup_func),
    ("element", collection::create_element_func),
    ("keys", collection::create_keys_func),
    ("values", collection::create_values_func),
    ("contains", collection::create_contains_func),
    ("distinct", collection::create_distinct_func),
    ("flatten", collection::create_flatten_func),
    ("reverse", collection::create_reverse_func),
    ("slice", collection::create_slice_func),
    ("sort", collection::create_sort_func),
    ("compact", collection::create_compact_func),
    ("coalesce", collection::create_coalesce_func),
    ("coalescelist", collection::create_coalescelist_func),
    ("index", collection::create_index_func),
    ("zipmap", collection::create_zipmap_func),
    ("range", collection::create_range_func),
    ("setunion", collection::create_setunion_func),
    ("setintersection", collection::create_setintersection_func),
    ("one", collection::create_one_func),
    ("alltrue", collection::create_alltrue_func),
    ("anytrue", collection::create_anytrue_func),
    // conversion
    ("tostring", conversion::create_tostring_func),
    ("tonumber", conversion::create_tonumber_func),
    ("tobool", conversion::create_tobool_func),
    ("tolist", conversion::create_tolist_func),
    ("toset", conversion::create_toset_func),
    ("tomap", conversion::create_tomap_func),
    ("jsonencode", conversion::create_jsonencode_func),
    ("jsondecode", conversion::create_jsondecode_func),
    // numeric
    ("min", numeric::create_min_func),
    ("max", numeric::create_max_func),
    ("abs", numeric::create_abs_func),
    ("ceil", numeric::create_ceil_func),
    ("floor", numeric::create_floor_func),
    ("pow", numeric::create_pow_func),
    ("signum", numeric::create_signum_func),
    ("parseint", numeric::create_parseint_func),
    // encoding and hashing
    ("base64encode", encoding::create_base64encode_func),
    ("base64decode", encoding::create_base64decode_func),
    ("md5", encoding::create_md5_func),
    ("sha256", encoding::create_sha256_func),
    ("sha512", encoding::create_sha512_func),
    // network
    ("cidrsubnet", network::create_cidrsubnet_func),
    ("cidrhost", network::create_cidrhost_func),
];

/// Functions whose result depends on the filesystem, the clock or
/// randomness. They are unknown during static resolution and yield null.
pub const DEFERRED: &[&str] = &[
    "timestamp",
    "plantimestamp",
    "uuid",
    "bcrypt",
    "file",
    "filebase64",
    "filemd5",
    "filesha256",
    "fileexists",
    "templatefile",
];

/// Functions that accept null arguments. Every other function returns null
/// as soon as one of its arguments is null.
pub const NULL_TOLERANT: &[&str] = &["coalesce", "jsonencode", "tostring", "merge", "lookup"];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.iter().any(|(n, _)| *n == name)
}

/// Create a context with all built-in functions
pub fn create_context() -> Context<'static> {
    let mut ctx = Context::new();
    for (name, create) in BUILTINS {
        ctx.declare_func(*name, create());
    }
    ctx
}

/// Primitive argument rendered as a string, the way Terraform converts
/// numbers and booleans passed to string parameters.
pub(crate) fn primitive_to_string(v: &Value) -> Result<String, String> {
    match v {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Err("argument must not be null".to_string()),
        _ => Err(format!("expected a string, got {}", kind(v))),
    }
}

pub(crate) fn number_arg(v: &Value) -> Result<f64, String> {
    match v {
        Value::Number(n) => n.as_f64().ok_or_else(|| "invalid number".to_string()),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("cannot convert \"{s}\" to a number")),
        _ => Err(format!("expected a number, got {}", kind(v))),
    }
}

pub(crate) fn int_arg(v: &Value) -> Result<i64, String> {
    let f = number_arg(v)?;
    if f.fract() != 0.0 {
        return Err(format!("expected a whole number, got {f}"));
    }
    Ok(f as i64)
}

/// Number value, kept integral when possible.
pub(crate) fn number_value(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < 9.0e15 {
        Value::from(f as i64)
    } else {
        hcl::Number::from_f64(f).map_or(Value::Null, Value::Number)
    }
}

pub(crate) fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}
