use hcl::eval::{FuncArgs, FuncDef, ParamType};
use hcl::Value;

use super::{number_arg, number_value, primitive_to_string};

fn fold_numbers(args: &FuncArgs, pick: fn(f64, f64) -> f64) -> Result<Value, String> {
    let mut nums = args.iter().map(number_arg);
    let first = nums
        .next()
        .ok_or_else(|| "at least one argument is required".to_string())??;
    let result = nums.try_fold(first, |acc, n| n.map(|n| pick(acc, n)))?;
    Ok(number_value(result))
}

pub fn create_min_func() -> FuncDef {
    FuncDef::builder()
        .variadic_param(ParamType::Any)
        .build(|args: FuncArgs| fold_numbers(&args, f64::min))
}

pub fn create_max_func() -> FuncDef {
    FuncDef::builder()
        .variadic_param(ParamType::Any)
        .build(|args: FuncArgs| fold_numbers(&args, f64::max))
}

pub fn create_abs_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::Any)
        .build(|args: FuncArgs| Ok(number_value(number_arg(&args[0])?.abs())))
}

pub fn create_ceil_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::Any)
        .build(|args: FuncArgs| Ok(number_value(number_arg(&args[0])?.ceil())))
}

pub fn create_floor_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::Any)
        .build(|args: FuncArgs| Ok(number_value(number_arg(&args[0])?.floor())))
}

pub fn create_pow_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::Any)
        .param(ParamType::Any)
        .build(|args: FuncArgs| {
            let base = number_arg(&args[0])?;
            let exp = number_arg(&args[1])?;
            Ok(number_value(base.powf(exp)))
        })
}

pub fn create_signum_func() -> FuncDef {
    FuncDef::builder().param(ParamType::Any).build(|args: FuncArgs| {
        let n = number_arg(&args[0])?;
        let sign = if n > 0.0 {
            1
        } else if n < 0.0 {
            -1
        } else {
            0
        };
        Ok(Value::from(sign))
    })
}

/// `parseint(string, base)` for bases 2 through 36
pub fn create_parseint_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::Any)
        .param(ParamType::Any)
        .build(|args: FuncArgs| {
            let s = primitive_to_string(&args[0])?;
            let base = super::int_arg(&args[1])?;
            if !(2..=36).contains(&base) {
                return Err(format!("base must be between 2 and 36, got {base}"));
            }
            i64::from_str_radix(&s, base as u32)
                .map(Value::from)
                .map_err(|_| format!("cannot parse \"{s}\" as a base {base} integer"))
        })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::eval;
    use hcl::Value;

    #[test]
    fn test_min_max() {
        assert_eq!(eval("min(3, 1, 2)").unwrap(), Value::from(1));
        assert_eq!(eval("max(3, 1, 2)").unwrap(), Value::from(3));
        assert!(eval("max()").is_err());
    }

    #[test]
    fn test_rounding() {
        assert_eq!(eval("ceil(1.2)").unwrap(), Value::from(2));
        assert_eq!(eval("floor(1.8)").unwrap(), Value::from(1));
        assert_eq!(eval("abs(-4)").unwrap(), Value::from(4));
    }

    #[test]
    fn test_pow_and_signum() {
        assert_eq!(eval("pow(2, 10)").unwrap(), Value::from(1024));
        assert_eq!(eval("signum(-7)").unwrap(), Value::from(-1));
        assert_eq!(eval("signum(0)").unwrap(), Value::from(0));
    }

    #[test]
    fn test_parseint() {
        assert_eq!(eval("parseint(\"ff\", 16)").unwrap(), Value::from(255));
        assert_eq!(eval("parseint(\"101\", 2)").unwrap(), Value::from(5));
        assert!(eval("parseint(\"zz\", 10)").is_err());
        assert!(eval("parseint(\"1\", 64)").is_err());
    }
}
