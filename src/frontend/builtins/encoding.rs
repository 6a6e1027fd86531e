use base64::{engine::general_purpose, Engine as _};
use hcl::eval::{FuncArgs, FuncDef, ParamType};
use hcl::Value;
use sha2::{Digest, Sha256, Sha512};

use super::primitive_to_string;

/// Base64 encoding/decoding functions
pub fn create_base64encode_func() -> FuncDef {
    FuncDef::builder().param(ParamType::Any).build(|args: FuncArgs| {
        let input = primitive_to_string(&args[0])?;
        Ok(Value::from(general_purpose::STANDARD.encode(input.as_bytes())))
    })
}

pub fn create_base64decode_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::String)
        .build(|args: FuncArgs| {
            let input = args[0].as_str().unwrap();
            match general_purpose::STANDARD.decode(input) {
                Ok(decoded_bytes) => match String::from_utf8(decoded_bytes) {
                    Ok(decoded_string) => Ok(Value::from(decoded_string)),
                    Err(_) => Err("Invalid UTF-8 in decoded data".to_string()),
                },
                Err(_) => Err("Invalid base64 string".to_string()),
            }
        })
}

/// Hex digest of a primitive argument.
fn digest_func<D: Digest>() -> FuncDef {
    FuncDef::builder().param(ParamType::Any).build(|args: FuncArgs| {
        let input = primitive_to_string(&args[0])?;
        let hex: String = D::digest(input.as_bytes())
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        Ok(Value::from(hex))
    })
}

pub fn create_md5_func() -> FuncDef {
    FuncDef::builder().param(ParamType::Any).build(|args: FuncArgs| {
        let input = primitive_to_string(&args[0])?;
        Ok(Value::from(format!("{:x}", md5::compute(input.as_bytes()))))
    })
}

pub fn create_sha256_func() -> FuncDef {
    digest_func::<Sha256>()
}

pub fn create_sha512_func() -> FuncDef {
    digest_func::<Sha512>()
}

#[cfg(test)]
mod tests {
    use super::super::test_support::eval;
    use hcl::Value;

    #[test]
    fn test_base64encode_function() {
        // Base64 of "hello world" is "aGVsbG8gd29ybGQ="
        assert_eq!(
            eval("base64encode(\"hello world\")").unwrap(),
            Value::from("aGVsbG8gd29ybGQ=")
        );
        assert_eq!(eval("base64encode(\"\")").unwrap(), Value::from(""));
    }

    #[test]
    fn test_base64decode_function() {
        assert_eq!(
            eval("base64decode(\"aGVsbG8gd29ybGQ=\")").unwrap(),
            Value::from("hello world")
        );
    }

    #[test]
    fn test_base64decode_invalid() {
        let err = eval("base64decode(\"invalid-base64!\")").unwrap_err();
        assert!(err.contains("Invalid base64"));
    }

    #[test]
    fn test_md5_function() {
        assert_eq!(
            eval("md5(\"hello world\")").unwrap(),
            Value::from("5eb63bbbe01eeed093cb22bb8f5acdc3")
        );
    }

    #[test]
    fn test_sha256_function() {
        assert_eq!(
            eval("sha256(\"hello world\")").unwrap(),
            Value::from("b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9")
        );
    }

    #[test]
    fn test_sha512_length() {
        let v = eval("sha512(\"abc\")").unwrap();
        assert_eq!(v.as_str().unwrap().len(), 128);
    }
}
