use std::net::Ipv4Addr;

use hcl::eval::{FuncArgs, FuncDef, ParamType};
use hcl::Value;

use super::int_arg;

/// IPv4 prefix parsed from `a.b.c.d/len`.
struct Prefix {
    base: u32,
    len: u32,
}

impl Prefix {
    fn parse(cidr: &str) -> Result<Self, String> {
        let (addr, len) = cidr
            .split_once('/')
            .ok_or_else(|| format!("invalid CIDR address \"{cidr}\""))?;
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|_| format!("invalid IPv4 address \"{addr}\""))?;
        let len: u32 = len
            .parse()
            .ok()
            .filter(|l| *l <= 32)
            .ok_or_else(|| format!("invalid prefix length in \"{cidr}\""))?;
        Ok(Prefix {
            base: u32::from(addr) & mask(len),
            len,
        })
    }

    fn host_bits(&self) -> u32 {
        32 - self.len
    }
}

fn mask(len: u32) -> u32 {
    if len == 0 {
        0
    } else {
        u32::MAX << (32 - len)
    }
}

/// `cidrsubnet(prefix, newbits, netnum)`
pub fn create_cidrsubnet_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::String)
        .param(ParamType::Any)
        .param(ParamType::Any)
        .build(|args: FuncArgs| {
            let prefix = Prefix::parse(args[0].as_str().unwrap())?;
            let newbits = int_arg(&args[1])?;
            let netnum = int_arg(&args[2])?;
            if newbits < 0 || prefix.len as i64 + newbits > 32 {
                return Err(format!(
                    "insufficient address space to extend prefix of {} by {newbits}",
                    prefix.len
                ));
            }
            let new_len = prefix.len + newbits as u32;
            if netnum < 0 || (netnum as u64) >= 1u64 << newbits {
                return Err(format!("prefix extension of {newbits} does not accommodate a subnet numbered {netnum}"));
            }
            let network = prefix.base | ((netnum as u32).checked_shl(32 - new_len).unwrap_or(0));
            Ok(Value::from(format!("{}/{new_len}", Ipv4Addr::from(network))))
        })
}

/// `cidrhost(prefix, hostnum)`; negative numbers count back from the end
pub fn create_cidrhost_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::String)
        .param(ParamType::Any)
        .build(|args: FuncArgs| {
            let prefix = Prefix::parse(args[0].as_str().unwrap())?;
            let hostnum = int_arg(&args[1])?;
            let size = 1i64 << prefix.host_bits();
            let offset = if hostnum < 0 { size + hostnum } else { hostnum };
            if offset < 0 || offset >= size {
                return Err(format!(
                    "prefix of {} bits cannot accommodate a host numbered {hostnum}",
                    prefix.host_bits()
                ));
            }
            let host = prefix.base.wrapping_add(offset as u32);
            Ok(Value::from(Ipv4Addr::from(host).to_string()))
        })
}
