//! Built-in alias types
//!
//! String aliases commonly needed by classification schemas. All are
//! registered over `Str`; hosts may overwrite any of them before the
//! engine freezes.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::Value;

use crate::types::{BaseType, TypeRegistry};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap());

static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").unwrap());

fn as_str(value: &Value) -> Option<&str> {
    value.as_str()
}

fn is_ipv4(value: &Value) -> bool {
    as_str(value).is_some_and(|s| s.parse::<Ipv4Addr>().is_ok())
}

fn is_ipv6(value: &Value) -> bool {
    as_str(value).is_some_and(|s| s.parse::<Ipv6Addr>().is_ok())
}

/// CIDR notation: an IPv4 or IPv6 address, a slash, and a prefix length
/// within the address family's bit width.
fn is_cidr(value: &Value) -> bool {
    let Some(s) = as_str(value) else {
        return false;
    };
    let Some((addr, prefix)) = s.split_once('/') else {
        return false;
    };
    let Ok(bits) = prefix.parse::<u8>() else {
        return false;
    };
    if addr.parse::<Ipv4Addr>().is_ok() {
        bits <= 32
    } else if addr.parse::<Ipv6Addr>().is_ok() {
        bits <= 128
    } else {
        false
    }
}

fn is_email(value: &Value) -> bool {
    as_str(value).is_some_and(|s| EMAIL_RE.is_match(s))
}

fn is_uuid(value: &Value) -> bool {
    as_str(value).is_some_and(|s| UUID_RE.is_match(s))
}

fn is_url(value: &Value) -> bool {
    as_str(value).is_some_and(|s| URL_RE.is_match(s))
}

/// Seed a registry with the built-in aliases.
pub fn register_builtin_types(registry: &mut TypeRegistry) {
    registry.register("ipv4", BaseType::Str, Arc::new(is_ipv4));
    registry.register("ipv6", BaseType::Str, Arc::new(is_ipv6));
    registry.register("cidr", BaseType::Str, Arc::new(is_cidr));
    registry.register("email", BaseType::Str, Arc::new(is_email));
    registry.register("uuid", BaseType::Str, Arc::new(is_uuid));
    registry.register("url", BaseType::Str, Arc::new(is_url));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn builtin() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        register_builtin_types(&mut registry);
        registry
    }

    #[test]
    fn test_ipv4() {
        let r = builtin();
        assert!(r.validate_value("ipv4", &json!("192.168.0.1")));
        assert!(!r.validate_value("ipv4", &json!("192.168.0.256")));
        assert!(!r.validate_value("ipv4", &json!("::1")));
        assert!(!r.validate_value("ipv4", &json!(42)));
    }

    #[test]
    fn test_ipv6() {
        let r = builtin();
        assert!(r.validate_value("ipv6", &json!("::1")));
        assert!(r.validate_value("ipv6", &json!("2001:db8::8a2e:370:7334")));
        assert!(!r.validate_value("ipv6", &json!("10.0.0.1")));
    }

    #[test]
    fn test_cidr() {
        let r = builtin();
        assert!(r.validate_value("cidr", &json!("10.0.0.0/8")));
        assert!(r.validate_value("cidr", &json!("2001:db8::/32")));
        assert!(!r.validate_value("cidr", &json!("10.0.0.0/33")));
        assert!(!r.validate_value("cidr", &json!("10.0.0.0")));
        assert!(!r.validate_value("cidr", &json!("nope/8")));
    }

    #[test]
    fn test_email() {
        let r = builtin();
        assert!(r.validate_value("email", &json!("user@example.com")));
        assert!(!r.validate_value("email", &json!("user@localhost")));
        assert!(!r.validate_value("email", &json!("not-an-email")));
    }

    #[test]
    fn test_uuid() {
        let r = builtin();
        assert!(r.validate_value("uuid", &json!("550e8400-e29b-41d4-a716-446655440000")));
        assert!(r.validate_value("uuid", &json!("550E8400-E29B-41D4-A716-446655440000")));
        assert!(!r.validate_value("uuid", &json!("550e8400e29b41d4a716446655440000")));
    }

    #[test]
    fn test_url() {
        let r = builtin();
        assert!(r.validate_value("url", &json!("https://example.com/path")));
        assert!(!r.validate_value("url", &json!("ftp://example.com")));
    }
}
