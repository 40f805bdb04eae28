use anyhow::Result;
use bigdecimal::BigDecimal;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::core::types::ProtocolType;

/// 对象深度合并的最大递归层数
const MAX_MERGE_DEPTH: usize = 10;

/// 将字符串转换为 BigDecimal
pub fn str_to_bigdecimal(s: &str) -> Result<BigDecimal> {
    BigDecimal::from_str(s).map_err(|e| anyhow::anyhow!("Failed to parse BigDecimal: {}", e))
}

/// 根据代币精度把最小单位数量换算为可读数量
pub fn from_wei(wei: &str, decimals: u8) -> Result<BigDecimal> {
    str_to_bigdecimal(&format!("{}e-{}", wei, decimals))
}

/// 把可读数量换算为最小单位数量（截断多余小数位）
pub fn to_wei(amount: &BigDecimal, decimals: u8) -> Result<String> {
    let multiplier = str_to_bigdecimal(&format!("1e{}", decimals))?;
    Ok((amount * multiplier).with_scale(0).to_string())
}

/// 按协议规范化地址：EVM 地址大小写不敏感，其余协议精确匹配
pub fn normalize_address(protocol: ProtocolType, address: &str) -> String {
    let trimmed = address.trim();
    match protocol {
        ProtocolType::Ethereum => trimmed.to_lowercase(),
        ProtocolType::Sealevel | ProtocolType::Cosmos | ProtocolType::CosmosNative => {
            trimmed.to_string()
        }
    }
}

/// 规范化后比较两个地址
pub fn addresses_equal(protocol: ProtocolType, a: &str, b: &str) -> bool {
    normalize_address(protocol, a) == normalize_address(protocol, b)
}

/// JSON 值是否为"真值"：null、false、0、空字符串视为假
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// 过滤 map 中值为空或假值的项
pub fn obj_filter<K: Ord>(map: BTreeMap<K, Option<Value>>) -> BTreeMap<K, Value> {
    map.into_iter()
        .filter_map(|(key, value)| value.filter(is_truthy).map(|value| (key, value)))
        .collect()
}

/// 深度合并两个 JSON 值，`b` 覆盖 `a`
///
/// 对象逐键递归合并；数组与标量直接替换；`b` 为 null 时保留 `a`。
pub fn obj_merge(a: &Value, b: &Value) -> Value {
    merge_with_depth(a, b, MAX_MERGE_DEPTH)
}

fn merge_with_depth(a: &Value, b: &Value, depth: usize) -> Value {
    match (a, b) {
        (Value::Object(left), Value::Object(right)) if depth > 0 => {
            let mut merged = Map::new();
            for (key, value) in left {
                let next = match right.get(key) {
                    Some(other) => merge_with_depth(value, other, depth - 1),
                    None => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            for (key, value) in right {
                if !left.contains_key(key) {
                    merged.insert(key.clone(), value.clone());
                }
            }
            Value::Object(merged)
        }
        (_, Value::Null) => a.clone(),
        _ => b.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_wei() {
        let amount = from_wei("1500000", 6).unwrap();
        assert_eq!(amount, BigDecimal::from_str("1.5").unwrap());
    }

    #[test]
    fn test_to_wei_truncates() {
        let amount = BigDecimal::from_str("1.2345678").unwrap();
        assert_eq!(to_wei(&amount, 6).unwrap(), "1234567");
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(
            normalize_address(ProtocolType::Ethereum, "0xABCdef"),
            "0xabcdef"
        );
        assert_eq!(
            normalize_address(ProtocolType::Sealevel, "So11111111111111111111111111111111111111112"),
            "So11111111111111111111111111111111111111112"
        );
        assert!(!addresses_equal(ProtocolType::Cosmos, "uATOM", "uatom"));
        assert!(addresses_equal(ProtocolType::Ethereum, "0xAbC", "0xaBc"));
    }

    #[test]
    fn test_is_truthy() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(is_truthy(&json!({})));
        assert!(is_truthy(&json!("x")));
    }

    #[test]
    fn test_obj_filter() {
        let mut map = BTreeMap::new();
        map.insert("a", Some(json!({"displayName": "A"})));
        map.insert("b", None);
        map.insert("c", Some(json!(false)));
        map.insert("d", Some(json!("")));

        let filtered = obj_filter(map);
        assert_eq!(filtered.len(), 1);
        assert!(filtered.contains_key("a"));
    }

    #[test]
    fn test_obj_merge() {
        let base = json!({
            "name": "ethereum",
            "rpcUrls": [{"http": "https://a"}, {"http": "https://b"}],
            "nativeToken": {"symbol": "ETH", "decimals": 18},
        });
        let overrides = json!({
            "rpcUrls": [{"http": "https://c"}],
            "nativeToken": {"name": "Ether"},
            "displayName": null,
        });
        let merged = obj_merge(&base, &overrides);
        assert_eq!(merged["rpcUrls"], json!([{"http": "https://c"}]));
        assert_eq!(merged["nativeToken"]["symbol"], "ETH");
        assert_eq!(merged["nativeToken"]["name"], "Ether");
        assert_eq!(merged["name"], "ethereum");
        assert_eq!(merged["displayName"], Value::Null);
    }
}
