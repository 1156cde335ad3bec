use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Parses a JSON value into a Decimal.
/// Handles Numbers directly, and tries to parse Strings.
/// Returns zero if parsing fails or value is null/other.
pub fn parse_decimal(v: &Value) -> Decimal {
    match v {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Decimal::from(i);
            }
            let repr = n.to_string();
            repr.parse::<Decimal>()
                .or_else(|_| Decimal::from_scientific(&repr))
                .ok()
                .or_else(|| n.as_f64().and_then(Decimal::from_f64_retain))
                .unwrap_or(Decimal::ZERO)
        }
        Value::String(s) => s.trim().parse().unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}

/// Helper to parse optional reference to Value
pub fn parse_decimal_opt(v: Option<&Value>) -> Decimal {
    match v {
        Some(val) => parse_decimal(val),
        None => Decimal::ZERO,
    }
}

/// Deserializes an amount that may arrive as a number, a numeric string or null.
pub fn lenient_decimal<'de, D>(d: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(d)?;
    Ok(parse_decimal(&raw))
}

/// Deserializes a `{key: amount}` map, coercing every value through [`parse_decimal`].
pub fn lenient_decimal_map<'de, D>(d: D) -> Result<BTreeMap<String, Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Value>>::deserialize(d)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, parse_decimal(&v)))
        .collect())
}

/// Treats an explicit `null` like a missing field.
pub fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Optional text that may have been stored as a number.
pub fn lenient_text<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// JSON number for an amount: an integer when there is no fractional part.
pub fn decimal_to_value(d: Decimal) -> Value {
    if d.fract().is_zero()
        && let Some(i) = d.to_i64()
    {
        return Value::from(i);
    }
    d.to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

pub fn serialize_amount<S: Serializer>(d: &Decimal, s: S) -> Result<S::Ok, S::Error> {
    if d.fract().is_zero()
        && let Some(i) = d.to_i64()
    {
        return s.serialize_i64(i);
    }
    s.serialize_f64(d.to_f64().unwrap_or_default())
}

pub fn serialize_amount_map<S: Serializer>(m: &BTreeMap<String, Decimal>, s: S) -> Result<S::Ok, S::Error> {
    let mut map = s.serialize_map(Some(m.len()))?;
    for (k, v) in m {
        map.serialize_entry(k, &decimal_to_value(*v))?;
    }
    map.end()
}

/// The id of a journal line's account, whether stored as a string or as `{id}`.
pub fn line_account_id(line: &Value) -> Option<&str> {
    match line.get("account")? {
        Value::String(s) => Some(s.as_str()),
        other => other.get("id").and_then(|v| v.as_str()),
    }
}
