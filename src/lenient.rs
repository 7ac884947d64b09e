//! Field deserializers that coerce what table editors hand back instead of
//! rejecting the whole store. Off-type values fall back to a default and log.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

fn describe(v: &Value) -> String {
    let s = v.to_string();
    if s.chars().count() <= 40 {
        return s;
    }
    let mut short: String = s.chars().take(40).collect();
    short.push_str("...");
    short
}

pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => {
            warn!("expected text, got {}; keeping its JSON form", describe(&other));
            other.to_string()
        }
    })
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }
}

pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(match as_f64(&v) {
        Some(n) if n.is_finite() => n,
        _ => {
            if !v.is_null() {
                warn!("expected a number, got {}; using 0", describe(&v));
            }
            0.0
        }
    })
}

/// Any number or numeric string, rounded and clamped to 0..=100.
pub fn percent<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
    let v = Value::deserialize(d)?;
    let Some(n) = as_f64(&v).filter(|n| n.is_finite()) else {
        if !v.is_null() {
            warn!("expected a percentage, got {}; using 0", describe(&v));
        }
        return Ok(0);
    };
    let clamped = n.round().clamp(0.0, 100.0);
    if clamped != n.round() {
        warn!("percentage {n} outside 0..=100; clamped to {clamped}");
    }
    Ok(clamped as u8)
}

/// Plain string payload, or `None` for anything else.
pub fn string_value<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

pub fn text_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items
            .into_iter()
            .filter(|v| !v.is_null())
            .map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Value::Null => Vec::new(),
        Value::String(s) => vec![s],
        other => {
            warn!("expected a list of text, got {}; using none", describe(&other));
            Vec::new()
        }
    })
}
