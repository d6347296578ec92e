//! Lenient readers for loosely typed JSON values.
//!
//! Archive responses mix numbers, numeric strings, empty strings and nulls in
//! the same column. These helpers collapse all of that to `Option`.

use serde_json::Value;

/// Read a finite number from a JSON number or a numeric string.
pub fn to_num(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Like [`to_num`] but only for integral values.
pub fn to_int(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    let n = to_num(value)?;
    (n.fract() == 0.0 && n.abs() < i64::MAX as f64).then_some(n as i64)
}

/// Trimmed text of a string or number; `None` for blanks and everything else.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Field `key` of a JSON object as a number.
pub fn field_num(row: &Value, key: &str) -> Option<f64> {
    row.get(key).and_then(to_num)
}

/// Field `key` of a JSON object as trimmed text.
pub fn field_text(row: &Value, key: &str) -> Option<String> {
    row.get(key).and_then(value_text)
}
