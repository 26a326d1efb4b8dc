//! SQL string escaping.
//!
//! [`escape_string`] is the character-set-unaware routine. It is correct
//! for ASCII-compatible character sets only; an open connection should use
//! its own charset-aware escaping instead.

use crate::convert::{format_date, format_time, format_timestamp, parse_decimal};
use crate::error::{Error, Result};
use crate::value::Value;
use std::collections::BTreeMap;

/// Escape the bytes that are special inside a quoted SQL string.
pub fn escape_string(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() * 2);
    for &b in input {
        match b {
            0 => out.extend_from_slice(b"\\0"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\'' => out.extend_from_slice(b"\\'"),
            b'"' => out.extend_from_slice(b"\\\""),
            0x1a => out.extend_from_slice(b"\\Z"),
            other => out.push(other),
        }
    }
    out
}

/// Escape and wrap in single quotes.
pub fn string_literal(input: &[u8]) -> Vec<u8> {
    quote(&escape_string(input))
}

/// Wrap already escaped bytes in single quotes.
pub fn quote(escaped: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(escaped.len() + 2);
    out.push(b'\'');
    out.extend_from_slice(escaped);
    out.push(b'\'');
    out
}

/// Render a value as an SQL literal.
///
/// `literal` quotes string-like payloads; pass [`string_literal`] or a
/// connection's charset-aware equivalent.
pub fn value_literal<F>(value: &Value, literal: F) -> Result<Vec<u8>>
where
    F: Fn(&[u8]) -> Vec<u8>,
{
    Ok(match value {
        Value::Null => b"NULL".to_vec(),
        Value::Int(v) => v.to_string().into_bytes(),
        Value::UInt(v) => v.to_string().into_bytes(),
        Value::Double(v) => {
            if !v.is_finite() {
                return Err(Error::conversion(format!(
                    "{} has no SQL literal",
                    v
                )));
            }
            format!("{:e}", v).into_bytes()
        }
        Value::Decimal(s) => {
            parse_decimal(s.as_bytes())?;
            s.clone().into_bytes()
        }
        Value::Text(s) => literal(s.as_bytes()),
        Value::Bytes(b) => literal(b),
        Value::Date(days) => literal(format_date(*days)?.as_bytes()),
        Value::Time(micros) => literal(format_time(*micros).as_bytes()),
        Value::Timestamp(micros) => literal(format_timestamp(*micros)?.as_bytes()),
        Value::Set(members) => literal(members.join(",").as_bytes()),
        Value::Json(json) => literal(json.to_string().as_bytes()),
    })
}

/// Render every value of a sequence as an SQL literal, in order.
pub fn escape_sequence<F>(values: &[Value], literal: F) -> Result<Vec<Vec<u8>>>
where
    F: Fn(&[u8]) -> Vec<u8>,
{
    values.iter().map(|v| value_literal(v, &literal)).collect()
}

/// Render every value of a map as an SQL literal, keeping the keys.
pub fn escape_dict<F>(
    values: &BTreeMap<String, Value>,
    literal: F,
) -> Result<BTreeMap<String, Vec<u8>>>
where
    F: Fn(&[u8]) -> Vec<u8>,
{
    values
        .iter()
        .map(|(k, v)| Ok((k.clone(), value_literal(v, &literal)?)))
        .collect()
}

/// Reverse [`escape_string`].
#[cfg(test)]
pub(crate) fn unescape(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut iter = input.iter().copied();
    while let Some(b) = iter.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        match iter.next() {
            Some(b'0') => out.push(0),
            Some(b'n') => out.push(b'\n'),
            Some(b'r') => out.push(b'\r'),
            Some(b'Z') => out.push(0x1a),
            Some(other) => out.push(other),
            None => out.push(b'\\'),
        }
    }
    out
}
