//! Column converters.
//!
//! A [`Converters`] mapping is handed to a connection at connect time and
//! consulted once per result set: every column gets exactly one
//! [`Converter`], chosen by field-type code and refined by field flags.
//! Rows are then converted column by column with [`convert_column`].
//!
//! The default table ([`Converters::default_conversions`]) turns the
//! textual protocol representation of each MySQL type into a [`Value`].

use crate::error::{ConversionError, Error, Result};
use crate::field::{FieldDescriptor, FieldType, flags};
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A function turning raw column bytes into a value.
pub type Converter = Arc<dyn Fn(&[u8]) -> Result<Value> + Send + Sync>;

/// Wrap a closure as a [`Converter`].
pub fn converter<F>(f: F) -> Converter
where
    F: Fn(&[u8]) -> Result<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// What the mapping holds for one field-type code.
#[derive(Clone)]
pub enum ConverterEntry {
    /// Always use this converter.
    Single(Converter),
    /// Ordered `(flag_mask, converter)` pairs. The first pair whose mask
    /// intersects the column flags wins; a mask of 0 matches any column.
    Flagged(Vec<(u32, Converter)>),
}

impl ConverterEntry {
    fn select(&self, field: &FieldDescriptor) -> Option<Converter> {
        match self {
            ConverterEntry::Single(conv) => Some(Arc::clone(conv)),
            ConverterEntry::Flagged(pairs) => {
                let col_flags = field.conversion_flags();
                pairs
                    .iter()
                    .find(|(mask, _)| *mask == 0 || mask & col_flags != 0)
                    .map(|(_, conv)| Arc::clone(conv))
            }
        }
    }
}

impl fmt::Debug for ConverterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConverterEntry::Single(_) => f.write_str("Single(<converter>)"),
            ConverterEntry::Flagged(pairs) => f
                .debug_list()
                .entries(pairs.iter().map(|(mask, _)| mask))
                .finish(),
        }
    }
}

/// Mapping from field-type code to converter entry.
#[derive(Clone, Debug, Default)]
pub struct Converters {
    entries: HashMap<u8, ConverterEntry>,
}

impl Converters {
    /// An empty mapping: every column resolves to the passthrough.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `conv` for every column of type `ty`.
    pub fn insert(&mut self, ty: impl Into<u8>, conv: Converter) -> &mut Self {
        self.entries.insert(ty.into(), ConverterEntry::Single(conv));
        self
    }

    /// Use the first matching `(flag_mask, converter)` pair for type `ty`.
    pub fn insert_flagged(&mut self, ty: impl Into<u8>, pairs: Vec<(u32, Converter)>) -> &mut Self {
        self.entries.insert(ty.into(), ConverterEntry::Flagged(pairs));
        self
    }

    /// Builder form of [`Converters::insert`].
    pub fn with(mut self, ty: impl Into<u8>, conv: Converter) -> Self {
        self.insert(ty, conv);
        self
    }

    pub fn remove(&mut self, ty: impl Into<u8>) -> Option<ConverterEntry> {
        self.entries.remove(&ty.into())
    }

    pub fn get(&self, ty: impl Into<u8>) -> Option<&ConverterEntry> {
        self.entries.get(&ty.into())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pick the converter for one column.
    ///
    /// Never fails: a missing entry, or a flagged list with no matching
    /// mask, resolves to [`passthrough`].
    pub fn resolve(&self, field: &FieldDescriptor) -> Converter {
        self.entries
            .get(&field.type_code)
            .and_then(|entry| entry.select(field))
            .unwrap_or_else(|| {
                tracing::trace!(
                    column = %field.name,
                    type_code = field.type_code,
                    "no converter matched; using passthrough"
                );
                passthrough(field.type_code)
            })
    }

    /// Resolve every column of a result set, in column order.
    pub fn resolve_all(&self, fields: &[FieldDescriptor]) -> Vec<Converter> {
        fields.iter().map(|f| self.resolve(f)).collect()
    }

    /// The standard conversion table.
    pub fn default_conversions() -> Self {
        let mut conv = Self::new();
        let int = converter(parse_int);
        for ty in [
            FieldType::Tiny,
            FieldType::Short,
            FieldType::Long,
            FieldType::LongLong,
            FieldType::Int24,
            FieldType::Year,
        ] {
            conv.insert(ty, Arc::clone(&int));
        }
        let float = converter(parse_float);
        conv.insert(FieldType::Float, Arc::clone(&float));
        conv.insert(FieldType::Double, float);
        let decimal = converter(parse_decimal);
        conv.insert(FieldType::Decimal, Arc::clone(&decimal));
        conv.insert(FieldType::NewDecimal, decimal);
        conv.insert(FieldType::Set, converter(parse_set));
        conv.insert(FieldType::Date, converter(parse_date));
        conv.insert(FieldType::DateTime, converter(parse_datetime));
        conv.insert(FieldType::Timestamp, converter(parse_timestamp));
        conv.insert(FieldType::Time, converter(parse_time));
        conv.insert(FieldType::Json, converter(parse_json));

        let bytes = converter(|raw| Ok(Value::Bytes(raw.to_vec())));
        let text = converter(|raw| Ok(Value::Text(lossy_text(raw))));
        for ty in [
            FieldType::Blob,
            FieldType::String,
            FieldType::VarString,
            FieldType::VarChar,
        ] {
            conv.insert_flagged(
                ty,
                vec![(flags::BINARY, Arc::clone(&bytes)), (0, Arc::clone(&text))],
            );
        }
        conv
    }
}

/// The converter used when the mapping has nothing for a column.
///
/// Binary-ish field types come back as bytes, everything else as text.
pub fn passthrough(type_code: u8) -> Converter {
    let binary = FieldType::from_code(type_code).is_some_and(FieldType::is_binary_passthrough);
    if binary {
        converter(|raw| Ok(Value::Bytes(raw.to_vec())))
    } else {
        converter(|raw| Ok(Value::Text(lossy_text(raw))))
    }
}

/// Convert one column of one row.
///
/// A SQL NULL (`None`) is [`Value::Null`] without calling the converter.
/// Converter failures are tagged with the column they happened in.
pub fn convert_column(
    conv: &Converter,
    field: &FieldDescriptor,
    raw: Option<&[u8]>,
) -> Result<Value> {
    let Some(raw) = raw else {
        return Ok(Value::Null);
    };
    conv(raw).map_err(|err| {
        let (message, source) = match err {
            Error::Conversion(inner) => (inner.message, inner.source),
            other => (
                other.to_string(),
                Some(Box::new(other) as Box<dyn std::error::Error + Send + Sync>),
            ),
        };
        Error::Conversion(ConversionError {
            column: Some(field.name.clone()),
            field_type: Some(field.type_code),
            message,
            source,
        })
    })
}

fn lossy_text(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn ascii(raw: &[u8]) -> Result<&str> {
    std::str::from_utf8(raw)
        .map(str::trim)
        .map_err(|e| Error::Conversion(ConversionError {
            column: None,
            field_type: None,
            message: "column value is not valid UTF-8".to_string(),
            source: Some(Box::new(e)),
        }))
}

/// Integer columns. Values beyond `i64` become [`Value::UInt`].
pub fn parse_int(raw: &[u8]) -> Result<Value> {
    let s = ascii(raw)?;
    if let Ok(v) = s.parse::<i64>() {
        return Ok(Value::Int(v));
    }
    s.parse::<u64>()
        .map(Value::UInt)
        .map_err(|_| Error::conversion(format!("invalid integer literal: {:?}", s)))
}

/// FLOAT and DOUBLE columns.
pub fn parse_float(raw: &[u8]) -> Result<Value> {
    let s = ascii(raw)?;
    s.parse::<f64>()
        .map(Value::Double)
        .map_err(|_| Error::conversion(format!("invalid float literal: {:?}", s)))
}

/// DECIMAL columns, kept as their exact decimal string.
pub fn parse_decimal(raw: &[u8]) -> Result<Value> {
    let s = ascii(raw)?;
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    let mut parts = digits.splitn(2, '.');
    let int_part = parts.next().unwrap_or("");
    let frac_part = parts.next().unwrap_or("");
    let valid = !(int_part.is_empty() && frac_part.is_empty())
        && int_part.bytes().all(|b| b.is_ascii_digit())
        && frac_part.bytes().all(|b| b.is_ascii_digit());
    if valid {
        Ok(Value::Decimal(s.to_string()))
    } else {
        Err(Error::conversion(format!("invalid decimal literal: {:?}", s)))
    }
}

/// SET columns: comma separated members, empty members dropped.
pub fn parse_set(raw: &[u8]) -> Result<Value> {
    let s = lossy_text(raw);
    Ok(Value::Set(
        s.split(',')
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect(),
    ))
}

/// JSON columns.
pub fn parse_json(raw: &[u8]) -> Result<Value> {
    serde_json::from_slice(raw).map(Value::Json).map_err(|e| {
        Error::Conversion(ConversionError {
            column: None,
            field_type: Some(FieldType::Json.code()),
            message: format!("invalid JSON: {}", e),
            source: Some(Box::new(e)),
        })
    })
}

/// DATE columns. Dates that do not exist (`0000-00-00`) are NULL.
pub fn parse_date(raw: &[u8]) -> Result<Value> {
    let s = lossy_text(raw);
    Ok(date_days(s.trim()).map_or(Value::Null, Value::Date))
}

/// DATETIME columns: `YYYY-MM-DD hh:mm:ss[.ffffff]`, with either a space
/// or `T` between date and time. A bare date stays a [`Value::Date`].
pub fn parse_datetime(raw: &[u8]) -> Result<Value> {
    let s = lossy_text(raw);
    let s = s.trim();
    let Some((date, time)) = s.split_once(' ').or_else(|| s.split_once('T')) else {
        return Ok(date_days(s).map_or(Value::Null, Value::Date));
    };
    let value = date_days(date).zip(clock_micros(time)).map(|(days, micros)| {
        Value::Timestamp(i64::from(days) * MICROS_PER_DAY + micros)
    });
    Ok(value.unwrap_or(Value::Null))
}

/// TIMESTAMP columns. Servers before 4.1 send the compact
/// `YYYYMMDDhhmmss` form, possibly truncated; it is zero padded.
pub fn parse_timestamp(raw: &[u8]) -> Result<Value> {
    if raw.get(4) == Some(&b'-') {
        return parse_datetime(raw);
    }
    let s = lossy_text(raw);
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) || s.len() > 14 {
        return Ok(Value::Null);
    }
    let padded = format!("{:0<14}", s);
    let field = |range: std::ops::Range<usize>| padded[range].parse::<u32>().ok();
    let parts = (
        field(0..4),
        field(4..6),
        field(6..8),
        field(8..10),
        field(10..12),
        field(12..14),
    );
    let (Some(y), Some(mo), Some(d), Some(h), Some(mi), Some(sec)) = parts else {
        return Ok(Value::Null);
    };
    let value = ymd_days(y as i32, mo, d)
        .zip(hms_micros(h, mi, sec, 0))
        .map(|(days, micros)| Value::Timestamp(i64::from(days) * MICROS_PER_DAY + micros));
    Ok(value.unwrap_or(Value::Null))
}

/// TIME columns: `[-]h:mm:ss[.ffffff]`, hours not limited to 24.
pub fn parse_time(raw: &[u8]) -> Result<Value> {
    let s = lossy_text(raw);
    let s = s.trim();
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let mut parts = body.split(':');
    let (Some(h), Some(m), Some(sec), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Ok(Value::Null);
    };
    let (sec, frac) = sec.split_once('.').unwrap_or((sec, ""));
    let parsed = (
        h.parse::<i64>().ok(),
        m.parse::<i64>().ok(),
        sec.parse::<i64>().ok(),
        frac_micros(frac),
    );
    let (Some(h), Some(m), Some(sec), Some(frac)) = parsed else {
        return Ok(Value::Null);
    };
    if h < 0 || !(0..60).contains(&m) || !(0..60).contains(&sec) {
        return Ok(Value::Null);
    }
    let micros = h
        .checked_mul(3600)
        .and_then(|s| s.checked_add(m * 60 + sec))
        .and_then(|s| s.checked_mul(1_000_000))
        .and_then(|us| us.checked_add(frac));
    Ok(micros.map_or(Value::Null, |us| {
        Value::Time(if negative { -us } else { us })
    }))
}

pub(crate) const MICROS_PER_DAY: i64 = 86_400_000_000;

/// Days from 0000-01-01 to 1970-01-01.
const EPOCH_DAYS: i32 = 719_528;

/// Days from 0000-01-01 to 10000-01-01, the end of the DATE range.
const END_DAYS: i32 = 3_652_425;

fn date_days(s: &str) -> Option<i32> {
    let mut parts = s.splitn(3, '-');
    let y = parts.next()?.parse::<i32>().ok()?;
    let m = parts.next()?.parse::<u32>().ok()?;
    let d = parts.next()?.parse::<u32>().ok()?;
    ymd_days(y, m, d)
}

fn clock_micros(s: &str) -> Option<i64> {
    let (hms, frac) = s.split_once('.').unwrap_or((s, ""));
    let mut parts = hms.splitn(3, ':');
    let h = parts.next()?.parse::<u32>().ok()?;
    let m = parts.next()?.parse::<u32>().ok()?;
    let sec = parts.next()?.parse::<u32>().ok()?;
    hms_micros(h, m, sec, frac_micros(frac)?)
}

fn hms_micros(h: u32, m: u32, s: u32, frac: i64) -> Option<i64> {
    if h >= 24 || m >= 60 || s >= 60 {
        return None;
    }
    Some((i64::from(h) * 3600 + i64::from(m) * 60 + i64::from(s)) * 1_000_000 + frac)
}

/// Fractional seconds, right padded to microseconds.
fn frac_micros(frac: &str) -> Option<i64> {
    if frac.is_empty() {
        return Some(0);
    }
    if frac.len() > 6 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    format!("{:0<6}", frac).parse().ok()
}

/// Days since the Unix epoch for a calendar date, if the date exists.
fn ymd_days(year: i32, month: u32, day: u32) -> Option<i32> {
    if !(1..=9999).contains(&year) || !(1..=12).contains(&month) {
        return None;
    }
    if day == 0 || day > days_in_month(year, month) {
        return None;
    }
    let before_month: u32 = (1..month).map(|m| days_in_month(year, m)).sum();
    Some(days_before_year(year) + before_month as i32 + day as i32 - 1 - EPOCH_DAYS)
}

fn days_before_year(year: i32) -> i32 {
    365 * year + (year + 3) / 4 - (year + 99) / 100 + (year + 399) / 400
}

/// Convert total days since year 0 to year/month/day.
fn days_to_ymd(days: i32) -> (i32, u32, u32) {
    let mut remaining = days;
    let mut year = (days / 366).max(0);
    remaining -= days_before_year(year);
    while remaining >= days_in_year(year) {
        remaining -= days_in_year(year);
        year += 1;
    }
    while remaining < 0 {
        year -= 1;
        remaining += days_in_year(year);
    }

    let mut month = 1u32;
    while remaining >= days_in_month(year, month) as i32 {
        remaining -= days_in_month(year, month) as i32;
        month += 1;
    }

    let day = (remaining + 1) as u32;
    (year, month, day)
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

fn days_in_year(year: i32) -> i32 {
    if is_leap_year(year) { 366 } else { 365 }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

/// `YYYY-MM-DD` for days since the Unix epoch. Years outside 0..=9999
/// have no DATE literal.
pub(crate) fn format_date(days: i32) -> Result<String> {
    let total = days
        .checked_add(EPOCH_DAYS)
        .filter(|t| (0..END_DAYS).contains(t))
        .ok_or_else(|| {
            Error::conversion(format!("date {} days from epoch is out of range", days))
        })?;
    let (year, month, day) = days_to_ymd(total);
    Ok(format!("{:04}-{:02}-{:02}", year, month, day))
}

/// `[-]hh:mm:ss[.ffffff]` for a signed duration.
pub(crate) fn format_time(micros: i64) -> String {
    let sign = if micros < 0 { "-" } else { "" };
    let abs = micros.unsigned_abs();
    let total_secs = abs / 1_000_000;
    let frac = abs % 1_000_000;
    let hours = total_secs / 3600;
    let minutes = (total_secs / 60) % 60;
    let seconds = total_secs % 60;
    if frac > 0 {
        format!("{}{:02}:{:02}:{:02}.{:06}", sign, hours, minutes, seconds, frac)
    } else {
        format!("{}{:02}:{:02}:{:02}", sign, hours, minutes, seconds)
    }
}

/// `YYYY-MM-DD hh:mm:ss[.ffffff]` for microseconds since the Unix epoch.
pub(crate) fn format_timestamp(micros: i64) -> Result<String> {
    let days = i32::try_from(micros.div_euclid(MICROS_PER_DAY))
        .map_err(|_| Error::conversion(format!("timestamp {} is out of range", micros)))?;
    let time_of_day = micros.rem_euclid(MICROS_PER_DAY);
    Ok(format!("{} {}", format_date(days)?, format_time(time_of_day)))
}
