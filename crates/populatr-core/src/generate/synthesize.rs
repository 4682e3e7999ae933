use chrono::{DateTime, NaiveDateTime};
use fake::faker::boolean::en::Boolean;
use fake::uuid::UUIDv4;
use fake::Fake;
use rand::distr::Alphanumeric;
use rand::Rng;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::dialect::{Dialect, TimestampBounds};
use crate::error::{PopulatrError, Result};
use crate::generate::value::Value;
use crate::schema::types::{ColumnMetadata, DataType};

/// Length used for string columns whose catalog entry has no maximum.
pub const DEFAULT_STRING_LENGTH: u32 = 255;

/// Largest precision representable by `rust_decimal`.
pub const MAX_DECIMAL_PRECISION: u32 = 28;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const BLOB_LEN: usize = 64;

/// Maps a column's declared type to a random, type-valid value.
///
/// Only the dispatch is deterministic; the values come from the caller's rng.
#[derive(Debug, Clone, Copy)]
pub struct ValueSynthesizer {
    dialect: Dialect,
}

impl ValueSynthesizer {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Whether a column's type has a generator.
    pub fn supports(&self, column: &ColumnMetadata) -> bool {
        !matches!(column.data_type, DataType::Unknown(_))
    }

    pub fn synthesize(&self, table: &str, column: &ColumnMetadata, rng: &mut impl Rng) -> Result<Value> {
        let value = match &column.data_type {
            DataType::VarChar => Value::String(random_string(rng, string_length(column))),
            DataType::Char => {
                let width = string_length(column);
                let mut s = random_string(rng, width);
                while s.len() < width as usize {
                    s.push(' ');
                }
                Value::String(s)
            }
            DataType::Boolean => Value::Bool(Boolean(50).fake_with_rng(rng)),
            DataType::SmallInt | DataType::Integer | DataType::BigInt => {
                Value::Int(random_abs_int(rng, column.numeric_precision))
            }
            DataType::Numeric => random_numeric(
                rng,
                column.numeric_precision.unwrap_or(0),
                column.numeric_scale.unwrap_or(0),
            ),
            DataType::Timestamp => Value::Timestamp(random_instant(rng, self.bounds_for(column))),
            DataType::Date => Value::Date(random_instant(rng, self.bounds_for(column)).date()),
            DataType::Uuid => {
                let uuid: Uuid = UUIDv4.fake_with_rng(rng);
                Value::Uuid(uuid)
            }
            DataType::Binary => {
                let mut bytes = Vec::with_capacity(BLOB_LEN);
                bytes.extend_from_slice(&PNG_SIGNATURE);
                bytes.extend((PNG_SIGNATURE.len()..BLOB_LEN).map(|_| rng.random::<u8>()));
                Value::Blob(bytes)
            }
            DataType::Unknown(type_name) => {
                if column.nullable {
                    Value::Null
                } else {
                    return Err(PopulatrError::UnsupportedType {
                        type_name: type_name.clone(),
                        table: table.to_string(),
                        column: column.name.clone(),
                    });
                }
            }
        };
        Ok(value)
    }

    fn bounds_for(&self, column: &ColumnMetadata) -> TimestampBounds {
        // MySQL TIMESTAMP is a 32-bit epoch, much narrower than DATETIME.
        if self.dialect == Dialect::MySQL && column.raw_type.to_lowercase().starts_with("timestamp") {
            return mysql_epoch_bounds();
        }
        self.dialect.timestamp_bounds()
    }
}

fn mysql_epoch_bounds() -> TimestampBounds {
    let start = DateTime::from_timestamp(86_400, 0).map(|dt| dt.naive_utc());
    let end = DateTime::from_timestamp(i64::from(i32::MAX) - 86_400, 0).map(|dt| dt.naive_utc());
    match (start, end) {
        (Some(start), Some(end)) => TimestampBounds { start, end },
        _ => Dialect::MySQL.timestamp_bounds(),
    }
}

fn string_length(column: &ColumnMetadata) -> u32 {
    column.max_length.filter(|&n| n > 0).unwrap_or(DEFAULT_STRING_LENGTH)
}

/// Alphanumeric string with length uniform in `[1, max_length]`.
fn random_string(rng: &mut impl Rng, max_length: u32) -> String {
    let len = rng.random_range(1..=max_length.max(1)) as usize;
    (0..len).map(|_| rng.sample(Alphanumeric) as char).collect()
}

/// Random integer of the column's bit width, made non-negative.
///
/// `MIN.abs()` overflows, so it saturates to the width's `MAX`.
fn random_abs_int(rng: &mut impl Rng, precision: Option<u32>) -> i64 {
    match precision {
        Some(16) => i64::from(rng.random::<i16>().checked_abs().unwrap_or(i16::MAX)),
        Some(32) => i64::from(rng.random::<i32>().checked_abs().unwrap_or(i32::MAX)),
        Some(64) => rng.random::<i64>().checked_abs().unwrap_or(i64::MAX),
        _ => i64::from(rng.random::<i8>().checked_abs().unwrap_or(i8::MAX)),
    }
}

/// `precision - scale` integer digits (leading digit non-zero) followed by
/// `scale` fractional digits. No integer digits means a pure fraction.
fn random_numeric(rng: &mut impl Rng, precision: u32, scale: u32) -> Value {
    if precision == 0 {
        return Value::Null;
    }
    let precision = precision.min(MAX_DECIMAL_PRECISION);
    let scale = scale.min(precision);
    let integer_digits = precision - scale;

    let mut mantissa: i128 = 0;
    for i in 0..integer_digits {
        let digit = if i == 0 { rng.random_range(1..=9) } else { rng.random_range(0..=9) };
        mantissa = mantissa * 10 + digit;
    }
    for _ in 0..scale {
        mantissa = mantissa * 10 + rng.random_range(0..=9);
    }

    match Decimal::try_from_i128_with_scale(mantissa, scale) {
        Ok(d) => Value::Decimal(d),
        Err(_) => Value::Null,
    }
}

/// Uniform instant, whole seconds, within `bounds`.
fn random_instant(rng: &mut impl Rng, bounds: TimestampBounds) -> NaiveDateTime {
    let start = bounds.start.and_utc().timestamp();
    let end = bounds.end.and_utc().timestamp();
    let secs = rng.random_range(start..=end);
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.naive_utc())
        .unwrap_or(bounds.start)
}
