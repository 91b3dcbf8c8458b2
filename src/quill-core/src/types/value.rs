//! Literal values.

use serde::{Deserialize, Serialize};

use super::DataType;

/// A literal value as it appears in a query plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// Unscaled value with its precision and scale.
    Decimal {
        unscaled: i64,
        precision: u8,
        scale: u8,
    },
    String(String),
    Binary(Vec<u8>),
    /// Days since the Unix epoch.
    Date(i32),
    /// Microseconds since the Unix epoch.
    Timestamp(i64),
    /// Microseconds since the Unix epoch, without a zone.
    TimestampNtz(i64),
    Array(Vec<Value>),
}

// Floats compare bitwise so that every literal equals itself.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Byte(a), Self::Byte(b)) => a == b,
            (Self::Short(a), Self::Short(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (
                Self::Decimal {
                    unscaled: a,
                    precision: p1,
                    scale: s1,
                },
                Self::Decimal {
                    unscaled: b,
                    precision: p2,
                    scale: s2,
                },
            ) => a == b && p1 == p2 && s1 == s2,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Binary(a), Self::Binary(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Timestamp(a), Self::Timestamp(b))
            | (Self::TimestampNtz(a), Self::TimestampNtz(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The type a literal of this value gets when none is given.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Null => DataType::Null,
            Self::Boolean(_) => DataType::Boolean,
            Self::Byte(_) => DataType::Byte,
            Self::Short(_) => DataType::Short,
            Self::Integer(_) => DataType::Integer,
            Self::Long(_) => DataType::Long,
            Self::Float(_) => DataType::Float,
            Self::Double(_) => DataType::Double,
            Self::Decimal {
                precision, scale, ..
            } => DataType::Decimal {
                precision: *precision,
                scale: *scale,
            },
            Self::String(_) => DataType::String,
            Self::Binary(_) => DataType::Binary,
            Self::Date(_) => DataType::Date,
            Self::Timestamp(_) => DataType::Timestamp,
            Self::TimestampNtz(_) => DataType::TimestampNtz,
            Self::Array(values) => {
                let element = values
                    .iter()
                    .find(|v| !v.is_null())
                    .map_or(DataType::Null, Self::data_type);
                DataType::array(element, values.iter().any(Self::is_null))
            }
        }
    }

    /// SQL text of the literal.
    pub fn sql(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Boolean(b) => b.to_string().to_uppercase(),
            Self::Byte(v) => format!("{v}Y"),
            Self::Short(v) => format!("{v}S"),
            Self::Integer(v) => v.to_string(),
            Self::Long(v) => format!("{v}L"),
            Self::Float(v) => format_float(f64::from(*v)),
            Self::Double(v) => format_float(*v),
            Self::Decimal {
                unscaled, scale, ..
            } => format_decimal(*unscaled, *scale),
            Self::String(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            Self::Binary(bytes) => {
                let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
                format!("X'{hex}'")
            }
            Self::Date(days) => format!("DATE '{}'", format_date(i64::from(*days))),
            Self::Timestamp(micros) => format!("TIMESTAMP '{}'", format_timestamp(*micros)),
            Self::TimestampNtz(micros) => {
                format!("TIMESTAMP_NTZ '{}'", format_timestamp(*micros))
            }
            Self::Array(values) => {
                let inner = values.iter().map(Self::sql).collect::<Vec<_>>().join(", ");
                format!("ARRAY({inner})")
            }
        }
    }
}

fn format_float(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        let text = if v > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{v:.1}")
    } else {
        v.to_string()
    }
}

fn format_decimal(unscaled: i64, scale: u8) -> String {
    if scale == 0 {
        return unscaled.to_string();
    }
    let sign = if unscaled < 0 { "-" } else { "" };
    let digits = unscaled.unsigned_abs().to_string();
    let scale = scale as usize;
    let padded = format!("{digits:0>width$}", width = scale + 1);
    let (int_part, frac_part) = padded.split_at(padded.len() - scale);
    format!("{sign}{int_part}.{frac_part}")
}

/// Civil date from days since the epoch.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

fn format_date(days: i64) -> String {
    let (y, m, d) = civil_from_days(days);
    format!("{y:04}-{m:02}-{d:02}")
}

fn format_timestamp(micros: i64) -> String {
    let days = micros.div_euclid(86_400_000_000);
    let rem = micros.rem_euclid(86_400_000_000);
    let secs = rem / 1_000_000;
    let frac = rem % 1_000_000;
    let base = format!(
        "{} {:02}:{:02}:{:02}",
        format_date(days),
        secs / 3600,
        (secs / 60) % 60,
        secs % 60
    );
    if frac == 0 {
        base
    } else {
        let frac = format!("{frac:06}");
        format!("{base}.{}", frac.trim_end_matches('0'))
    }
}
