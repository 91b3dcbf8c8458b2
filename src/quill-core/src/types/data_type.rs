//! Data type definitions for SQL values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Largest precision a decimal can carry.
pub const MAX_DECIMAL_PRECISION: u8 = 38;

/// Default scale of the system decimal type.
pub const SYSTEM_DECIMAL_SCALE: u8 = 18;

/// A named field of a struct type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructField {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl StructField {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

/// Data type of a column or expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Type of the untyped `NULL` literal.
    Null,
    Boolean,
    /// 8-bit signed integer.
    Byte,
    /// 16-bit signed integer.
    Short,
    /// 32-bit signed integer.
    Integer,
    /// 64-bit signed integer.
    Long,
    /// 32-bit floating point.
    Float,
    /// 64-bit floating point.
    Double,
    /// Fixed-point decimal with at most 38 digits.
    Decimal { precision: u8, scale: u8 },
    /// UTF-8 string.
    String,
    Binary,
    /// Days since the Unix epoch.
    Date,
    /// Microseconds since the Unix epoch, interpreted in the session zone.
    Timestamp,
    /// Microseconds since the Unix epoch, without a zone.
    TimestampNtz,
    Array {
        element: Box<DataType>,
        contains_null: bool,
    },
    Struct(Vec<StructField>),
}

/// Non-decimal numeric types, narrowest first.
pub const NUMERIC_PRECEDENCE: [DataType; 6] = [
    DataType::Byte,
    DataType::Short,
    DataType::Integer,
    DataType::Long,
    DataType::Float,
    DataType::Double,
];

impl DataType {
    /// An array type.
    pub fn array(element: Self, contains_null: bool) -> Self {
        Self::Array {
            element: Box::new(element),
            contains_null,
        }
    }

    /// A decimal type, clamped to the maximum precision.
    pub fn bounded_decimal(precision: usize, scale: usize) -> Self {
        let max = MAX_DECIMAL_PRECISION as usize;
        Self::Decimal {
            precision: precision.min(max) as u8,
            scale: scale.min(max) as u8,
        }
    }

    /// The decimal used when a numeric category must be made concrete.
    pub const fn system_default_decimal() -> Self {
        Self::Decimal {
            precision: MAX_DECIMAL_PRECISION,
            scale: SYSTEM_DECIMAL_SCALE,
        }
    }

    /// Integral or fractional, including decimals.
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Byte
                | Self::Short
                | Self::Integer
                | Self::Long
                | Self::Float
                | Self::Double
                | Self::Decimal { .. }
        )
    }

    pub const fn is_integral(&self) -> bool {
        matches!(self, Self::Byte | Self::Short | Self::Integer | Self::Long)
    }

    pub const fn is_floating(&self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }

    pub const fn is_decimal(&self) -> bool {
        matches!(self, Self::Decimal { .. })
    }

    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String)
    }

    /// Date or either timestamp flavour.
    pub const fn is_datetime(&self) -> bool {
        matches!(self, Self::Date | Self::Timestamp | Self::TimestampNtz)
    }

    /// Not a container type.
    pub const fn is_atomic(&self) -> bool {
        !matches!(self, Self::Array { .. } | Self::Struct(_) | Self::Null)
    }

    /// Position in [`NUMERIC_PRECEDENCE`], for non-decimal numerics.
    pub fn numeric_rank(&self) -> Option<usize> {
        NUMERIC_PRECEDENCE.iter().position(|t| t == self)
    }

    /// The smallest decimal able to hold every value of this numeric type.
    pub const fn to_decimal(&self) -> Option<Self> {
        let (precision, scale) = match self {
            Self::Byte => (3, 0),
            Self::Short => (5, 0),
            Self::Integer => (10, 0),
            Self::Long => (20, 0),
            Self::Float => (14, 7),
            Self::Double => (30, 15),
            Self::Decimal { precision, scale } => (*precision, *scale),
            _ => return None,
        };
        Some(Self::Decimal { precision, scale })
    }

    /// Whether this decimal can hold every value of `other` without loss.
    ///
    /// Only decimals and integral types are ever narrower than a decimal.
    pub fn is_wider_than(&self, other: &Self) -> bool {
        let Self::Decimal { precision, scale } = self else {
            return false;
        };
        let other = match other {
            Self::Decimal { .. } => other.clone(),
            t if t.is_integral() => match t.to_decimal() {
                Some(d) => d,
                None => return false,
            },
            _ => return false,
        };
        let Self::Decimal {
            precision: p2,
            scale: s2,
        } = other
        else {
            return false;
        };
        precision.saturating_sub(*scale) >= p2.saturating_sub(s2) && *scale >= s2
    }

    /// Whether values of this type may be `NULL` inside a container, i.e.
    /// `contains_null` of arrays. Atomic types report `false`.
    pub const fn contains_null(&self) -> bool {
        matches!(
            self,
            Self::Array {
                contains_null: true,
                ..
            }
        )
    }

    /// Look up a struct field by name.
    pub fn field(&self, name: &str, case_sensitive: bool) -> Option<(usize, &StructField)> {
        let Self::Struct(fields) = self else {
            return None;
        };
        fields
            .iter()
            .enumerate()
            .find(|(_, f)| field_names_match(&f.name, name, case_sensitive))
    }

    /// SQL name of the type, e.g. `INT` or `ARRAY<BIGINT>`.
    pub fn sql(&self) -> String {
        match self {
            Self::Null => "VOID".to_string(),
            Self::Boolean => "BOOLEAN".to_string(),
            Self::Byte => "TINYINT".to_string(),
            Self::Short => "SMALLINT".to_string(),
            Self::Integer => "INT".to_string(),
            Self::Long => "BIGINT".to_string(),
            Self::Float => "FLOAT".to_string(),
            Self::Double => "DOUBLE".to_string(),
            Self::Decimal { precision, scale } => format!("DECIMAL({precision},{scale})"),
            Self::String => "STRING".to_string(),
            Self::Binary => "BINARY".to_string(),
            Self::Date => "DATE".to_string(),
            Self::Timestamp => "TIMESTAMP".to_string(),
            Self::TimestampNtz => "TIMESTAMP_NTZ".to_string(),
            Self::Array { element, .. } => format!("ARRAY<{}>", element.sql()),
            Self::Struct(fields) => {
                let inner = fields
                    .iter()
                    .map(|f| format!("{}: {}", f.name, f.data_type.sql()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("STRUCT<{inner}>")
            }
        }
    }

    /// Structural equality ignoring `contains_null` and field nullability.
    /// Field names are compared with the session's case sensitivity.
    pub fn same_type(&self, other: &Self, case_sensitive: bool) -> bool {
        match (self, other) {
            (Self::Array { element: a, .. }, Self::Array { element: b, .. }) => {
                a.same_type(b, case_sensitive)
            }
            (Self::Struct(a), Self::Struct(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|(x, y)| {
                        field_names_match(&x.name, &y.name, case_sensitive)
                            && x.data_type.same_type(&y.data_type, case_sensitive)
                    })
            }
            _ => self == other,
        }
    }
}

/// Whether two struct field names denote the same field.
pub fn field_names_match(a: &str, b: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        a == b
    } else {
        a.eq_ignore_ascii_case(b)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.sql())
    }
}
