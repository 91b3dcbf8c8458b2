//! Abstract data types describe the inputs an expression accepts.
//!
//! An expression declares one `AbstractDataType` per input. Implicit casting
//! picks a concrete target for each argument that does not already match.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::DataType;

/// A concrete type, a category of types, or an ordered set of alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbstractDataType {
    /// Exactly this type. A concrete decimal accepts every decimal.
    Concrete(DataType),
    /// Any type at all; never triggers a cast.
    Any,
    /// Integral, floating or decimal.
    AnyNumeric,
    AnyIntegral,
    AnyDecimal,
    /// Date, timestamp or timestamp without zone.
    AnyDatetime,
    /// Timestamp or timestamp without zone.
    AnyTimestamp,
    /// Array of any element type.
    AnyArray,
    /// First alternative that an input can be cast to wins.
    Collection(Vec<AbstractDataType>),
}

impl AbstractDataType {
    /// Shorthand for a collection.
    pub fn one_of(types: impl IntoIterator<Item = Self>) -> Self {
        Self::Collection(types.into_iter().collect())
    }

    /// The concrete type used when an input must be cast into this category.
    pub fn default_concrete_type(&self) -> DataType {
        match self {
            Self::Concrete(t) => t.clone(),
            Self::Any => DataType::Null,
            Self::AnyNumeric => DataType::Double,
            Self::AnyIntegral => DataType::Long,
            Self::AnyDecimal => DataType::system_default_decimal(),
            Self::AnyDatetime | Self::AnyTimestamp => DataType::Timestamp,
            Self::AnyArray => DataType::array(DataType::Null, true),
            Self::Collection(types) => types
                .first()
                .map_or(DataType::Null, Self::default_concrete_type),
        }
    }

    /// Whether a value of type `other` satisfies this declaration as is.
    ///
    /// Declared struct field names must match exactly.
    pub fn accepts_type(&self, other: &DataType) -> bool {
        match self {
            Self::Concrete(DataType::Decimal { .. }) => other.is_decimal(),
            Self::Concrete(DataType::Array { element, .. }) => match other {
                DataType::Array { element: e, .. } => element.same_type(e, true),
                _ => false,
            },
            Self::Concrete(t) => t == other,
            Self::Any => true,
            Self::AnyNumeric => other.is_numeric(),
            Self::AnyIntegral => other.is_integral(),
            Self::AnyDecimal => other.is_decimal(),
            Self::AnyDatetime => other.is_datetime(),
            Self::AnyTimestamp => matches!(other, DataType::Timestamp | DataType::TimestampNtz),
            Self::AnyArray => matches!(other, DataType::Array { .. }),
            Self::Collection(types) => types.iter().any(|t| t.accepts_type(other)),
        }
    }

    /// Human-readable description for type-check messages.
    pub fn simple_string(&self) -> String {
        match self {
            Self::Concrete(DataType::Decimal { .. }) | Self::AnyDecimal => "\"DECIMAL\"".to_string(),
            Self::Concrete(t) => t.to_string(),
            Self::Any => "\"ANY\"".to_string(),
            Self::AnyNumeric => "\"NUMERIC\"".to_string(),
            Self::AnyIntegral => "\"INTEGRAL\"".to_string(),
            Self::AnyDatetime => "\"DATETIME\"".to_string(),
            Self::AnyTimestamp => "\"TIMESTAMP\"".to_string(),
            Self::AnyArray => "\"ARRAY\"".to_string(),
            Self::Collection(types) => {
                let inner = types
                    .iter()
                    .map(Self::simple_string)
                    .collect::<Vec<_>>()
                    .join(" or ");
                format!("({inner})")
            }
        }
    }
}

impl From<DataType> for AbstractDataType {
    fn from(t: DataType) -> Self {
        Self::Concrete(t)
    }
}

impl fmt::Display for AbstractDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.simple_string())
    }
}
