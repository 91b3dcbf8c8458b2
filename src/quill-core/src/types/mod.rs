//! Type system for SQL values.
//!
//! `DataType` is the concrete type of a column or expression, and
//! `AbstractDataType` is what an expression accepts as input. The cast
//! helpers decide which conversions are legal and which need a time zone.

mod abstract_type;
mod cast;
mod data_type;
mod value;

pub use abstract_type::AbstractDataType;
pub use cast::{can_cast, force_nullable, needs_time_zone, resolvable_nullability};
pub use data_type::{
    field_names_match, DataType, StructField, MAX_DECIMAL_PRECISION, NUMERIC_PRECEDENCE,
    SYSTEM_DECIMAL_SCALE,
};
pub use value::Value;
