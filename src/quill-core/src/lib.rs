//! Core data model for Quill.
//!
//! This crate provides the value-level building blocks shared by the plan
//! and analysis crates:
//! - `DataType`, `AbstractDataType` and `Value` for the type system
//! - cast legality (`can_cast`, `needs_time_zone`, `force_nullable`)
//! - `ExprId` allocation for resolved attributes

pub mod expr_id;
pub mod types;

mod proptest_utils;

// Re-export commonly used types
pub use expr_id::ExprId;
pub use types::{
    can_cast, force_nullable, needs_time_zone, AbstractDataType, DataType, StructField, Value,
};
