//! Signatures of resolved scalar functions.

use quill_core::{AbstractDataType, DataType};
use serde::{Deserialize, Serialize};

/// How a function's result type is derived from its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReturnType {
    /// Always this type.
    Fixed(DataType),
    /// The type of the argument at this position.
    SameAsArg(usize),
    /// All arguments share one type, which is also the result type.
    CommonOfArgs,
}

/// Expected inputs and result of a scalar function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionSignature {
    /// Positional argument types.
    pub input_types: Vec<AbstractDataType>,
    /// Type of every argument past `input_types`, for variadic functions.
    pub variadic: Option<AbstractDataType>,
    pub return_type: ReturnType,
    /// Evaluation depends on the session time zone.
    pub time_zone_aware: bool,
    /// Result is `NULL` only when some input is `NULL`.
    pub null_intolerant: bool,
}

impl FunctionSignature {
    /// A fixed-arity signature.
    pub fn exact(input_types: Vec<AbstractDataType>, return_type: ReturnType) -> Self {
        Self {
            input_types,
            variadic: None,
            return_type,
            time_zone_aware: false,
            null_intolerant: true,
        }
    }

    /// A signature accepting any number of arguments of one type.
    pub fn variadic(arg_type: AbstractDataType, return_type: ReturnType) -> Self {
        Self {
            input_types: Vec::new(),
            variadic: Some(arg_type),
            return_type,
            time_zone_aware: false,
            null_intolerant: false,
        }
    }

    pub fn with_time_zone(mut self) -> Self {
        self.time_zone_aware = true;
        self
    }

    /// Expected type of the argument at `index`, if the arity allows one.
    pub fn expected_type(&self, index: usize) -> Option<&AbstractDataType> {
        self.input_types.get(index).or(self.variadic.as_ref())
    }

    /// Whether `n` arguments satisfy the signature's arity.
    pub fn accepts_arity(&self, n: usize) -> bool {
        if self.variadic.is_some() {
            n >= self.input_types.len()
        } else {
            n == self.input_types.len()
        }
    }

    /// Result type given the argument types.
    pub fn result_type(&self, arg_types: &[DataType]) -> DataType {
        match &self.return_type {
            ReturnType::Fixed(t) => t.clone(),
            ReturnType::SameAsArg(i) => arg_types.get(*i).cloned().unwrap_or(DataType::Null),
            ReturnType::CommonOfArgs => arg_types
                .iter()
                .find(|t| **t != DataType::Null)
                .cloned()
                .unwrap_or(DataType::Null),
        }
    }
}
