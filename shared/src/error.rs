//! Validation error types
//!
//! Validation failures are rejected synchronously and never retried.

use crate::order::OrderStatus;
use thiserror::Error;

/// An order status value outside the known set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid order status: {0:?}")]
pub struct InvalidStatusError(pub String);

/// Validation error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Status change outside the forward, one-step edges
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Unknown status value
    #[error(transparent)]
    InvalidStatus(#[from] InvalidStatusError),

    /// Malformed order field
    #[error("Invalid field `{field}`: {message}")]
    Field {
        field: &'static str,
        message: String,
    },
}

impl ValidationError {
    pub fn field(field: &'static str, message: impl Into<String>) -> Self {
        Self::Field {
            field,
            message: message.into(),
        }
    }
}

/// Result type for validation
pub type ValidationResult<T> = Result<T, ValidationError>;
