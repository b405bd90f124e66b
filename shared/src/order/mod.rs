//! Order Module
//!
//! This module provides the order snapshot types and the status state machine:
//! - Types: the order snapshot read from the external order store
//! - Status: forward-only lifecycle with a pure transition validator

pub mod status;
pub mod types;

// Re-exports
pub use status::{OrderStatus, can_transition, can_transition_str, validate_transition};
pub use types::*;
