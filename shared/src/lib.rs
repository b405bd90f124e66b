//! Shared types for the order backbone
//!
//! Domain types used across the workspace: the order snapshot and its status
//! state machine, availability snapshots, validation errors and small utilities.
//! Everything here is pure; no I/O.

pub mod availability;
pub mod error;
pub mod order;
pub mod util;

// Re-exports
pub use availability::{AvailabilityPayload, AvailabilitySnapshot, SyncChannel};
pub use error::{InvalidStatusError, ValidationError};
pub use order::{Order, OrderItem, OrderStatus, can_transition, validate_transition};
pub use serde::{Deserialize, Serialize};
