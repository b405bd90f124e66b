//! Orders Module
//!
//! - Store: persistence boundary for order snapshots
//! - Workflow: validated status changes and the tickets they trigger

pub mod store;
pub mod workflow;

pub use store::{InMemoryOrderStore, OrderStore, StoreError, StoreResult};
pub use workflow::{OrderWorkflow, StatusChange};
