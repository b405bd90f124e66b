//! Receipt Printing Module
//!
//! This module turns order snapshots into paper:
//! - Renderer: fixed-width kitchen and courier receipts
//! - Queue: serial FIFO dispatch with bounded retries
//! - Transport: the printer behind the queue

pub mod queue;
pub mod renderer;
pub mod transport;
pub mod types;

pub use queue::{PrintDispatchError, PrintDispatchQueue, QueueConfig, QueueError};
pub use renderer::{ReceiptConfig, ReceiptFormatter};
pub use transport::{NetworkTransport, PrintTransport};
pub use types::*;
