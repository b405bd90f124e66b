//! Availability Sync Module
//!
//! Keeps product and ingredient availability current from two channels:
//! - Push: change signals from the store backend
//! - Pull: authoritative snapshots, on demand and as a polling fallback

pub mod error;
pub mod source;
pub mod synchronizer;

pub use error::{SyncError, SyncResult};
pub use source::{
    BroadcastPushSource, ChangeSignal, HttpSnapshotSource, PushSource, PushSubscription,
    SnapshotSource,
};
pub use synchronizer::{AvailabilitySynchronizer, SyncConfig, SyncState, UpdateCallback};
