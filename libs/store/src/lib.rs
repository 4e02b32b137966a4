//! # fleetcal-store
//!
//! Interface to the remote scheduling store.
//!
//! The store keeps flat scheduled actions addressed by name: each action sets
//! min/max/desired capacity of one capacity group at one point in time. It has
//! no grouping, ordering or transactions.
//!
//! - [`ScheduleStore`] is the trait every backend implements
//! - [`HttpScheduleStore`] talks to the store's JSON API
//! - [`StoreError`] distinguishes remote conditions by symbolic [`ErrorCode`]
//!
//! Every call completes before the next one is issued; callers never run store
//! operations concurrently.

mod action;
mod error;
mod http;

pub use action::*;
pub use error::{ErrorCode, StoreError};
pub use http::{HttpScheduleStore, StoreConfig};

use async_trait::async_trait;

/// Default number of actions fetched by a listing.
pub const DEFAULT_MAX_RECORDS: usize = 100;

/// Remote scheduled-action store.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Creates an action. Re-using an existing identifier fails with
    /// [`ErrorCode::AlreadyExists`].
    async fn create(&self, action: &ScheduledAction) -> Result<(), StoreError>;

    /// Deletes the action with `identifier`.
    async fn delete(&self, identifier: &str) -> Result<(), StoreError>;

    /// Lists up to `max_records` actions in no particular order.
    async fn list(&self, max_records: usize) -> Result<Vec<ScheduledAction>, StoreError>;
}
