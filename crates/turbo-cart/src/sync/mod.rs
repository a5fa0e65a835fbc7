//! Keeping the local overlay and the remote cart in step.
//!
//! [`SyncCoordinator`] is the state machine: it never awaits and can be
//! driven by any runtime. [`CartSync`] drives it against a [`CartStore`].
//!
//! [`CartStore`]: crate::store::CartStore

mod coordinator;
mod driver;

pub use coordinator::{
    CommitOutcome, ItemState, PendingChange, ReplaceRequest, SyncCoordinator, SyncNotice, Ticket,
};
pub use driver::{CartSync, FlushSummary};
