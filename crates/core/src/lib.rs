//! backsync-core: one-way, confirm-before-apply tree sync
//!
//! Lists an input and an output tree, works out which files to copy (new, or
//! modification time outside the tolerance) and which to delete (gone from
//! the input), hands that plan to a confirmer, then applies it.

pub mod apply;
pub mod config;
pub mod display;
pub mod event;
pub mod marker;
pub mod plan;
pub mod reconcile;
pub mod scan;
pub mod sync;

pub use apply::{Applier, ApplyReport, Failure};
pub use config::{ConfigFile, DeletePolicy, SyncConfig};
pub use event::{Observer, Phase, SyncEvent, TracingObserver};
pub use marker::LAST_SYNC_FILE;
pub use plan::{Confirm, SyncPlan};
pub use reconcile::{FsTimestamps, Reconciler, Timestamps};
pub use scan::{Listing, Scanner};
pub use sync::{RunOutcome, Synchronizer};
