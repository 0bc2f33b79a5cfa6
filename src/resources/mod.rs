//! Filesystem state primitives used by the engine: where a destination
//! currently points ([`link`]) and where displaced originals are kept
//! ([`backup`]).
pub mod backup;
pub mod link;

pub use backup::{BackupOutcome, BackupStore, BackupStyle, RestoreOutcome};
pub use link::{LinkState, is_linked};
