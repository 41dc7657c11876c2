//! Progress snapshots and their persistence.

pub mod snapshot;
pub mod store;
