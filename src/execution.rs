//! Execution primitives that partition input into batches and bound how many
//! item futures are alive at once.

pub mod batch;
pub mod gate;
