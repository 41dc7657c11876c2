//! Runtime glue shared by every driver: configuration, hooks, progress
//! tracking, clocks, errors, reporting, and telemetry.

pub mod clock;
pub mod config;
pub mod error;
pub mod hooks;
pub mod progress;
pub mod report;
pub mod telemetry;
