//! # wetlab Runner
//!
//! Supervises protocol script runs:
//! 1. A script is checked for unbound names before anything executes
//! 2. A fresh session runs it on the blocking pool under a wall-clock timeout
//! 3. On success the execution log is persisted to the configured path
//! 4. On failure or timeout the log is discarded and a single-line
//!    `Kind: message` feedback is returned instead
//!
//! The simulator is synchronous; the runner is the only async layer.

mod runner;

pub use runner::{RunOutcome, RunReport, Runner, RunnerConfig, DEFAULT_TIMEOUT};
