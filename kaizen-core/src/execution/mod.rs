//! Execution simulator: decide at close, fill at the next open.
//!
//! Per bar, in this order:
//! 1. Exit: test the open position's stop, then its target, against the bar range
//! 2. Entry: fill the pending signal at the open, reversing any open position
//! 3. Same-bar exit: re-test the new position against the same bar
//!
//! Stop always wins a tie with target.

pub mod simulator;

pub use simulator::{ExecutionConfig, ExecutionSimulator};
