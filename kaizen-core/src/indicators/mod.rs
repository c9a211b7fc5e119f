//! Incrementally maintained indicator state.
//!
//! Everything here is updated exactly once per bar, in bar order, and never
//! rolled back. No value at bar t depends on bar t+1.

pub mod atr;
pub mod ring;
pub mod state;

pub use atr::{true_range, WilderAtr};
pub use ring::RingBuffer;
pub use state::{BarSample, IndicatorSnapshot, IndicatorState};

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}
