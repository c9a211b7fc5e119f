//! Twin configuration: every tunable and gate toggle, validated at startup.

use crate::gates::SessionWindow;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration misuse, rejected before any bar is processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be at least 1")]
    ZeroCount { field: &'static str },
    #[error("{field} must be finite and > 0, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("{field} must be finite and >= 0, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("session start {start} must be before session end {end}")]
    EmptySession { start: String, end: String },
    #[error("unknown time zone '{0}'")]
    UnknownTimeZone(String),
    #[error("invalid session time '{0}' (expected HH:MM)")]
    InvalidSessionTime(String),
}

/// Independently togglable gates, for ablation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateToggles {
    /// Suppress entries while an expansion regime is active.
    pub expansion: bool,
    /// Suppress entries for a fixed time after a realized loss.
    pub cooldown: bool,
    /// Only trade inside the daily session window.
    pub session: bool,
    /// A structural level may produce at most one signal.
    pub usage: bool,
}

impl GateToggles {
    /// Expansion, cooldown and session gates off. Usage stays on.
    pub fn sampling() -> Self {
        Self {
            expansion: false,
            cooldown: false,
            session: false,
            usage: true,
        }
    }

    pub fn strict() -> Self {
        Self {
            expansion: true,
            cooldown: true,
            session: true,
            usage: true,
        }
    }
}

/// Full configuration of one twin instance plus its execution simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwinConfig {
    // ── Structure ──
    pub pivot_left: usize,
    pub pivot_right: usize,
    /// Bars from origin before a provisional pivot is confirmed.
    pub confirm_bars: usize,

    // ── Indicators ──
    pub atr_period: usize,
    pub volume_period: usize,
    /// Buffered bars required before indicator output is available.
    pub min_history: usize,

    // ── Expansion regime ──
    pub expansion_mult: f64,
    pub expansion_bars: usize,
    /// Minimum smoothed true range, in ticks, for an expansion event.
    pub expansion_floor_ticks: f64,

    // ── Cooldown / session ──
    pub cooldown_minutes: u32,
    pub session: SessionWindow,

    // ── Triggers ──
    /// Close must come back within this many ATRs of the level.
    pub reclaim_tolerance_atr: f64,
    /// Stop distance beyond the level, in ATRs.
    pub stop_buffer_atr: f64,

    // ── Execution ──
    pub reward_risk: f64,
    pub min_tick: f64,
    /// Minimum risk distance, in ticks.
    pub risk_floor_ticks: f64,
    /// Currency per point of price movement.
    pub point_value: f64,

    pub gates: GateToggles,
    /// Seed for null (random-direction) mode; `None` trades the structural direction.
    pub null_seed: Option<u64>,
}

impl Default for TwinConfig {
    fn default() -> Self {
        Self {
            pivot_left: 5,
            pivot_right: 5,
            confirm_bars: 15,
            atr_period: 14,
            volume_period: 20,
            min_history: 20,
            expansion_mult: 1.5,
            expansion_bars: 10,
            expansion_floor_ticks: 10.0,
            cooldown_minutes: 15,
            session: SessionWindow::default(),
            reclaim_tolerance_atr: 0.05,
            stop_buffer_atr: 0.25,
            reward_risk: 2.0,
            min_tick: 0.25,
            risk_floor_ticks: 5.0,
            point_value: 2.0,
            gates: GateToggles::strict(),
            null_seed: None,
        }
    }
}

impl TwinConfig {
    pub fn sampling() -> Self {
        Self {
            gates: GateToggles::sampling(),
            ..Self::default()
        }
    }

    pub fn strict() -> Self {
        Self::default()
    }

    pub fn with_gates(mut self, gates: GateToggles) -> Self {
        self.gates = gates;
        self
    }

    pub fn with_expansion_mult(mut self, mult: f64) -> Self {
        self.expansion_mult = mult;
        self
    }

    pub fn with_null_seed(mut self, seed: u64) -> Self {
        self.null_seed = Some(seed);
        self
    }

    /// Minimum risk distance in price units.
    pub fn risk_floor(&self) -> f64 {
        self.min_tick * self.risk_floor_ticks
    }

    /// Minimum smoothed true range for an expansion event, in price units.
    pub fn expansion_floor(&self) -> f64 {
        self.min_tick * self.expansion_floor_ticks
    }

    /// Ring buffer capacity: enough for the pivot window and the volume average.
    pub fn buffer_capacity(&self) -> usize {
        let pivot_window = self.pivot_left + self.pivot_right + 1;
        pivot_window.max(self.volume_period).max(self.min_history) + 10
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("pivot_left", self.pivot_left),
            ("pivot_right", self.pivot_right),
            ("confirm_bars", self.confirm_bars),
            ("atr_period", self.atr_period),
            ("volume_period", self.volume_period),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroCount { field });
            }
        }
        for (field, value) in [
            ("expansion_mult", self.expansion_mult),
            ("reward_risk", self.reward_risk),
            ("min_tick", self.min_tick),
            ("risk_floor_ticks", self.risk_floor_ticks),
            ("point_value", self.point_value),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        for (field, value) in [
            ("expansion_floor_ticks", self.expansion_floor_ticks),
            ("reclaim_tolerance_atr", self.reclaim_tolerance_atr),
            ("stop_buffer_atr", self.stop_buffer_atr),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Negative { field, value });
            }
        }
        self.session.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(TwinConfig::default().validate().is_ok());
        assert!(TwinConfig::sampling().validate().is_ok());
    }

    #[test]
    fn presets_differ_only_in_gates() {
        let sampling = TwinConfig::sampling();
        let strict = TwinConfig::strict();
        assert_eq!(sampling.gates, GateToggles::sampling());
        assert_eq!(strict.gates, GateToggles::strict());
        assert_eq!(sampling.with_gates(GateToggles::strict()), strict);
    }

    #[test]
    fn zero_confirmation_age_rejected() {
        let config = TwinConfig {
            confirm_bars: 0,
            ..TwinConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroCount {
                field: "confirm_bars"
            })
        );
    }

    #[test]
    fn non_positive_multiplier_rejected() {
        let config = TwinConfig::default().with_expansion_mult(0.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive {
                field: "expansion_mult",
                ..
            })
        ));
    }

    #[test]
    fn nan_tick_rejected() {
        let config = TwinConfig {
            min_tick: f64::NAN,
            ..TwinConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn derived_prices() {
        let config = TwinConfig::default();
        assert_eq!(config.risk_floor(), 1.25);
        assert_eq!(config.expansion_floor(), 2.5);
        assert_eq!(config.buffer_capacity(), 30);
    }
}
