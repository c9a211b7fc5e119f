//! On-disk run configuration (TOML).
//!
//! ```toml
//! [strategy]
//! expansion_mult = 1.5
//!
//! [gates]
//! expansion = true
//! cooldown = true
//! session = true
//! usage = true
//! cooldown_minutes = 15
//!
//! [session]
//! timezone = "America/New_York"
//! start = "09:30"
//! end = "16:15"
//!
//! [execution]
//! reward_risk = 2.0
//! point_value = 2.0
//!
//! [null_mode]
//! enabled = false
//! seed = 42
//! ```
//!
//! Every field is optional and defaults to the strict preset.

use kaizen_core::gates::SessionWindow;
use kaizen_core::{GateToggles, TwinConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Content hash identifying a run configuration.
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(#[from] kaizen_core::ConfigError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RunConfig {
    pub strategy: StrategySection,
    pub gates: GatesSection,
    pub session: SessionSection,
    pub execution: ExecutionSection,
    pub null_mode: NullModeSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySection {
    pub pivot_left: usize,
    pub pivot_right: usize,
    pub confirm_bars: usize,
    pub atr_period: usize,
    pub volume_period: usize,
    pub min_history: usize,
    pub expansion_mult: f64,
    pub expansion_bars: usize,
    pub expansion_floor_ticks: f64,
    pub reclaim_tolerance_atr: f64,
    pub stop_buffer_atr: f64,
}

impl Default for StrategySection {
    fn default() -> Self {
        let twin = TwinConfig::default();
        Self {
            pivot_left: twin.pivot_left,
            pivot_right: twin.pivot_right,
            confirm_bars: twin.confirm_bars,
            atr_period: twin.atr_period,
            volume_period: twin.volume_period,
            min_history: twin.min_history,
            expansion_mult: twin.expansion_mult,
            expansion_bars: twin.expansion_bars,
            expansion_floor_ticks: twin.expansion_floor_ticks,
            reclaim_tolerance_atr: twin.reclaim_tolerance_atr,
            stop_buffer_atr: twin.stop_buffer_atr,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatesSection {
    pub expansion: bool,
    pub cooldown: bool,
    pub session: bool,
    pub usage: bool,
    pub cooldown_minutes: u32,
}

impl Default for GatesSection {
    fn default() -> Self {
        Self::from_toggles(GateToggles::strict())
    }
}

impl GatesSection {
    fn from_toggles(toggles: GateToggles) -> Self {
        Self {
            expansion: toggles.expansion,
            cooldown: toggles.cooldown,
            session: toggles.session,
            usage: toggles.usage,
            cooldown_minutes: TwinConfig::default().cooldown_minutes,
        }
    }

    pub fn toggles(&self) -> GateToggles {
        GateToggles {
            expansion: self.expansion,
            cooldown: self.cooldown,
            session: self.session,
            usage: self.usage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// IANA time zone name.
    pub timezone: String,
    /// `HH:MM`, inclusive.
    pub start: String,
    /// `HH:MM`, inclusive.
    pub end: String,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            timezone: "America/New_York".into(),
            start: "09:30".into(),
            end: "16:15".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSection {
    pub reward_risk: f64,
    pub min_tick: f64,
    pub risk_floor_ticks: f64,
    pub point_value: f64,
    /// Starting equity for the drawdown curve.
    pub initial_equity: f64,
}

impl Default for ExecutionSection {
    fn default() -> Self {
        let twin = TwinConfig::default();
        Self {
            reward_risk: twin.reward_risk,
            min_tick: twin.min_tick,
            risk_floor_ticks: twin.risk_floor_ticks,
            point_value: twin.point_value,
            initial_equity: 100_000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NullModeSection {
    pub enabled: bool,
    pub seed: u64,
}

impl Default for NullModeSection {
    fn default() -> Self {
        Self {
            enabled: false,
            seed: 42,
        }
    }
}

impl RunConfig {
    /// Expansion, cooldown and session gates off.
    pub fn sampling() -> Self {
        Self {
            gates: GatesSection::from_toggles(GateToggles::sampling()),
            ..Self::default()
        }
    }

    pub fn strict() -> Self {
        Self::default()
    }

    /// Same configuration with the null (coin-flip direction) mode switched on.
    pub fn as_null(&self, seed: u64) -> Self {
        let mut config = self.clone();
        config.null_mode = NullModeSection {
            enabled: true,
            seed,
        };
        config
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.to_twin_config()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Validated engine configuration.
    pub fn to_twin_config(&self) -> Result<TwinConfig, kaizen_core::ConfigError> {
        let s = &self.strategy;
        let e = &self.execution;
        let session =
            SessionWindow::parse(&self.session.timezone, &self.session.start, &self.session.end)?;
        let config = TwinConfig {
            pivot_left: s.pivot_left,
            pivot_right: s.pivot_right,
            confirm_bars: s.confirm_bars,
            atr_period: s.atr_period,
            volume_period: s.volume_period,
            min_history: s.min_history,
            expansion_mult: s.expansion_mult,
            expansion_bars: s.expansion_bars,
            expansion_floor_ticks: s.expansion_floor_ticks,
            cooldown_minutes: self.gates.cooldown_minutes,
            session,
            reclaim_tolerance_atr: s.reclaim_tolerance_atr,
            stop_buffer_atr: s.stop_buffer_atr,
            reward_risk: e.reward_risk,
            min_tick: e.min_tick,
            risk_floor_ticks: e.risk_floor_ticks,
            point_value: e.point_value,
            gates: self.gates.toggles(),
            null_seed: self.null_mode.enabled.then_some(self.null_mode.seed),
        };
        config.validate()?;
        Ok(config)
    }

    /// Short label used in exports: `SAMPLING`, `STRICT`, `NULL` or `CUSTOM`.
    pub fn mode_label(&self) -> &'static str {
        let toggles = self.gates.toggles();
        if self.null_mode.enabled {
            "NULL"
        } else if toggles == GateToggles::strict() {
            "STRICT"
        } else if toggles == GateToggles::sampling() {
            "SAMPLING"
        } else {
            "CUSTOM"
        }
    }

    /// BLAKE3 hash of the canonical JSON form; equal configs share an id.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
