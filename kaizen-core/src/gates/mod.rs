//! Gate evaluator: decides whether new entries are currently permitted.
//!
//! Three market gates (expansion regime, post-loss cooldown, session window),
//! each independently togglable. The liquidity-usage gate lives with the
//! structure it guards (see `structure`).

pub mod cooldown;
pub mod expansion;
pub mod session;

pub use cooldown::Cooldown;
pub use expansion::ExpansionRegime;
pub use session::SessionWindow;

use crate::config::{GateToggles, TwinConfig};
use crate::domain::Bar;
use crate::indicators::IndicatorSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Receives realized-loss notifications from the execution simulator.
pub trait LossListener {
    fn record_loss(&mut self, timestamp: DateTime<Utc>);
}

/// Raw state of each gate at one bar, independent of the toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateStatus {
    pub expansion_active: bool,
    pub cooldown_active: bool,
    pub in_session: bool,
}

/// Owns the regime and cooldown timers for one simulation run.
#[derive(Debug, Clone)]
pub struct GateEvaluator {
    toggles: GateToggles,
    expansion: ExpansionRegime,
    cooldown: Cooldown,
    session: SessionWindow,
}

impl GateEvaluator {
    pub fn new(config: &TwinConfig) -> Self {
        Self {
            toggles: config.gates,
            expansion: ExpansionRegime::new(
                config.expansion_mult,
                config.expansion_bars,
                config.expansion_floor(),
            ),
            cooldown: Cooldown::from_minutes(config.cooldown_minutes),
            session: config.session.clone(),
        }
    }

    /// Feed one bar to the expansion regime. Returns true on an expansion event.
    pub fn observe(&mut self, bar_index: usize, bar: &Bar, snapshot: &IndicatorSnapshot) -> bool {
        self.expansion.observe(bar_index, bar, snapshot)
    }

    pub fn status(&self, timestamp: DateTime<Utc>, bar_index: usize) -> GateStatus {
        GateStatus {
            expansion_active: self.expansion.is_active(bar_index),
            cooldown_active: self.cooldown.is_active(timestamp),
            in_session: self.session.contains(timestamp),
        }
    }

    /// AND of every enabled gate.
    pub fn can_trade(&self, timestamp: DateTime<Utc>, bar_index: usize) -> bool {
        let status = self.status(timestamp, bar_index);
        (!self.toggles.expansion || !status.expansion_active)
            && (!self.toggles.cooldown || !status.cooldown_active)
            && (!self.toggles.session || status.in_session)
    }

    pub fn expansion_active(&self, bar_index: usize) -> bool {
        self.expansion.is_active(bar_index)
    }

    pub fn last_loss(&self) -> Option<DateTime<Utc>> {
        self.cooldown.last_loss()
    }

    pub fn toggles(&self) -> GateToggles {
        self.toggles
    }
}

impl LossListener for GateEvaluator {
    fn record_loss(&mut self, timestamp: DateTime<Utc>) {
        self.cooldown.arm(timestamp);
    }
}
