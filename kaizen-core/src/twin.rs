//! The live twin: indicators, structure, gates and trigger composed into one
//! bar-close state machine.
//!
//! A run owns exactly one twin. Nothing in here is shared between runs, so
//! parallel sweeps simply build one twin per configuration.

use crate::config::{ConfigError, TwinConfig};
use crate::domain::{Bar, Signal};
use crate::gates::{GateEvaluator, GateStatus, LossListener};
use crate::indicators::{IndicatorSnapshot, IndicatorState};
use crate::rng::DirectionSampler;
use crate::signal_generator::SweepSignalGenerator;
use crate::structure::StructureDetector;
use chrono::{DateTime, Utc};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct KaizenTwin {
    config: TwinConfig,
    indicators: IndicatorState,
    structure: StructureDetector,
    gates: GateEvaluator,
    generator: SweepSignalGenerator,
    sampler: Option<DirectionSampler>,
    snapshot: Option<IndicatorSnapshot>,
    bar_index: Option<usize>,
}

impl KaizenTwin {
    pub fn new(config: TwinConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            indicators: IndicatorState::new(&config),
            structure: StructureDetector::new(&config),
            gates: GateEvaluator::new(&config),
            generator: SweepSignalGenerator::new(&config),
            sampler: config.null_seed.map(DirectionSampler::new),
            snapshot: None,
            bar_index: None,
            config,
        })
    }

    /// Update indicators, structure and the expansion regime with a closed bar.
    ///
    /// Returns the index assigned to the bar.
    pub fn observe(&mut self, bar: &Bar) -> usize {
        self.snapshot = self.indicators.update(bar);
        let bar_index = self.indicators.bar_index().unwrap_or_default();
        self.bar_index = Some(bar_index);

        self.structure.update(bar_index, bar.high, bar.low);
        if let Some(snapshot) = &self.snapshot {
            if self.gates.observe(bar_index, bar, snapshot) {
                debug!(bar_index, range = bar.range(), atr = snapshot.atr, "expansion event");
            }
        }
        bar_index
    }

    /// Evaluate the trigger for the bar last passed to [`observe`](Self::observe).
    ///
    /// Call after the simulator has processed the same bar, so losses realized
    /// on it already hold the cooldown.
    pub fn decide(&mut self, bar: &Bar) -> Option<Signal> {
        let bar_index = self.bar_index?;
        let snapshot = self.snapshot?;
        if !self.gates.can_trade(bar.timestamp, bar_index) {
            return None;
        }
        let is_expansion = self.gates.expansion_active(bar_index);
        let mut signal =
            self.generator
                .evaluate(bar_index, bar, &snapshot, &mut self.structure, is_expansion)?;
        if let Some(sampler) = self.sampler.as_mut() {
            signal.direction = sampler.draw();
        }
        Some(signal)
    }

    /// Observe and decide in one step, for callers without an execution phase.
    pub fn on_bar_close(&mut self, bar: &Bar) -> Option<Signal> {
        self.observe(bar);
        self.decide(bar)
    }

    pub fn config(&self) -> &TwinConfig {
        &self.config
    }

    pub fn snapshot(&self) -> Option<&IndicatorSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn structure(&self) -> &StructureDetector {
        &self.structure
    }

    pub fn gates(&self) -> &GateEvaluator {
        &self.gates
    }

    pub fn gate_status(&self, timestamp: DateTime<Utc>) -> Option<GateStatus> {
        self.bar_index.map(|i| self.gates.status(timestamp, i))
    }

    pub fn bar_index(&self) -> Option<usize> {
        self.bar_index
    }

    pub fn is_null_mode(&self) -> bool {
        self.sampler.is_some()
    }
}

impl LossListener for KaizenTwin {
    fn record_loss(&mut self, timestamp: DateTime<Utc>) {
        self.gates.record_loss(timestamp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateToggles;
    use chrono::{Duration, TimeZone};

    fn flat(i: usize) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 12, 2, 14, 30, 0).unwrap() + Duration::minutes(i as i64),
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.0,
            volume: 100.0,
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let config = TwinConfig {
            pivot_left: 0,
            ..TwinConfig::default()
        };
        assert!(KaizenTwin::new(config).is_err());
    }

    #[test]
    fn indices_advance_per_bar() {
        let mut twin = KaizenTwin::new(TwinConfig::sampling()).unwrap();
        for i in 0..5 {
            assert_eq!(twin.observe(&flat(i)), i);
        }
        assert_eq!(twin.bar_index(), Some(4));
        assert!(twin.snapshot().is_none());
    }

    #[test]
    fn recorded_loss_blocks_with_cooldown_on() {
        let gates = GateToggles {
            cooldown: true,
            ..GateToggles::sampling()
        };
        let mut twin = KaizenTwin::new(TwinConfig::default().with_gates(gates)).unwrap();
        for i in 0..25 {
            twin.on_bar_close(&flat(i));
        }
        let now = flat(24).timestamp;
        twin.record_loss(now);
        let status = twin.gate_status(now).unwrap();
        assert!(status.cooldown_active);
        assert!(!twin.gates().can_trade(now, 24));
        assert!(twin.gates().can_trade(now + Duration::minutes(15), 24));
    }

    #[test]
    fn null_seed_enables_sampler() {
        let twin = KaizenTwin::new(TwinConfig::sampling().with_null_seed(1)).unwrap();
        assert!(twin.is_null_mode());
        assert!(!KaizenTwin::new(TwinConfig::sampling()).unwrap().is_null_mode());
    }
}
