use crate::config::TwinConfig;
use crate::domain::{Bar, ClosedTrade, ExitReason, Position, Signal};
use crate::gates::LossListener;
use tracing::{debug, warn};

/// Sizing constants of the simulator, lifted from [`TwinConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionConfig {
    pub reward_risk: f64,
    /// Minimum risk distance in price units.
    pub risk_floor: f64,
    pub point_value: f64,
}

impl From<&TwinConfig> for ExecutionConfig {
    fn from(config: &TwinConfig) -> Self {
        Self {
            reward_risk: config.reward_risk,
            risk_floor: config.risk_floor(),
            point_value: config.point_value,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionSimulator {
    config: ExecutionConfig,
    pending: Option<Signal>,
    position: Option<Position>,
    trades: Vec<ClosedTrade>,
    discarded: usize,
}

impl ExecutionSimulator {
    pub fn new(config: ExecutionConfig) -> Self {
        Self {
            config,
            pending: None,
            position: None,
            trades: Vec::new(),
            discarded: 0,
        }
    }

    /// Queue a signal for the next bar's open. Replaces any unconsumed signal.
    pub fn queue(&mut self, signal: Signal) {
        if let Some(stale) = self.pending.replace(signal) {
            self.discarded += 1;
            warn!(bar_index = stale.bar_index, "pending signal discarded before fill");
        }
    }

    /// Run the exit, entry and same-bar phases for one bar.
    ///
    /// Returns the trades closed on this bar. Every stop and every losing
    /// reversal is reported to `losses` with this bar's timestamp.
    pub fn on_bar(
        &mut self,
        bar_index: usize,
        bar: &Bar,
        losses: &mut dyn LossListener,
    ) -> &[ClosedTrade] {
        let first_new = self.trades.len();

        if let Some(position) = self.position.take() {
            match self.exit_for(&position, bar, false) {
                Some((reason, price)) => self.close(position, bar_index, bar, reason, price, losses),
                None => self.position = Some(position),
            }
        }

        if let Some(signal) = self.pending.take() {
            let fill = bar.open;
            if let Some(open) = self.position.take() {
                self.close(open, bar_index, bar, ExitReason::Reversal, fill, losses);
            }

            let position = self.open(&signal, bar_index, bar);
            debug!(
                bar_index,
                direction = %position.direction,
                entry = position.entry_price,
                stop = position.stop,
                target = position.target,
                "position opened"
            );
            match self.exit_for(&position, bar, true) {
                Some((reason, price)) => self.close(position, bar_index, bar, reason, price, losses),
                None => self.position = Some(position),
            }
        }

        &self.trades[first_new..]
    }

    /// Size a position from a signal filled at `bar.open`.
    ///
    /// Risk is the distance to the signal's stop, floored. A signal whose
    /// direction was flipped by null mode keeps the same risk on the other side.
    fn open(&self, signal: &Signal, bar_index: usize, bar: &Bar) -> Position {
        let fill = bar.open;
        let risk = (fill - signal.stop).abs().max(self.config.risk_floor);
        let sign = signal.direction.sign();
        let stop = if signal.is_randomized() {
            fill - sign * risk
        } else {
            signal.stop
        };
        Position {
            direction: signal.direction,
            entry_bar: bar_index,
            entry_time: bar.timestamp,
            entry_price: fill,
            stop,
            target: fill + sign * risk * self.config.reward_risk,
            context: signal.context.clone(),
        }
    }

    fn exit_for(&self, position: &Position, bar: &Bar, same_bar: bool) -> Option<(ExitReason, f64)> {
        if position.stop_touched(bar.high, bar.low) {
            let reason = if same_bar { ExitReason::StopSameBar } else { ExitReason::Stop };
            Some((reason, position.stop))
        } else if position.target_touched(bar.high, bar.low) {
            let reason = if same_bar { ExitReason::TargetSameBar } else { ExitReason::Target };
            Some((reason, position.target))
        } else {
            None
        }
    }

    fn close(
        &mut self,
        position: Position,
        bar_index: usize,
        bar: &Bar,
        reason: ExitReason,
        exit_price: f64,
        losses: &mut dyn LossListener,
    ) {
        let pnl = position.pnl_at(exit_price, self.config.point_value);
        if reason.is_stop() || (reason == ExitReason::Reversal && pnl < 0.0) {
            losses.record_loss(bar.timestamp);
        }
        debug!(bar_index, %reason, exit_price, pnl, "position closed");
        self.trades.push(ClosedTrade {
            exit_time: bar.timestamp,
            pnl,
            reason,
            direction: position.direction,
            entry_bar: position.entry_bar,
            entry_time: position.entry_time,
            entry_price: position.entry_price,
            exit_bar: bar_index,
            exit_price,
            stop: position.stop,
            target: position.target,
            context: position.context,
        });
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn pending(&self) -> Option<&Signal> {
        self.pending.as_ref()
    }

    pub fn trades(&self) -> &[ClosedTrade] {
        &self.trades
    }

    /// Signals replaced before they could fill.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Consume the simulator, returning the trade log and any position still open.
    pub fn finish(self) -> (Vec<ClosedTrade>, Option<Position>) {
        (self.trades, self.position)
    }
}
