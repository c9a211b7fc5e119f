//! Kaizen core: the live-twin replay engine.
//!
//! A strictly causal, bar-by-bar state machine:
//! - incremental indicators (Wilder ATR, volume average)
//! - strict swing pivots with a confirmation delay
//! - expansion, cooldown and session gates plus a one-shot usage gate per level
//! - sweep-and-reclaim signals decided at the close
//! - an execution simulator that fills at the next open
//!
//! Identical bars and configuration always produce identical signals and trades.

pub mod config;
pub mod domain;
pub mod execution;
pub mod gates;
pub mod indicators;
pub mod replay;
pub mod rng;
pub mod signal_generator;
pub mod structure;
pub mod twin;

pub use config::{ConfigError, GateToggles, TwinConfig};
pub use domain::{
    Bar, BarError, ClosedTrade, Direction, ExitReason, LevelId, LevelSide, LevelStatus, Position,
    Signal, SignalContext,
};
pub use replay::{replay, Replay, ReplayError, ReplayResult};
pub use twin::KaizenTwin;
