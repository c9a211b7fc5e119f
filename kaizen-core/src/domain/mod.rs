//! Domain types for the Kaizen twin.

pub mod bar;
pub mod ids;
pub mod position;
pub mod signal;
pub mod trade;

pub use bar::{Bar, BarError};
pub use ids::LevelId;
pub use position::Position;
pub use signal::{Direction, LevelSide, LevelStatus, Signal, SignalContext};
pub use trade::{ClosedTrade, ExitReason};
