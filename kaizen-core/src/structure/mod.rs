//! Market structure: strict swing pivots with a confirmation delay.
//!
//! At most one provisional and one confirmed level exist per side. Provisional
//! levels die the moment price trades through them; confirmed levels are never
//! invalidated, only superseded by the next confirmation on the same side.

pub mod detector;
pub mod pivot;

pub use detector::StructureDetector;
pub use pivot::PivotLevel;
