use crate::domain::{LevelId, LevelSide, LevelStatus};
use serde::{Deserialize, Serialize};

/// A swing level tracked by the structure detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotLevel {
    pub id: LevelId,
    pub side: LevelSide,
    pub price: f64,
    pub status: LevelStatus,
    /// Set once the level has produced a signal.
    pub used: bool,
    /// Bars whose range traded through the level, including the current one.
    pub sweeps: u32,
    pub confirmed_at: Option<usize>,
}

impl PivotLevel {
    pub fn provisional(side: LevelSide, origin: usize, price: f64) -> Self {
        Self {
            id: LevelId(origin),
            side,
            price,
            status: LevelStatus::Provisional,
            used: false,
            sweeps: 0,
            confirmed_at: None,
        }
    }

    /// Bars elapsed since the pivot bar.
    pub fn age(&self, bar_index: usize) -> usize {
        bar_index.saturating_sub(self.id.origin())
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == LevelStatus::Confirmed
    }

    /// Strictly beyond the level: above a high, below a low.
    pub fn is_breached_by(&self, high: f64, low: f64) -> bool {
        match self.side {
            LevelSide::High => high > self.price,
            LevelSide::Low => low < self.price,
        }
    }

    pub(crate) fn confirm(&mut self, bar_index: usize) {
        self.status = LevelStatus::Confirmed;
        self.confirmed_at = Some(bar_index);
    }
}

/// Strict pivot test: `candidate` must beat every neighbor, ties disqualify.
pub fn is_strict_pivot(side: LevelSide, candidate: f64, neighbors: impl IntoIterator<Item = f64>) -> bool {
    let mut neighbors = neighbors.into_iter();
    match side {
        LevelSide::High => neighbors.all(|n| n < candidate),
        LevelSide::Low => neighbors.all(|n| n > candidate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_are_not_pivots() {
        assert!(is_strict_pivot(LevelSide::High, 10.0, [9.0, 9.5, 8.0]));
        assert!(!is_strict_pivot(LevelSide::High, 10.0, [9.0, 10.0, 8.0]));
        assert!(is_strict_pivot(LevelSide::Low, 5.0, [6.0, 5.5]));
        assert!(!is_strict_pivot(LevelSide::Low, 5.0, [6.0, 5.0]));
    }

    #[test]
    fn breach_is_strict() {
        let high = PivotLevel::provisional(LevelSide::High, 3, 101.0);
        assert!(!high.is_breached_by(101.0, 99.0));
        assert!(high.is_breached_by(101.25, 99.0));

        let low = PivotLevel::provisional(LevelSide::Low, 3, 99.0);
        assert!(!low.is_breached_by(101.0, 99.0));
        assert!(low.is_breached_by(101.0, 98.75));
    }

    #[test]
    fn age_counts_from_origin() {
        let mut level = PivotLevel::provisional(LevelSide::Low, 10, 97.0);
        assert_eq!(level.age(25), 15);
        level.confirm(25);
        assert!(level.is_confirmed());
        assert_eq!(level.confirmed_at, Some(25));
    }
}
