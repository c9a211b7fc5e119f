use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a structural level: the bar index the pivot originated on.
///
/// Origin indices are unique per side because each bar is tested as a pivot
/// candidate exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LevelId(pub usize);

impl LevelId {
    pub fn origin(&self) -> usize {
        self.0
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
