//! Post-loss cooldown, measured in event time so data gaps shorten it.

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone)]
pub struct Cooldown {
    duration: Duration,
    last_loss: Option<DateTime<Utc>>,
}

impl Cooldown {
    pub fn from_minutes(minutes: u32) -> Self {
        Self {
            duration: Duration::minutes(i64::from(minutes)),
            last_loss: None,
        }
    }

    pub fn arm(&mut self, timestamp: DateTime<Utc>) {
        self.last_loss = Some(timestamp);
    }

    pub fn is_active(&self, timestamp: DateTime<Utc>) -> bool {
        self.last_loss
            .is_some_and(|loss| timestamp < loss + self.duration)
    }

    pub fn last_loss(&self) -> Option<DateTime<Utc>> {
        self.last_loss
    }
}
