//! Daily session window in the exchange's local time.

use crate::config::ConfigError;
use chrono::{DateTime, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Inclusive time-of-day window, evaluated at minute resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub tz: Tz,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Default for SessionWindow {
    fn default() -> Self {
        Self {
            tz: chrono_tz::America::New_York,
            start: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(16, 15, 0).unwrap_or_default(),
        }
    }
}

impl SessionWindow {
    /// Build from an IANA zone name and `HH:MM` strings.
    pub fn parse(tz: &str, start: &str, end: &str) -> Result<Self, ConfigError> {
        let tz: Tz = tz
            .parse()
            .map_err(|_| ConfigError::UnknownTimeZone(tz.to_string()))?;
        let window = Self {
            tz,
            start: parse_hhmm(start)?,
            end: parse_hhmm(end)?,
        };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start >= self.end {
            return Err(ConfigError::EmptySession {
                start: self.start.format("%H:%M").to_string(),
                end: self.end.format("%H:%M").to_string(),
            });
        }
        Ok(())
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        let local = timestamp.with_timezone(&self.tz);
        let minute = local.hour() * 60 + local.minute();
        minute_of_day(self.start) <= minute && minute <= minute_of_day(self.end)
    }
}

fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

fn parse_hhmm(s: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|_| ConfigError::InvalidSessionTime(s.to_string()))
}
