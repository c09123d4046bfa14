use chrono::{DateTime, Datelike, Utc, Weekday};
use chrono_tz::Tz;
use thiserror::Error;

/// Error raised when the civil timezone cannot be resolved.
///
/// This is fatal at construction time: a scheduler without a civil zone
/// would fire every job at the wrong wall-clock time.
#[derive(Debug, Error)]
pub enum ClockError {
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),
}

/// The single time authority for the scheduler.
///
/// Resolves "now" in a civil timezone fixed at construction (typically
/// `America/New_York`) and classifies weekends in that zone. No other
/// component consults the system clock directly.
#[derive(Debug, Clone, Copy)]
pub struct MarketClock {
    tz: Tz,
}

impl MarketClock {
    /// Create a clock pinned to the given IANA zone name.
    pub fn new(zone: &str) -> Result<Self, ClockError> {
        let tz = zone
            .parse::<Tz>()
            .map_err(|_| ClockError::UnknownTimezone(zone.to_owned()))?;
        Ok(Self { tz })
    }

    /// The configured zone.
    #[must_use]
    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Current instant in the configured zone.
    #[must_use]
    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }

    /// Re-express a UTC instant in the configured zone.
    #[must_use]
    pub fn localize(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        instant.with_timezone(&self.tz)
    }

    /// Whether the instant falls on a Saturday or Sunday in the
    /// configured zone.
    #[must_use]
    pub fn is_weekend(&self, instant: &DateTime<Tz>) -> bool {
        matches!(instant.weekday(), Weekday::Sat | Weekday::Sun)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rejects_unknown_zone() {
        let err = MarketClock::new("Mars/Olympus_Mons").unwrap_err();
        assert!(matches!(err, ClockError::UnknownTimezone(_)));
    }

    #[test]
    fn weekend_classification_in_zone() {
        let clock = MarketClock::new("America/New_York").unwrap();
        // 2024-06-15 was a Saturday; 2024-06-17 a Monday.
        let saturday = clock
            .timezone()
            .with_ymd_and_hms(2024, 6, 15, 10, 0, 0)
            .unwrap();
        let monday = clock
            .timezone()
            .with_ymd_and_hms(2024, 6, 17, 10, 0, 0)
            .unwrap();
        assert!(clock.is_weekend(&saturday));
        assert!(!clock.is_weekend(&monday));
    }

    #[test]
    fn weekend_respects_zone_boundary() {
        let clock = MarketClock::new("America/New_York").unwrap();
        // Saturday 01:00 UTC is still Friday evening in New York.
        let instant = Utc.with_ymd_and_hms(2024, 6, 15, 1, 0, 0).unwrap();
        let local = clock.localize(instant);
        assert!(!clock.is_weekend(&local));
    }
}
