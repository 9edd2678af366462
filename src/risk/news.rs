//! News blackout filter.
//!
//! High-impact scheduled events (rate decisions, payrolls) make short
//! expiries a coin flip; the risk engine vetoes proposals inside a
//! registered window.

use chrono::{DateTime, Duration, Utc};

/// Registered high-impact event windows.
#[derive(Debug, Default)]
pub struct NewsFilter {
    windows: Vec<(DateTime<Utc>, DateTime<Utc>)>,
}

impl NewsFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a blackout window starting at `start`.
    pub fn add_event(&mut self, start: DateTime<Utc>, duration_minutes: i64) {
        let end = start + Duration::minutes(duration_minutes);
        self.windows.push((start, end));
    }

    /// True when `at` falls inside any registered window.
    #[must_use]
    pub fn is_blackout(&self, at: DateTime<Utc>) -> bool {
        self.windows
            .iter()
            .any(|(start, end)| *start <= at && at <= *end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blackout_covers_the_window_inclusive() {
        let mut filter = NewsFilter::new();
        let start = Utc::now();
        filter.add_event(start, 30);

        assert!(filter.is_blackout(start));
        assert!(filter.is_blackout(start + Duration::minutes(30)));
        assert!(!filter.is_blackout(start + Duration::minutes(31)));
        assert!(!filter.is_blackout(start - Duration::seconds(1)));
    }
}
