//! Risk state persistence.
//!
//! The engine's balance, high-water mark, current day and recent trade
//! history are snapshotted to a JSON file so a restart keeps the same
//! risk posture. Loading is forgiving: a missing file starts fresh, a
//! corrupt one is reported and ignored, a snapshot from an earlier day
//! keeps the account but starts a fresh day.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;

use super::engine::RiskEngine;
use super::stats::{AccountState, DailyRiskStats, TradeRecord};

/// Most recent trade records kept in a snapshot.
const PERSISTED_HISTORY_LIMIT: usize = 100;

/// Serialized form of the risk engine state.
#[derive(Debug, Serialize, Deserialize)]
pub struct RiskState {
    pub account: AccountState,
    pub daily: DailyRiskStats,
    pub history: Vec<TradeRecord>,
}

impl RiskEngine {
    /// Snapshot the current state, trimming history to the most recent
    /// [`PERSISTED_HISTORY_LIMIT`] records.
    #[must_use]
    pub fn snapshot(&self) -> RiskState {
        let start = self.history.len().saturating_sub(PERSISTED_HISTORY_LIMIT);
        RiskState {
            account: self.account.clone(),
            daily: self.daily.clone(),
            history: self.history[start..].to_vec(),
        }
    }

    /// Write the state snapshot to `path`.
    pub fn save_state<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        std::fs::write(&path, json)?;
        debug!(path = %path.as_ref().display(), "Risk state saved");
        Ok(())
    }

    /// Restore state from `path`, if a usable snapshot exists.
    ///
    /// Never fails: persistence problems are logged and the engine keeps
    /// its fresh state.
    pub fn load_state<P: AsRef<Path>>(&mut self, path: P) {
        self.load_state_at(path, Utc::now());
    }

    /// Clock-injected variant of [`Self::load_state`].
    pub fn load_state_at<P: AsRef<Path>>(&mut self, path: P, now: DateTime<Utc>) {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No risk state file, starting fresh");
                return;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read risk state");
                return;
            }
        };

        let state: RiskState = match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt risk state, starting fresh");
                return;
            }
        };

        self.account = state.account;
        self.history = state.history;

        // A snapshot from an earlier day keeps the account but the day
        // starts over.
        let today = now.date_naive();
        if state.daily.date == today {
            self.daily = state.daily;
        } else {
            debug!(snapshot_date = %state.daily.date, "Stale daily stats discarded");
            self.daily = DailyRiskStats::for_date(today);
        }

        info!(
            path = %path.display(),
            balance = %self.account.balance,
            records = self.history.len(),
            "Risk state restored"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RiskConfig;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap()
    }

    #[test]
    fn round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("risk_state.json");

        let mut engine = RiskEngine::with_date(RiskConfig::default(), noon());
        engine.update_result_at(dec!(8), dec!(10), noon());
        engine.update_result_at(dec!(-10), dec!(10), noon());
        engine.save_state(&path).unwrap();

        let mut restored = RiskEngine::with_date(RiskConfig::default(), noon());
        restored.load_state_at(&path, noon());

        assert_eq!(restored.balance(), dec!(998));
        assert_eq!(restored.history().len(), 2);
        assert_eq!(restored.daily_summary().total_trades, 2);
    }

    #[test]
    fn stale_day_is_discarded_but_account_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("risk_state.json");

        let mut engine = RiskEngine::with_date(RiskConfig::default(), noon());
        engine.update_result_at(dec!(-10), dec!(10), noon());
        engine.save_state(&path).unwrap();

        let tomorrow = noon() + Duration::days(1);
        let mut restored = RiskEngine::with_date(RiskConfig::default(), tomorrow);
        restored.load_state_at(&path, tomorrow);

        assert_eq!(restored.balance(), dec!(990));
        assert_eq!(restored.daily_summary().total_trades, 0);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let mut engine = RiskEngine::with_date(RiskConfig::default(), noon());
        engine.load_state_at("/nonexistent/risk_state.json", noon());
        assert_eq!(engine.balance(), dec!(1000));
    }

    #[test]
    fn corrupt_file_falls_back_to_fresh_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("risk_state.json");
        std::fs::write(&path, "{not json").unwrap();

        let mut engine = RiskEngine::with_date(RiskConfig::default(), noon());
        engine.load_state_at(&path, noon());
        assert_eq!(engine.balance(), dec!(1000));
    }

    #[test]
    fn snapshot_trims_history_to_limit() {
        let mut engine = RiskEngine::with_date(RiskConfig::default(), noon());
        for _ in 0..120 {
            engine.update_result_at(dec!(1), dec!(1), noon());
        }
        assert_eq!(engine.history().len(), 120);
        assert_eq!(engine.snapshot().history.len(), 100);
    }
}
