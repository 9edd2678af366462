//! Pre-trade risk checks, stake sizing and result tracking.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::RiskConfig;

use super::news::NewsFilter;
use super::stats::{AccountState, DailyRiskStats, LastResult, TradeRecord};

/// Risk severity ladder. `Critical` overrides everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Read-only snapshot handed to the monitoring collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct RiskMetrics {
    pub daily_loss: Decimal,
    pub daily_profit: Decimal,
    pub consecutive_losses: u32,
    pub consecutive_wins: u32,
    pub total_trades_today: u32,
    pub current_drawdown: Decimal,
    pub win_rate: Decimal,
    pub risk_level: RiskLevel,
}

/// Day roll-up for operator logging.
#[derive(Debug, Clone, Serialize)]
pub struct DailySummary {
    pub date: chrono::NaiveDate,
    pub total_trades: u32,
    pub wins: u32,
    pub losses: u32,
    pub win_rate: Decimal,
    pub profit: Decimal,
    pub loss: Decimal,
    pub net_result: Decimal,
    pub current_balance: Decimal,
}

/// Outcome of a pre-trade evaluation.
///
/// A rejection is a reported decision, not an error: `reasons` carries
/// every failing check so operators see the full blocking rationale.
#[derive(Debug, Clone)]
pub struct RiskDecision {
    pub stake: Decimal,
    pub reasons: Vec<String>,
}

impl RiskDecision {
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.reasons.is_empty()
    }
}

/// Gates, sizes and tracks every trade against capital limits.
pub struct RiskEngine {
    pub(crate) limits: RiskConfig,
    pub(crate) account: AccountState,
    pub(crate) daily: DailyRiskStats,
    pub(crate) history: Vec<TradeRecord>,
    news: NewsFilter,
}

impl RiskEngine {
    #[must_use]
    pub fn new(limits: RiskConfig) -> Self {
        Self::with_date(limits, Utc::now())
    }

    #[must_use]
    pub fn with_date(limits: RiskConfig, now: DateTime<Utc>) -> Self {
        let account = AccountState::new(limits.initial_balance);
        Self {
            limits,
            account,
            daily: DailyRiskStats::for_date(now.date_naive()),
            history: Vec::new(),
            news: NewsFilter::new(),
        }
    }

    /// Evaluate whether a trade may execute right now.
    ///
    /// When `proposed_stake` is `None` the stake is computed with
    /// [`Self::optimal_stake`]. All checks run; the decision carries
    /// every failing reason.
    pub fn can_execute(&mut self, proposed_stake: Option<Decimal>) -> RiskDecision {
        self.can_execute_at(proposed_stake, Utc::now())
    }

    /// Clock-injected variant of [`Self::can_execute`].
    pub fn can_execute_at(
        &mut self,
        proposed_stake: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> RiskDecision {
        self.roll_day(now);

        let stake = proposed_stake.unwrap_or_else(|| self.optimal_stake());

        let checks = [
            self.check_daily_loss(),
            self.check_daily_trades(),
            self.check_consecutive_losses(),
            self.check_balance(),
            self.check_drawdown(),
            self.check_stake(stake),
            self.check_market_conditions(now),
        ];
        let reasons: Vec<String> = checks.into_iter().flatten().collect();

        if !reasons.is_empty() {
            warn!(stake = %stake, reasons = ?reasons, "Trade blocked by risk checks");
        }

        RiskDecision { stake, reasons }
    }

    /// Stake sizing: base percentage of balance, scaled by the day's
    /// win-rate band, halved after more than two consecutive losses,
    /// clamped to the configured bounds.
    ///
    /// Deterministic in (balance, wins, losses, consecutive losses).
    #[must_use]
    pub fn optimal_stake(&self) -> Decimal {
        let base = self.account.balance * self.limits.base_stake_percent / Decimal::ONE_HUNDRED;

        // No settled trades yet today: no performance evidence either
        // way, so the band multiplier stays neutral.
        let mut multiplier = if self.daily.has_settled_trades() {
            let win_rate = self.daily.win_rate();
            if win_rate > dec!(0.7) {
                dec!(1.2)
            } else if win_rate > dec!(0.5) {
                dec!(1.0)
            } else {
                dec!(0.8)
            }
        } else {
            Decimal::ONE
        };

        if self.daily.consecutive_losses > 2 {
            multiplier *= dec!(0.5);
        }

        (base * multiplier)
            .clamp(self.limits.min_stake, self.limits.max_stake)
            .round_dp(2)
    }

    /// Record a settled trade result.
    pub fn update_result(&mut self, result: Decimal, stake: Decimal) {
        self.update_result_at(result, stake, Utc::now());
    }

    /// Clock-injected variant of [`Self::update_result`].
    pub fn update_result_at(&mut self, result: Decimal, stake: Decimal, now: DateTime<Utc>) {
        self.roll_day(now);

        self.account.apply(result);
        self.daily.trades += 1;

        if result > Decimal::ZERO {
            self.daily.wins += 1;
            self.daily.profit += result;
            self.daily.consecutive_wins += 1;
            self.daily.consecutive_losses = 0;
            self.daily.last_result = Some(LastResult::Win);
        } else {
            self.daily.losses += 1;
            self.daily.loss += result.abs();
            self.daily.consecutive_losses += 1;
            self.daily.consecutive_wins = 0;
            self.daily.last_result = Some(LastResult::Loss);
        }

        self.history.push(TradeRecord {
            timestamp: now,
            result,
            stake,
            balance_after: self.account.balance,
        });

        info!(
            result = %result,
            balance = %self.account.balance,
            consecutive_losses = self.daily.consecutive_losses,
            "Trade result recorded"
        );
    }

    /// True when any hard stop condition holds.
    #[must_use]
    pub fn should_stop_trading(&self) -> bool {
        self.risk_level() == RiskLevel::Critical
            || self.daily.loss >= self.limits.max_daily_loss
            || self.daily.consecutive_losses >= self.limits.max_consecutive_losses
            || self.account.drawdown_percent() >= self.limits.max_drawdown_percent
            || self.account.balance <= self.limits.min_balance
    }

    /// Severity ladder. A balance at or below the floor is `Critical`
    /// regardless of drawdown or streak values.
    #[must_use]
    pub fn risk_level(&self) -> RiskLevel {
        if self.account.balance <= self.limits.min_balance {
            return RiskLevel::Critical;
        }
        let drawdown = self.account.drawdown_percent();
        let streak = self.daily.consecutive_losses;
        if drawdown > dec!(15) || streak > 3 {
            RiskLevel::High
        } else if drawdown > dec!(10) || streak > 2 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Read-only metrics snapshot.
    #[must_use]
    pub fn metrics(&self) -> RiskMetrics {
        RiskMetrics {
            daily_loss: self.daily.loss,
            daily_profit: self.daily.profit,
            consecutive_losses: self.daily.consecutive_losses,
            consecutive_wins: self.daily.consecutive_wins,
            total_trades_today: self.daily.trades,
            current_drawdown: self.account.drawdown_percent(),
            win_rate: self.daily.win_rate(),
            risk_level: self.risk_level(),
        }
    }

    /// Day roll-up for operator logging.
    #[must_use]
    pub fn daily_summary(&self) -> DailySummary {
        DailySummary {
            date: self.daily.date,
            total_trades: self.daily.trades,
            wins: self.daily.wins,
            losses: self.daily.losses,
            win_rate: self.daily.win_rate(),
            profit: self.daily.profit,
            loss: self.daily.loss,
            net_result: self.daily.profit - self.daily.loss,
            current_balance: self.account.balance,
        }
    }

    #[must_use]
    pub fn balance(&self) -> Decimal {
        self.account.balance
    }

    #[must_use]
    pub fn history(&self) -> &[TradeRecord] {
        &self.history
    }

    /// Blackout window registry for the market-condition veto.
    pub fn news_mut(&mut self) -> &mut NewsFilter {
        &mut self.news
    }

    fn roll_day(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        if self.daily.date != today {
            info!(from = %self.daily.date, to = %today, "Daily statistics rolled over");
            self.daily = DailyRiskStats::for_date(today);
        }
    }

    fn check_daily_loss(&self) -> Option<String> {
        (self.daily.loss >= self.limits.max_daily_loss)
            .then(|| "daily loss limit reached".to_string())
    }

    fn check_daily_trades(&self) -> Option<String> {
        (self.daily.trades >= self.limits.max_daily_trades)
            .then(|| "daily trade limit reached".to_string())
    }

    fn check_consecutive_losses(&self) -> Option<String> {
        (self.daily.consecutive_losses >= self.limits.max_consecutive_losses)
            .then(|| "too many consecutive losses".to_string())
    }

    fn check_balance(&self) -> Option<String> {
        (self.account.balance <= self.limits.min_balance)
            .then(|| "balance below minimum".to_string())
    }

    fn check_drawdown(&self) -> Option<String> {
        let drawdown = self.account.drawdown_percent();
        (drawdown >= self.limits.max_drawdown_percent)
            .then(|| format!("maximum drawdown reached ({:.1}%)", drawdown))
    }

    fn check_stake(&self, stake: Decimal) -> Option<String> {
        if stake < self.limits.min_stake {
            return Some(format!("stake below minimum ({})", self.limits.min_stake));
        }
        if stake > self.limits.max_stake {
            return Some(format!("stake above maximum ({})", self.limits.max_stake));
        }
        if self.account.balance > Decimal::ZERO {
            let stake_percent = stake / self.account.balance * Decimal::ONE_HUNDRED;
            if stake_percent > self.limits.max_stake_percent {
                return Some(format!(
                    "stake exceeds {}% of balance",
                    self.limits.max_stake_percent
                ));
            }
        }
        None
    }

    fn check_market_conditions(&self, now: DateTime<Utc>) -> Option<String> {
        self.news
            .is_blackout(now)
            .then(|| "news blackout window active".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn limits() -> RiskConfig {
        RiskConfig::default()
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap()
    }

    fn engine() -> RiskEngine {
        RiskEngine::with_date(limits(), noon())
    }

    #[test]
    fn fresh_day_stake_is_base_percent() {
        // balance 1000, base 2%, no trades today
        let engine = engine();
        assert_eq!(engine.optimal_stake(), dec!(20.00));
    }

    #[test]
    fn losing_streak_halves_the_reduced_stake() {
        let mut engine = engine();
        // same balance, three straight losses on the day
        engine.daily.losses = 3;
        engine.daily.consecutive_losses = 3;
        // win rate 0 -> 0.8 band, streak > 2 -> x0.5: 20 * 0.8 * 0.5
        assert_eq!(engine.optimal_stake(), dec!(8.00));
    }

    #[test]
    fn hot_streak_raises_the_stake() {
        let mut engine = engine();
        for _ in 0..4 {
            engine.update_result_at(dec!(8), dec!(10), noon());
        }
        // win rate 1.0 -> 1.2 band; balance grew to 1032
        assert_eq!(engine.optimal_stake(), dec!(24.77));
    }

    #[test]
    fn stake_is_deterministic() {
        let mut engine = engine();
        engine.update_result_at(dec!(-10), dec!(10), noon());
        assert_eq!(engine.optimal_stake(), engine.optimal_stake());
    }

    #[test]
    fn daily_loss_limit_blocks_with_reason() {
        let mut engine = engine();
        // 10 losses of 10 reach the configured 100 daily loss cap
        for _ in 0..10 {
            engine.update_result_at(dec!(-10), dec!(10), noon());
        }
        let decision = engine.can_execute_at(Some(dec!(10)), noon());
        assert!(!decision.is_approved());
        assert!(decision
            .reasons
            .iter()
            .any(|r| r.contains("daily loss limit")));
    }

    #[test]
    fn all_failing_reasons_are_reported() {
        let mut config = limits();
        config.max_consecutive_losses = 3;
        let mut engine = RiskEngine::with_date(config, noon());
        for _ in 0..10 {
            engine.update_result_at(dec!(-10), dec!(10), noon());
        }
        let decision = engine.can_execute_at(Some(dec!(10)), noon());
        // daily loss and streak both fail
        assert!(decision.reasons.len() >= 2);
    }

    #[test]
    fn approval_passes_a_clean_day() {
        let mut engine = engine();
        let decision = engine.can_execute_at(None, noon());
        assert!(decision.is_approved());
        assert_eq!(decision.stake, dec!(20.00));
    }

    #[test]
    fn stake_above_balance_fraction_is_rejected() {
        let mut engine = engine();
        // 100 > 5% of 1000
        let decision = engine.can_execute_at(Some(dec!(100)), noon());
        assert!(decision
            .reasons
            .iter()
            .any(|r| r.contains("% of balance")));
    }

    #[test]
    fn day_rollover_resets_statistics() {
        let mut engine = engine();
        engine.update_result_at(dec!(-10), dec!(10), noon());
        assert_eq!(engine.daily.trades, 1);

        let tomorrow = noon() + Duration::days(1);
        let decision = engine.can_execute_at(None, tomorrow);
        assert!(decision.is_approved());
        assert_eq!(engine.daily.trades, 0);
        assert_eq!(engine.daily.date, tomorrow.date_naive());
    }

    #[test]
    fn stop_trading_on_balance_floor_alone() {
        let mut config = limits();
        config.initial_balance = dec!(101);
        let mut engine = RiskEngine::with_date(config, noon());
        engine.update_result_at(dec!(-1), dec!(1), noon());
        // balance 100 <= min_balance 100, nothing else breached
        assert_eq!(engine.risk_level(), RiskLevel::Critical);
        assert!(engine.should_stop_trading());
    }

    #[test]
    fn risk_ladder_orders_correctly() {
        let mut engine = engine();
        assert_eq!(engine.risk_level(), RiskLevel::Low);

        for _ in 0..3 {
            engine.update_result_at(dec!(-1), dec!(1), noon());
        }
        assert_eq!(engine.risk_level(), RiskLevel::Medium);

        engine.update_result_at(dec!(-1), dec!(1), noon());
        assert_eq!(engine.risk_level(), RiskLevel::High);
    }

    #[test]
    fn news_blackout_vetoes_proposals() {
        let mut engine = engine();
        engine.news_mut().add_event(noon() - Duration::minutes(5), 30);
        let decision = engine.can_execute_at(None, noon());
        assert!(decision
            .reasons
            .iter()
            .any(|r| r.contains("news blackout")));
    }
}
