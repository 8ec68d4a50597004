//! Limit state per (account, operation type) and the results of checking it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use ledgerguard_core::{AccountId, Amount, OperationName};

use crate::calendar::Calendar;

/// Running accumulation and lockout bookkeeping for one (account, operation type).
///
/// Created lazily on first check, mutated only by the limits engine, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitState {
    pub account_id: AccountId,
    pub operation_type: OperationName,
    pub daily_accumulated: Amount,
    pub monthly_accumulated: Amount,
    pub last_operation_at: Option<DateTime<Utc>>,
    pub is_blocked: bool,
    /// Only meaningful while `is_blocked`.
    pub block_expires_at: Option<DateTime<Utc>>,
    pub failed_attempts: u32,
    pub last_failed_attempt_at: Option<DateTime<Utc>>,
}

impl LimitState {
    /// A brand-new Active state with empty accumulators.
    pub fn fresh(account_id: AccountId, operation_type: OperationName) -> Self {
        Self {
            account_id,
            operation_type,
            daily_accumulated: Amount::ZERO,
            monthly_accumulated: Amount::ZERO,
            last_operation_at: None,
            is_blocked: false,
            block_expires_at: None,
            failed_attempts: 0,
            last_failed_attempt_at: None,
        }
    }

    /// Expiry of a block that is still in force at `now`.
    pub fn active_block(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if !self.is_blocked {
            return None;
        }
        self.block_expires_at.filter(|expires| *expires > now)
    }

    pub fn status(&self, now: DateTime<Utc>) -> LimitStatus {
        match self.active_block(now) {
            Some(_) => LimitStatus::Blocked,
            None => LimitStatus::Active,
        }
    }

    /// Blocked → Active once the block has run out. Returns whether it transitioned.
    pub(crate) fn release_expired_block(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_blocked || self.active_block(now).is_some() {
            return false;
        }
        self.is_blocked = false;
        self.block_expires_at = None;
        self.failed_attempts = 0;
        true
    }

    /// Zero the accumulators whose calendar period has ended since the last operation.
    pub(crate) fn roll_calendar(&mut self, now: DateTime<Utc>, calendar: &Calendar) {
        let (new_day, new_month) = match self.last_operation_at {
            Some(last) => (!calendar.same_day(last, now), !calendar.same_month(last, now)),
            None => (true, true),
        };
        if new_day || new_month {
            self.daily_accumulated = Amount::ZERO;
        }
        if new_month {
            self.monthly_accumulated = Amount::ZERO;
        }
    }

    /// Whether `amount` on top of the accumulators would pass either limit.
    /// Reaching a limit exactly is allowed.
    pub(crate) fn would_exceed(&self, amount: Amount, daily_limit: Amount, monthly_limit: Amount) -> bool {
        let over = |acc: Amount, limit: Amount| match acc.checked_add(amount) {
            Some(total) => total > limit,
            None => true,
        };
        over(self.daily_accumulated, daily_limit) || over(self.monthly_accumulated, monthly_limit)
    }

    /// Count a rejected attempt, restarting the count when the previous failure is
    /// older than `window`. Returns the updated count.
    pub(crate) fn record_failure(&mut self, now: DateTime<Utc>, window: Duration) -> u32 {
        if let Some(last) = self.last_failed_attempt_at {
            if now - last > window {
                self.failed_attempts = 0;
            }
        }
        self.failed_attempts = self.failed_attempts.saturating_add(1);
        self.last_failed_attempt_at = Some(now);
        self.failed_attempts
    }

    pub(crate) fn block_until(&mut self, expires: DateTime<Utc>) {
        self.is_blocked = true;
        self.block_expires_at = Some(expires);
    }

    /// Caller must have ruled out `would_exceed` first, so neither addition overflows.
    pub(crate) fn accumulate(&mut self, amount: Amount, now: DateTime<Utc>) {
        self.daily_accumulated = self.daily_accumulated.checked_add(amount).unwrap_or(self.daily_accumulated);
        self.monthly_accumulated = self
            .monthly_accumulated
            .checked_add(amount)
            .unwrap_or(self.monthly_accumulated);
        self.last_operation_at = Some(now);
    }

    /// Administrative reset: empty accumulators, no block, no failed attempts.
    pub(crate) fn reset(&mut self) {
        self.daily_accumulated = Amount::ZERO;
        self.monthly_accumulated = Amount::ZERO;
        self.is_blocked = false;
        self.block_expires_at = None;
        self.failed_attempts = 0;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitStatus {
    Active,
    Blocked,
}

/// Outcome of a limit check.
///
/// Denials are ordinary values, not errors: a soft `LimitExceeded` only bumps the
/// failure counter, a hard `Blocked` carries the instant the lockout ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LimitCheckResult {
    Allowed,
    LimitExceeded {
        reason: String,
    },
    Blocked {
        reason: String,
        next_reset: DateTime<Utc>,
    },
}

pub(crate) const LIMIT_EXCEEDED_REASON: &str = "limit exceeded: try a lower amount";
pub(crate) const BLOCKED_REASON: &str = "blocked: limits exceeded repeatedly, try again later";

impl LimitCheckResult {
    pub fn exceeded() -> Self {
        Self::LimitExceeded {
            reason: LIMIT_EXCEEDED_REASON.to_string(),
        }
    }

    pub fn blocked(next_reset: DateTime<Utc>) -> Self {
        Self::Blocked {
            reason: BLOCKED_REASON.to_string(),
            next_reset,
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Allowed => None,
            Self::LimitExceeded { reason } | Self::Blocked { reason, .. } => Some(reason.as_str()),
        }
    }

    pub fn next_reset_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Blocked { next_reset, .. } => Some(*next_reset),
            _ => None,
        }
    }
}

/// Read-only projection of a [`LimitState`] for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitStateView {
    pub account_id: AccountId,
    pub operation_type: OperationName,
    pub status: LimitStatus,
    pub daily_accumulated: Amount,
    pub monthly_accumulated: Amount,
    pub last_operation_at: Option<DateTime<Utc>>,
    pub is_blocked: bool,
    pub block_expires_at: Option<DateTime<Utc>>,
    pub failed_attempts: u32,
    pub last_failed_attempt_at: Option<DateTime<Utc>>,
    pub daily_resets_at: DateTime<Utc>,
    pub monthly_resets_at: DateTime<Utc>,
}

impl LimitStateView {
    pub fn project(state: &LimitState, now: DateTime<Utc>, calendar: &Calendar) -> Self {
        Self {
            account_id: state.account_id,
            operation_type: state.operation_type.clone(),
            status: state.status(now),
            daily_accumulated: state.daily_accumulated,
            monthly_accumulated: state.monthly_accumulated,
            last_operation_at: state.last_operation_at,
            is_blocked: state.is_blocked,
            block_expires_at: state.block_expires_at,
            failed_attempts: state.failed_attempts,
            last_failed_attempt_at: state.last_failed_attempt_at,
            daily_resets_at: calendar.next_midnight(now),
            monthly_resets_at: calendar.end_of_month(now),
        }
    }
}
