//! Limit check-and-update state machine.
//!
//! ```text
//!            3 failed checks inside the attempt window
//!   Active ───────────────────────────────────────────▶ Blocked
//!     ▲                                                    │
//!     └──────────── next check after block expiry ─────────┘
//! ```

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, instrument, warn};

use ledgerguard_core::{AccountId, Amount, Clock, DomainError, OperationName, RowKey};

use crate::calendar::Calendar;
use crate::error::LimitsError;
use crate::port::{LimitsStore, LimitsUnit};
use crate::state::{LimitCheckResult, LimitState, LimitStateView};

/// Lockout tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitsSettings {
    /// Failed checks that trigger a block.
    pub max_failed_attempts: u32,
    /// A failure older than this no longer counts towards the block.
    pub attempt_window: Duration,
    pub calendar: Calendar,
}

impl Default for LimitsSettings {
    fn default() -> Self {
        Self {
            max_failed_attempts: 3,
            attempt_window: Duration::hours(24),
            calendar: Calendar::default(),
        }
    }
}

impl LimitsSettings {
    pub fn with_max_failed_attempts(mut self, max: u32) -> Self {
        self.max_failed_attempts = max;
        self
    }

    pub fn with_attempt_window(mut self, window: Duration) -> Self {
        self.attempt_window = window;
        self
    }

    pub fn with_calendar(mut self, calendar: Calendar) -> Self {
        self.calendar = calendar;
        self
    }
}

/// Per-(account, operation type) limits engine.
pub struct LimitsEngine<S> {
    store: S,
    clock: Arc<dyn Clock>,
    settings: LimitsSettings,
}

impl<S> LimitsEngine<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, settings: LimitsSettings) -> Self {
        Self {
            store,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &LimitsSettings {
        &self.settings
    }

    /// Run the state machine inside a unit of work owned by the caller.
    ///
    /// The unit must hold `RowKey::LimitState(account_id, operation_type)`. The state is
    /// saved on every path that changes it; committing is the caller's job.
    #[instrument(
        skip(self, unit),
        fields(account_id = %account_id, operation_type = %operation_type, %amount),
        err
    )]
    pub async fn check_in<U>(
        &self,
        unit: &mut U,
        account_id: AccountId,
        operation_type: &OperationName,
        amount: Amount,
        user_level: u32,
    ) -> Result<LimitCheckResult, LimitsError>
    where
        U: LimitsUnit + ?Sized,
    {
        amount.ensure_positive("amount")?;
        ensure_known_type(unit, operation_type).await?;

        let now = self.clock.now();
        let mut state = unit.load_or_create_limit_state(account_id, operation_type).await?;

        if let Some(expires) = state.active_block(now) {
            warn!(%expires, "rejected: lockout in force");
            return Ok(LimitCheckResult::blocked(expires));
        }
        if state.release_expired_block(now) {
            unit.save_limit_state(&state).await?;
            info!("lockout expired; state active again");
        }

        let policy = unit
            .find_policy(operation_type, user_level)
            .await?
            .ok_or_else(|| LimitsError::MissingPolicy {
                operation_type: operation_type.clone(),
                user_level,
            })?;

        state.roll_calendar(now, &self.settings.calendar);

        if state.would_exceed(amount, policy.daily_limit, policy.monthly_limit) {
            let failed = state.record_failure(now, self.settings.attempt_window);
            if failed >= self.settings.max_failed_attempts {
                let expires = self.settings.calendar.next_midnight(now);
                state.block_until(expires);
                unit.save_limit_state(&state).await?;
                warn!(failed, %expires, "rejected: too many failed attempts, blocking");
                return Ok(LimitCheckResult::blocked(expires));
            }

            unit.save_limit_state(&state).await?;
            warn!(failed, "rejected: limit exceeded");
            return Ok(LimitCheckResult::exceeded());
        }

        state.accumulate(amount, now);
        unit.save_limit_state(&state).await?;
        debug!(
            daily = %state.daily_accumulated,
            monthly = %state.monthly_accumulated,
            "allowed"
        );
        Ok(LimitCheckResult::Allowed)
    }
}

impl<S: LimitsStore> LimitsEngine<S> {
    /// Check `amount` against the pair's limits and record the outcome, atomically.
    pub async fn check_and_update(
        &self,
        account_id: AccountId,
        operation_type: &OperationName,
        amount: Amount,
        user_level: u32,
    ) -> Result<LimitCheckResult, LimitsError> {
        let mut unit = self
            .store
            .begin_limits(vec![RowKey::LimitState(account_id, operation_type.clone())])
            .await?;
        let result = self
            .check_in(&mut *unit, account_id, operation_type, amount, user_level)
            .await?;
        unit.commit().await?;
        Ok(result)
    }

    /// Administrative override: zero both accumulators, lift any block, forget failures.
    #[instrument(skip(self), fields(account_id = %account_id, operation_type = %operation_type), err)]
    pub async fn reset_limits(
        &self,
        account_id: AccountId,
        operation_type: &OperationName,
    ) -> Result<LimitStateView, LimitsError> {
        let mut unit = self
            .store
            .begin_limits(vec![RowKey::LimitState(account_id, operation_type.clone())])
            .await?;
        ensure_known_type(&mut *unit, operation_type).await?;

        let mut state = unit.load_or_create_limit_state(account_id, operation_type).await?;
        state.reset();
        unit.save_limit_state(&state).await?;
        unit.commit().await?;

        info!("limits reset");
        Ok(self.project(&state))
    }

    /// Read-only diagnostics. An untouched pair is reported as fresh without creating it.
    pub async fn limits_state(
        &self,
        account_id: AccountId,
        operation_type: &OperationName,
    ) -> Result<LimitStateView, LimitsError> {
        let mut unit = self
            .store
            .begin_limits(vec![RowKey::LimitState(account_id, operation_type.clone())])
            .await?;
        ensure_known_type(&mut *unit, operation_type).await?;

        let state = unit
            .limit_state(account_id, operation_type)
            .await?
            .unwrap_or_else(|| LimitState::fresh(account_id, operation_type.clone()));
        Ok(self.project(&state))
    }

    fn project(&self, state: &LimitState) -> LimitStateView {
        LimitStateView::project(state, self.clock.now(), &self.settings.calendar)
    }
}

async fn ensure_known_type<U>(unit: &mut U, operation_type: &OperationName) -> Result<(), LimitsError>
where
    U: LimitsUnit + ?Sized,
{
    if unit.operation_type_exists(operation_type).await? {
        Ok(())
    } else {
        Err(DomainError::not_found(format!("operation type {operation_type}")).into())
    }
}
