//! Periodic budget check.
//!
//! Every cycle walks the users with a budget and warns the ones that spent at
//! least `threshold_percent` of it, at most once per calendar month.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use engine::{EngineError, Store, UserIdentity, same_month};
use tokio::{sync::watch, time::MissedTickBehavior};

use crate::{messenger::Messenger, texts};

#[derive(Clone, Debug)]
pub struct MonitorSettings {
    pub interval: Duration,
    pub threshold_percent: f64,
    /// Calendar used for the once-per-month rule.
    pub timezone: Tz,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60 * 60),
            threshold_percent: 70.0,
            timezone: chrono_tz::UTC,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub checked: usize,
    pub notified: usize,
    pub failed: usize,
}

enum Outcome {
    Quiet,
    Notified,
}

pub struct BudgetMonitor {
    store: Arc<dyn Store>,
    messenger: Arc<dyn Messenger>,
    settings: MonitorSettings,
}

impl BudgetMonitor {
    pub fn new(
        store: Arc<dyn Store>,
        messenger: Arc<dyn Messenger>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            store,
            messenger,
            settings,
        }
    }

    /// Runs a cycle now and then every interval until `shutdown` turns `true`
    /// or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let period = self.settings.interval.max(Duration::from_secs(1));
        tracing::info!(
            "Starting budget monitor (every {}s, threshold {}%)...",
            period.as_secs(),
            self.settings.threshold_percent
        );

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.run_cycle(Utc::now()).await {
                        tracing::error!("budget check skipped: {err}");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Budget monitor stopped");
    }

    /// One pass over every budgeted user. Only a failure to list the users
    /// aborts the cycle; per-user failures are counted and skipped.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<CycleReport, EngineError> {
        let users = self.store.users_with_positive_budget().await?;

        let mut report = CycleReport::default();
        for user in users {
            report.checked += 1;
            match self.check_user(user, now).await {
                Ok(Outcome::Notified) => report.notified += 1,
                Ok(Outcome::Quiet) => {}
                Err(()) => report.failed += 1,
            }
        }

        tracing::debug!(
            checked = report.checked,
            notified = report.notified,
            failed = report.failed,
            "budget check finished"
        );
        Ok(report)
    }

    async fn check_user(&self, user: UserIdentity, now: DateTime<Utc>) -> Result<Outcome, ()> {
        let status = self.store.budget_status(user, now).await.map_err(|err| {
            tracing::error!(user = %user, "failed to load budget status: {err}");
        })?;

        if status.percent_spent < self.settings.threshold_percent
            || same_month(status.last_notified_at, now, self.settings.timezone)
        {
            return Ok(Outcome::Quiet);
        }

        let warning = texts::budget_warning(status.percent_spent, status.remaining);
        self.messenger
            .send_text(user, &warning)
            .await
            .map_err(|err| {
                tracing::error!(user = %user, "failed to send budget warning: {err}");
            })?;

        self.store
            .record_notification_sent(user, now)
            .await
            .map_err(|err| {
                tracing::error!(user = %user, "failed to record budget warning: {err}");
            })?;

        tracing::info!(user = %user, "budget warning sent");
        Ok(Outcome::Notified)
    }
}
