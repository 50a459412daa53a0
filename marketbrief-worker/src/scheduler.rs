/// Reminder dispatch loop
///
/// This module implements the worker loop that sends each user their
/// daily portfolio summary at their configured local wall-clock time.
///
/// # Architecture
///
/// ```text
/// ReminderScheduler
///   ├─> User::list_reminder_enabled: enumerate configured users
///   ├─> reminders: convert the shared tick instant to each user's
///   │   local minute and compare against their stored "HH:MM"
///   ├─> compose_summary: build the digest rows from portfolio + cache
///   └─> Notifier: deliver the digest
/// ```
///
/// # Timing
///
/// One UTC instant is captured per tick and every user is matched
/// against that same instant, converted into their own timezone. A
/// per-user map of the last dispatched local "YYYY-MM-DD HH:MM" stamp
/// guards against double sends when ticks land inside the same minute,
/// and collapses the repeated hour on DST fall-back days into a single
/// send. Missed minutes are not caught up: a tick that arrives late
/// simply compares against the clock as it is now.
///
/// # Failure handling
///
/// Every per-user problem (unresolvable timezone, empty portfolio,
/// compose failure, delivery failure, dispatch timeout) is logged and
/// skips only that user. A failed enumeration aborts the current tick;
/// the loop itself only exits on shutdown.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use marketbrief_worker::notifier::EmailNotifier;
/// use marketbrief_worker::scheduler::ReminderScheduler;
/// use marketbrief_shared::mailer::{Mailer, MailerConfig};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, mail: MailerConfig) -> anyhow::Result<()> {
/// let notifier = Arc::new(EmailNotifier::new(Mailer::new(mail)));
/// let scheduler = ReminderScheduler::new(pool, notifier);
///
/// // Runs until the shutdown token is cancelled
/// scheduler.run().await?;
/// # Ok(())
/// # }
/// ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use marketbrief_shared::models::user::User;
use marketbrief_shared::reminders::{local_minute, local_stamp, resolve_timezone};
use marketbrief_shared::summary::compose_summary;
use sqlx::PgPool;
use tokio::time::{interval, timeout, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::notifier::{Notifier, NotifyError};

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Seconds between dispatch passes
    pub tick_interval_secs: u64,

    /// Per-user budget for composing and delivering one digest
    pub dispatch_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            tick_interval_secs: 60,
            dispatch_timeout_secs: 30,
        }
    }
}

/// Error for a single user's dispatch attempt
#[derive(Debug, thiserror::Error)]
enum DispatchError {
    /// Summary composition failed
    #[error("Failed to compose summary: {0}")]
    Compose(#[from] sqlx::Error),

    /// The notifier could not deliver the digest
    #[error(transparent)]
    Notify(#[from] NotifyError),
}

/// Counters for one dispatch pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Digests delivered
    pub dispatched: usize,

    /// Due users skipped because their portfolio was empty
    pub skipped: usize,

    /// Due users whose dispatch failed or timed out
    pub failed: usize,
}

/// Reminder scheduler
///
/// Walks the reminder-enabled user directory on a fixed interval and
/// dispatches the daily digest to every user whose local minute matches
/// their configured time.
pub struct ReminderScheduler {
    db: PgPool,
    notifier: Arc<dyn Notifier>,
    config: SchedulerConfig,
    shutdown_token: CancellationToken,
}

impl ReminderScheduler {
    /// Creates a scheduler with the default configuration
    pub fn new(db: PgPool, notifier: Arc<dyn Notifier>) -> Self {
        ReminderScheduler::with_config(db, notifier, SchedulerConfig::default())
    }

    /// Creates a scheduler with a custom configuration
    pub fn with_config(db: PgPool, notifier: Arc<dyn Notifier>, config: SchedulerConfig) -> Self {
        ReminderScheduler {
            db,
            notifier,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Gets the shutdown token
    ///
    /// Used to signal graceful shutdown from external handlers.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Runs the dispatch loop until shutdown
    ///
    /// # Errors
    ///
    /// Only returns an error for unrecoverable startup problems; tick
    /// failures are logged and retried on the next interval.
    pub async fn run(&self) -> anyhow::Result<()> {
        tracing::info!(
            notifier = self.notifier.name(),
            tick_interval_secs = self.config.tick_interval_secs,
            "Reminder scheduler starting"
        );

        let mut ticker = interval(Duration::from_secs(self.config.tick_interval_secs));
        // A late tick must not trigger a burst of catch-up passes
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_dispatched: HashMap<Uuid, String> = HashMap::new();

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    tracing::info!("Shutdown requested, reminder scheduler stopping");
                    break;
                }
                _ = ticker.tick() => {}
            }

            let now = Utc::now();
            match self.tick(now, &mut last_dispatched).await {
                Ok(report) if report.dispatched > 0 || report.failed > 0 => {
                    tracing::info!(
                        dispatched = report.dispatched,
                        skipped = report.skipped,
                        failed = report.failed,
                        "Reminder tick complete"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "Failed to enumerate reminder users, tick aborted");
                }
            }
        }

        Ok(())
    }

    /// Runs one dispatch pass against the given instant
    ///
    /// `last_dispatched` carries the per-user dedupe stamps between
    /// passes; the caller owns it so a restart naturally starts clean.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the user directory cannot be read.
    /// Per-user failures are counted in the report instead.
    pub async fn tick(
        &self,
        now: DateTime<Utc>,
        last_dispatched: &mut HashMap<Uuid, String>,
    ) -> Result<TickReport, sqlx::Error> {
        let users = User::list_reminder_enabled(&self.db).await?;

        // Drop stamps for users no longer in the directory
        let live: HashSet<Uuid> = users.iter().map(|u| u.id).collect();
        last_dispatched.retain(|id, _| live.contains(id));

        let mut report = TickReport::default();

        for user in users {
            let stamp = match due_stamp(&user, now, last_dispatched) {
                Some(stamp) => stamp,
                None => continue,
            };

            let budget = Duration::from_secs(self.config.dispatch_timeout_secs);
            match timeout(budget, self.dispatch(&user)).await {
                Ok(Ok(true)) => {
                    last_dispatched.insert(user.id, stamp);
                    report.dispatched += 1;
                }
                Ok(Ok(false)) => {
                    report.skipped += 1;
                }
                Ok(Err(e)) => {
                    tracing::warn!(user_id = %user.id, error = %e, "Reminder dispatch failed");
                    report.failed += 1;
                }
                Err(_) => {
                    tracing::warn!(
                        user_id = %user.id,
                        budget_secs = self.config.dispatch_timeout_secs,
                        "Reminder dispatch timed out"
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Composes and delivers one user's digest
    ///
    /// Returns `Ok(false)` when the portfolio is empty and nothing was
    /// sent, `Ok(true)` after a successful delivery.
    async fn dispatch(&self, user: &User) -> Result<bool, DispatchError> {
        let rows = compose_summary(&self.db, user.id).await?;
        if rows.is_empty() {
            tracing::debug!(user_id = %user.id, "Portfolio empty, reminder skipped");
            return Ok(false);
        }

        self.notifier.send(&user.email, &rows).await?;

        tracing::info!(
            user_id = %user.id,
            symbols = rows.len(),
            notifier = self.notifier.name(),
            "Daily summary dispatched"
        );

        Ok(true)
    }
}

/// Decides whether a user is due at the given instant
///
/// Returns the local dispatch stamp to record when the user's local
/// minute matches their stored time and that stamp has not already been
/// dispatched. Users with an unresolvable timezone are skipped with a
/// warning rather than failing the tick.
fn due_stamp(
    user: &User,
    now: DateTime<Utc>,
    last_dispatched: &HashMap<Uuid, String>,
) -> Option<String> {
    if !user.reminder_enabled {
        return None;
    }
    let reminder_time = user.reminder_time.as_deref()?;

    let tz = match resolve_timezone(&user.timezone) {
        Ok(tz) => tz,
        Err(e) => {
            tracing::warn!(user_id = %user.id, error = %e, "Skipping reminder: bad timezone");
            return None;
        }
    };

    if local_minute(tz, now) != reminder_time {
        return None;
    }

    let stamp = local_stamp(tz, now);
    if last_dispatched.get(&user.id) == Some(&stamp) {
        return None;
    }

    Some(stamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reminder_user(reminder_time: Option<&str>, enabled: bool, timezone: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "reminded@example.com".to_string(),
            email_verified: true,
            password_hash: "hash".to_string(),
            name: None,
            provider_api_key: Some("key".to_string()),
            provider_key_updated_at: None,
            reminder_time: reminder_time.map(|t| t.to_string()),
            reminder_enabled: enabled,
            timezone: timezone.to_string(),
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    #[test]
    fn test_scheduler_config_default() {
        let config = SchedulerConfig::default();
        assert_eq!(config.tick_interval_secs, 60);
        assert_eq!(config.dispatch_timeout_secs, 30);
    }

    #[test]
    fn test_due_at_matching_local_minute() {
        let user = reminder_user(Some("09:30"), true, "America/New_York");
        // January: New York is UTC-5
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 14, 30, 0).unwrap();

        let stamp = due_stamp(&user, now, &HashMap::new()).unwrap();
        assert_eq!(stamp, "2025-01-15 09:30");
    }

    #[test]
    fn test_not_due_outside_the_minute() {
        let user = reminder_user(Some("09:30"), true, "America/New_York");
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 14, 31, 0).unwrap();

        assert_eq!(due_stamp(&user, now, &HashMap::new()), None);
    }

    #[test]
    fn test_disabled_user_never_due() {
        let user = reminder_user(Some("09:30"), false, "America/New_York");
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 14, 30, 0).unwrap();

        assert_eq!(due_stamp(&user, now, &HashMap::new()), None);
    }

    #[test]
    fn test_unconfigured_time_never_due() {
        let user = reminder_user(None, true, "UTC");
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 14, 30, 0).unwrap();

        assert_eq!(due_stamp(&user, now, &HashMap::new()), None);
    }

    #[test]
    fn test_unknown_timezone_skipped() {
        let user = reminder_user(Some("09:30"), true, "Mars/Olympus_Mons");
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 14, 30, 0).unwrap();

        assert_eq!(due_stamp(&user, now, &HashMap::new()), None);
    }

    #[test]
    fn test_same_minute_not_due_twice() {
        let user = reminder_user(Some("09:30"), true, "America/New_York");
        let first_tick = Utc.with_ymd_and_hms(2025, 1, 15, 14, 30, 5).unwrap();
        let second_tick = Utc.with_ymd_and_hms(2025, 1, 15, 14, 30, 45).unwrap();

        let mut dispatched = HashMap::new();
        let stamp = due_stamp(&user, first_tick, &dispatched).unwrap();
        dispatched.insert(user.id, stamp);

        assert_eq!(due_stamp(&user, second_tick, &dispatched), None);
    }

    #[test]
    fn test_next_day_is_due_again() {
        let user = reminder_user(Some("09:30"), true, "America/New_York");
        let monday = Utc.with_ymd_and_hms(2025, 1, 15, 14, 30, 0).unwrap();
        let tuesday = Utc.with_ymd_and_hms(2025, 1, 16, 14, 30, 0).unwrap();

        let mut dispatched = HashMap::new();
        let stamp = due_stamp(&user, monday, &dispatched).unwrap();
        dispatched.insert(user.id, stamp);

        let stamp = due_stamp(&user, tuesday, &dispatched).unwrap();
        assert_eq!(stamp, "2025-01-16 09:30");
    }

    #[test]
    fn test_fall_back_repeat_hour_collapses_to_one_send() {
        // 2025-11-02: 01:30 New York time occurs twice, EDT then EST
        let user = reminder_user(Some("01:30"), true, "America/New_York");
        let first_pass = Utc.with_ymd_and_hms(2025, 11, 2, 5, 30, 0).unwrap();
        let second_pass = Utc.with_ymd_and_hms(2025, 11, 2, 6, 30, 0).unwrap();

        let mut dispatched = HashMap::new();
        let stamp = due_stamp(&user, first_pass, &dispatched).unwrap();
        dispatched.insert(user.id, stamp);

        assert_eq!(due_stamp(&user, second_pass, &dispatched), None);
    }

    #[test]
    fn test_spring_forward_day_still_fires() {
        // 2025-03-09: New York clocks jump 02:00 -> 03:00; a 09:30
        // reminder fires at the new EDT offset
        let user = reminder_user(Some("09:30"), true, "America/New_York");
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 13, 30, 0).unwrap();

        assert!(due_stamp(&user, now, &HashMap::new()).is_some());
    }

    #[test]
    fn test_stored_time_compares_against_padded_minute() {
        // Stored times are normalized to zero-padded form on write, so
        // an unpadded stored value never matches
        let user = reminder_user(Some("9:30"), true, "UTC");
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 9, 30, 0).unwrap();

        assert_eq!(due_stamp(&user, now, &HashMap::new()), None);
    }
}
