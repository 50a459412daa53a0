//! # MarketBrief Worker Library
//!
//! Dispatch loop for the daily portfolio summary emails. The scheduler
//! walks the reminder-enabled user directory once per tick, converts the
//! shared tick instant into each user's local minute, and hands due
//! digests to a notifier.
//!
//! ## Modules
//!
//! - `config`: environment-driven worker configuration
//! - `notifier`: delivery channel trait, email and mock implementations
//! - `scheduler`: the reminder dispatch loop
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use marketbrief_worker::notifier::MockNotifier;
//! use marketbrief_worker::scheduler::ReminderScheduler;
//! use sqlx::PgPool;
//!
//! # async fn example(pool: PgPool) -> anyhow::Result<()> {
//! let scheduler = ReminderScheduler::new(pool, Arc::new(MockNotifier::new()));
//! scheduler.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod notifier;
pub mod scheduler;
