//! # MarketBrief Shared Library
//!
//! This crate contains shared types, utilities, and business logic used across
//! the MarketBrief API server and reminder worker.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Authentication utilities (password hashing, JWT tokens)
//! - `db`: Connection pooling and migrations
//! - `quotes`: Quote provider client
//! - `summary`: Portfolio summary composition
//! - `reminders`: Reminder time and timezone handling
//! - `mailer`: Outbound email via the mail relay

pub mod auth;
pub mod db;
pub mod mailer;
pub mod models;
pub mod quotes;
pub mod reminders;
pub mod summary;

/// Current version of the MarketBrief shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
