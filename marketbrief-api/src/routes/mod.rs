/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, token refresh, and the email-token flows
/// - `stocks`: Catalog search
/// - `portfolio`: Tracked symbols, cache refresh, and the composed summary
/// - `account`: Profile, provider key rotation, reminder settings, deletion

use serde::{Deserialize, Serialize};

pub mod account;
pub mod auth;
pub mod health;
pub mod portfolio;
pub mod stocks;

/// Plain acknowledgement body used by endpoints whose real effect is a
/// state change or an email, not a resource
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable outcome description
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
