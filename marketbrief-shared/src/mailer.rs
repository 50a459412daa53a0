/// Outbound mail client
///
/// Delivers transactional mail (verification, password reset, account
/// deletion) and the daily portfolio digest through an HTTP mail relay:
/// a single authenticated JSON POST per message, with a bounded timeout
/// so a slow relay cannot stall a request handler or the dispatch loop.
/// Templates live here so the API and the worker send identical mail.

use serde::Serialize;
use std::time::Duration;
use tracing::info;

use crate::summary::SummaryRow;

const DEFAULT_TIMEOUT_SECONDS: u64 = 15;

/// Error type for mail delivery
#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    /// The relay did not answer within the timeout
    #[error("Mail relay timed out")]
    Timeout,

    /// The request never completed (DNS, connect, TLS)
    #[error("Mail relay transport error: {0}")]
    Transport(String),

    /// The relay answered with a non-success status
    #[error("Mail relay rejected the message: HTTP {status}")]
    Rejected { status: u16 },
}

/// Mail relay settings
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// Relay endpoint accepting message POSTs
    pub relay_url: String,
    /// Bearer token for the relay
    pub relay_token: String,
    /// From address stamped on every message
    pub from_address: String,
    /// Base URL of the web frontend, used to build links in mail bodies
    pub frontend_url: String,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

impl MailerConfig {
    pub fn new(
        relay_url: impl Into<String>,
        relay_token: impl Into<String>,
        from_address: impl Into<String>,
        frontend_url: impl Into<String>,
    ) -> Self {
        Self {
            relay_url: relay_url.into(),
            relay_token: relay_token.into(),
            from_address: from_address.into(),
            frontend_url: frontend_url.into(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// HTTP mail relay client
#[derive(Debug, Clone)]
pub struct Mailer {
    client: reqwest::Client,
    config: MailerConfig,
}

impl Mailer {
    pub fn new(config: MailerConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client, config }
    }

    /// Delivers one HTML message through the relay
    ///
    /// # Errors
    ///
    /// Returns [`MailerError`] on timeout, transport failure, or a
    /// non-success relay status.
    pub async fn send(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), MailerError> {
        let message = OutboundMessage {
            from: &self.config.from_address,
            to: recipient,
            subject,
            html: html_body,
        };

        let response = self
            .client
            .post(&self.config.relay_url)
            .bearer_auth(&self.config.relay_token)
            .json(&message)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MailerError::Timeout
                } else {
                    MailerError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MailerError::Rejected {
                status: status.as_u16(),
            });
        }

        info!(recipient = %recipient, subject = %subject, "Email dispatched");
        Ok(())
    }

    /// Sends the email-verification message for a fresh registration
    pub async fn send_verification_email(
        &self,
        recipient: &str,
        token: &str,
    ) -> Result<(), MailerError> {
        let link = self.frontend_link(&format!("/email-verified?token={}", token));
        let html = format!(
            "<h3>Verify your email</h3>\
             <p>Click the link below to verify your email address:</p>\
             <a href=\"{link}\" style=\"color:#0070f3;\">Verify Email</a>"
        );

        self.send(recipient, "Please verify your email", &html).await
    }

    /// Sends the password-reset message (link valid for one hour)
    pub async fn send_password_reset_email(
        &self,
        recipient: &str,
        token: &str,
    ) -> Result<(), MailerError> {
        let link = self.frontend_link(&format!("/reset-password?token={}", token));
        let html = format!(
            "<h3>Reset your password</h3>\
             <p>Click the link below to reset your password:</p>\
             <a href=\"{link}\" style=\"color:#0070f3;\">Reset Password</a>\
             <p>This link will expire in 1 hour.</p>"
        );

        self.send(recipient, "Reset your password", &html).await
    }

    /// Sends the account-deletion confirmation (link valid for 30 minutes)
    pub async fn send_account_deletion_email(
        &self,
        recipient: &str,
        token: &str,
    ) -> Result<(), MailerError> {
        let link = self.frontend_link(&format!("/confirm-account-deletion?token={}", token));
        let html = format!(
            "<h3>⚠️ Account Deletion Confirmation</h3>\
             <p>You have requested to delete your account. This action is \
             <strong>PERMANENT</strong> and cannot be undone.</p>\
             <p>Click the link below to permanently delete your account:</p>\
             <a href=\"{link}\" style=\"color:#dc3545; font-weight: bold;\">\
             DELETE MY ACCOUNT PERMANENTLY</a>\
             <p><strong>This link will expire in 30 minutes.</strong></p>\
             <p>If you did not request this deletion, please ignore this email.</p>"
        );

        self.send(recipient, "🚨 Confirm Account Deletion", &html).await
    }

    /// Sends the daily portfolio digest
    ///
    /// Callers are expected to skip users with empty portfolios; this
    /// renders whatever rows it is given.
    pub async fn send_daily_summary_email(
        &self,
        recipient: &str,
        rows: &[SummaryRow],
    ) -> Result<(), MailerError> {
        let html = render_digest_html(rows);
        self.send(recipient, "📊 Daily Stock Portfolio Summary", &html)
            .await
    }

    fn frontend_link(&self, path_and_query: &str) -> String {
        format!(
            "{}{}",
            self.config.frontend_url.trim_end_matches('/'),
            path_and_query
        )
    }
}

/// Renders the digest table from composed summary rows
///
/// Change columns are colored green for gains, red when the provider's
/// change-percent string is negative, and gray for "N/A" rows.
fn render_digest_html(rows: &[SummaryRow]) -> String {
    let mut html = String::with_capacity(1024 + rows.len() * 512);

    html.push_str("<h3>📈 Daily Stock Portfolio Summary</h3>");
    html.push_str("<p>Here's your comprehensive daily portfolio update:</p>");
    html.push_str(
        "<table border='1' cellpadding='8' cellspacing='0' \
         style='border-collapse: collapse; width: 100%; font-size: 14px;'>",
    );
    html.push_str(
        "<tr style='background-color: #f2f2f2;'>\
         <th>Ticker</th><th>Company</th><th>Current Price</th>\
         <th>Change ($)</th><th>Change (%)</th><th>Open</th><th>High</th>\
         <th>Low</th><th>Volume</th><th>Previous Close</th><th>Trading Day</th>\
         </tr>",
    );

    for row in rows {
        let color = change_color(&row.change_percent);
        html.push_str(&format!(
            "<tr>\
             <td><strong>{}</strong></td>\
             <td>{}</td>\
             <td><strong>{}</strong></td>\
             <td style='color: {color}; font-weight: bold;'>{}</td>\
             <td style='color: {color}; font-weight: bold;'>{}</td>\
             <td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             </tr>",
            row.ticker,
            row.name,
            row.price,
            row.change,
            row.change_percent,
            row.open,
            row.high,
            row.low,
            row.volume,
            row.previous_close,
            row.latest_trading_day,
        ));
    }

    html.push_str("</table>");
    html.push_str(
        "<br><p><small>📅 Data may be delayed. For real-time quotes, \
         please visit your portfolio dashboard.</small></p>",
    );
    html.push_str(
        "<br><p style='color: #666;'><small>This is an automated daily \
         summary email. You can modify your email preferences in your \
         account settings.</small></p>",
    );

    html
}

fn change_color(change_percent: &str) -> &'static str {
    if change_percent == "N/A" {
        "gray"
    } else if change_percent.starts_with('-') {
        "red"
    } else {
        "green"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_mailer() -> Mailer {
        Mailer::new(MailerConfig::new(
            "https://relay.test/send",
            "relay-token",
            "digest@marketbrief.test",
            "https://app.marketbrief.test/",
        ))
    }

    fn row(ticker: &str, change_percent: &str) -> SummaryRow {
        SummaryRow {
            ticker: ticker.to_string(),
            name: "Test Co".to_string(),
            price: "$10.00".to_string(),
            change: "$0.10".to_string(),
            change_percent: change_percent.to_string(),
            open: "$9.90".to_string(),
            high: "$10.10".to_string(),
            low: "$9.80".to_string(),
            volume: "1,000".to_string(),
            previous_close: "$9.90".to_string(),
            latest_trading_day: "2025-01-10".to_string(),
        }
    }

    #[test]
    fn test_frontend_link_strips_trailing_slash() {
        let mailer = test_mailer();
        assert_eq!(
            mailer.frontend_link("/email-verified?token=abc"),
            "https://app.marketbrief.test/email-verified?token=abc"
        );
    }

    #[test]
    fn test_digest_contains_all_column_headers() {
        let html = render_digest_html(&[row("AAPL", "1.03%")]);

        for header in [
            "Ticker",
            "Company",
            "Current Price",
            "Change ($)",
            "Change (%)",
            "Open",
            "High",
            "Low",
            "Volume",
            "Previous Close",
            "Trading Day",
        ] {
            assert!(html.contains(&format!("<th>{}</th>", header)));
        }
    }

    #[test]
    fn test_digest_colors_gain_green() {
        let html = render_digest_html(&[row("AAPL", "1.03%")]);
        assert!(html.contains("color: green"));
        assert!(!html.contains("color: red"));
    }

    #[test]
    fn test_digest_colors_loss_red() {
        let html = render_digest_html(&[row("TSLA", "-2.50%")]);
        assert!(html.contains("color: red"));
    }

    #[test]
    fn test_digest_colors_unavailable_gray() {
        let html = render_digest_html(&[row("MSFT", "N/A")]);
        assert!(html.contains("color: gray"));
    }

    #[test]
    fn test_digest_renders_one_row_per_summary_row() {
        let html = render_digest_html(&[row("AAPL", "1.0%"), row("TSLA", "-1.0%")]);
        assert!(html.contains("<strong>AAPL</strong>"));
        assert!(html.contains("<strong>TSLA</strong>"));
        assert_eq!(html.matches("<strong>$10.00</strong>").count(), 2);
    }

    #[test]
    fn test_empty_rows_still_render_table_shell() {
        let html = render_digest_html(&[]);
        assert!(html.contains("<table"));
        assert!(html.contains("Daily Stock Portfolio Summary"));
    }
}
