/// Notifier abstraction for reminder delivery
///
/// The scheduler hands each due user's composed summary to a
/// [`Notifier`], which owns the delivery channel. Production runs use
/// [`EmailNotifier`] over the shared mail relay client; tests swap in
/// [`MockNotifier`] to record dispatches and simulate failures.
///
/// # Example
///
/// ```no_run
/// use marketbrief_worker::notifier::{MockNotifier, Notifier};
/// use marketbrief_shared::summary::SummaryRow;
///
/// # async fn example(rows: Vec<SummaryRow>) -> Result<(), Box<dyn std::error::Error>> {
/// let notifier = MockNotifier::new();
/// notifier.send("user@example.com", &rows).await?;
/// assert_eq!(notifier.sent_count(), 1);
/// # Ok(())
/// # }
/// ```

pub mod email;
pub mod mock;

use async_trait::async_trait;
use marketbrief_shared::mailer::MailerError;
use marketbrief_shared::summary::SummaryRow;

pub use email::EmailNotifier;
pub use mock::MockNotifier;

/// Notifier error type
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The delivery channel rejected or failed to deliver the message
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// The delivery channel is unreachable
    #[error("Notifier unavailable: {0}")]
    Unavailable(String),
}

impl From<MailerError> for NotifyError {
    fn from(err: MailerError) -> Self {
        match err {
            MailerError::Timeout => NotifyError::Unavailable("mail relay timed out".to_string()),
            MailerError::Transport(detail) => NotifyError::Unavailable(detail),
            MailerError::Rejected { status } => {
                NotifyError::Delivery(format!("mail relay answered {}", status))
            }
        }
    }
}

/// Delivery channel for daily portfolio summaries
///
/// Implementations must be safe to call concurrently and should do
/// their own transport-level retrying if any; the scheduler treats a
/// returned error as "this user's reminder did not go out" and moves
/// on to the next user.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns the notifier name, used in logs
    fn name(&self) -> &str;

    /// Delivers one summary digest to a recipient
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the digest could not be delivered.
    async fn send(&self, recipient: &str, rows: &[SummaryRow]) -> Result<(), NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mailer_errors_map_to_notify_errors() {
        let err = NotifyError::from(MailerError::Timeout);
        assert!(matches!(err, NotifyError::Unavailable(_)));

        let err = NotifyError::from(MailerError::Rejected { status: 502 });
        assert!(matches!(err, NotifyError::Delivery(_)));
        assert_eq!(err.to_string(), "Delivery failed: mail relay answered 502");
    }
}
