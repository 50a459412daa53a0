/// Mock notifier for testing
///
/// Records every dispatch instead of sending mail, and can be armed to
/// fail for specific recipients to exercise the scheduler's per-user
/// error isolation.
///
/// # Example
///
/// ```
/// use marketbrief_worker::notifier::{MockNotifier, Notifier};
///
/// # async fn example() {
/// let notifier = MockNotifier::new();
/// notifier.arm_failure("broken@example.com");
///
/// assert!(notifier.send("broken@example.com", &[]).await.is_err());
/// assert!(notifier.send("fine@example.com", &[]).await.is_ok());
/// assert_eq!(notifier.recipients(), vec!["fine@example.com"]);
/// # }
/// ```

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use marketbrief_shared::summary::SummaryRow;

use super::{Notifier, NotifyError};

/// A single recorded dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedDispatch {
    /// Recipient address
    pub recipient: String,

    /// Number of summary rows in the digest
    pub row_count: usize,
}

/// Notifier that records dispatches in memory
#[derive(Debug, Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<RecordedDispatch>>,
    failing: Mutex<HashSet<String>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        MockNotifier::default()
    }

    /// Makes future sends to this recipient fail
    pub fn arm_failure(&self, recipient: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert(recipient.to_string());
    }

    /// Returns every recorded dispatch, in send order
    pub fn dispatches(&self) -> Vec<RecordedDispatch> {
        self.sent.lock().unwrap().clone()
    }

    /// Returns the recipients of every successful send, in send order
    pub fn recipients(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.recipient.clone())
            .collect()
    }

    /// Returns how many sends succeeded
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(&self, recipient: &str, rows: &[SummaryRow]) -> Result<(), NotifyError> {
        if self.failing.lock().unwrap().contains(recipient) {
            return Err(NotifyError::Delivery(format!(
                "armed failure for {}",
                recipient
            )));
        }

        self.sent.lock().unwrap().push(RecordedDispatch {
            recipient: recipient.to_string(),
            row_count: rows.len(),
        });

        Ok(())
    }
}
