/// Email notifier
///
/// Delivers the daily digest through the shared mail relay client. The
/// digest subject and HTML table rendering live in the shared mailer so
/// the API's send-now endpoint and the scheduler produce identical mail.

use async_trait::async_trait;
use marketbrief_shared::mailer::Mailer;
use marketbrief_shared::summary::SummaryRow;

use super::{Notifier, NotifyError};

/// Notifier that sends the digest as an HTML email
#[derive(Debug, Clone)]
pub struct EmailNotifier {
    mailer: Mailer,
}

impl EmailNotifier {
    pub fn new(mailer: Mailer) -> Self {
        EmailNotifier { mailer }
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, recipient: &str, rows: &[SummaryRow]) -> Result<(), NotifyError> {
        self.mailer
            .send_daily_summary_email(recipient, rows)
            .await?;
        Ok(())
    }
}
