//! Outgoing email.
//!
//! Workflows only see the [`Mailer`] trait. Delivery is best-effort: callers log a
//! failed send and carry on, so a mail outage never fails a registration or reset.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::MailConfig;
use templates::Email;

mod smtp;
pub mod templates;

pub use smtp::SmtpMailer;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()>;
}

/// Used when no SMTP host is configured; writes the message to the log instead.
#[derive(Clone, Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        info!(to = %to, subject = %subject, bytes = html.len(), "mail not sent (no SMTP configured)");
        Ok(())
    }
}

/// Sends `email`, logging instead of returning a failure.
pub async fn deliver(mailer: &dyn Mailer, to: &str, email: Email) {
    if let Err(e) = mailer.send(to, &email.subject, &email.html).await {
        warn!(error = %e, to = %to, subject = %email.subject, "mail delivery failed");
    }
}

pub fn build_mailer(cfg: &MailConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    match &cfg.smtp {
        Some(smtp) => {
            info!(host = %smtp.host, port = smtp.port, "using SMTP mailer");
            Ok(Arc::new(SmtpMailer::new(smtp, &cfg.from)?) as Arc<dyn Mailer>)
        }
        None => Ok(Arc::new(LogMailer) as Arc<dyn Mailer>),
    }
}
