use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::debug;

use super::Mailer;
use crate::config::SmtpConfig;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Implicit TLS on 465, STARTTLS on any other port.
    pub fn new(cfg: &SmtpConfig, from: &str) -> anyhow::Result<Self> {
        let builder = if cfg.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
        }
        .with_context(|| format!("smtp relay {}", cfg.host))?
        .port(cfg.port);

        let builder = match (&cfg.username, &cfg.password) {
            (Some(user), Some(pass)) => builder.credentials(Credentials::new(user.clone(), pass.clone())),
            _ => builder,
        };

        let from = from
            .parse::<Mailbox>()
            .with_context(|| format!("invalid MAIL_FROM address {from:?}"))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

fn build_message(from: &Mailbox, to: &str, subject: &str, html: &str) -> anyhow::Result<Message> {
    let to = to
        .parse::<Mailbox>()
        .with_context(|| format!("invalid recipient address {to:?}"))?;
    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(subject)
        .header(ContentType::TEXT_HTML)
        .body(html.to_string())
        .context("build email")
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        let message = build_message(&self.from, to, subject, html)?;
        let response = self.transport.send(message).await.context("smtp send")?;
        debug!(to = %to, code = %response.code(), "mail delivered to relay");
        Ok(())
    }
}
