//! Delivery of mail that OwnOmail composes itself

use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;
use lettre::{
    Address, AsyncSendmailTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp,
};
use ownomail_common::{EmailFormat, Encryption, internal};
use thiserror::Error;

use crate::{
    identity::SenderIdentity,
    transport::{DETAILED_VERBOSITY, RelaySettings, TransportConfig},
};

#[derive(Debug, Error)]
pub enum SendError {
    #[error("Invalid address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        source: lettre::address::AddressError,
    },

    #[error("Failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] smtp::Error),

    #[error("Local mail delivery failed: {0}")]
    Sendmail(#[from] lettre::transport::sendmail::Error),
}

/// A single message addressed to one recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub from: SenderIdentity,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub format: EmailFormat,
}

impl OutgoingMessage {
    fn to_lettre(&self) -> Result<Message, SendError> {
        let address = |raw: &str| {
            raw.parse::<Address>().map_err(|source| SendError::InvalidAddress {
                address: raw.to_string(),
                source,
            })
        };

        let content_type = match self.format {
            EmailFormat::Html => ContentType::TEXT_HTML,
            EmailFormat::Text => ContentType::TEXT_PLAIN,
        };

        Ok(Message::builder()
            .from(Mailbox::new(
                Some(self.from.name.clone()),
                address(&self.from.email)?,
            ))
            .to(Mailbox::new(None, address(&self.to)?))
            .subject(self.subject.clone())
            .header(content_type)
            .body(self.body.clone())?)
    }
}

/// Hands a composed message to the configured transport
#[async_trait]
pub trait MailSender: Send + Sync {
    /// # Errors
    /// Returns an error if the message cannot be built or is rejected by the
    /// transport.
    async fn send(&self, transport: &TransportConfig, message: &OutgoingMessage) -> Result<(), SendError>;
}

/// [`MailSender`] backed by lettre
#[derive(Debug, Clone)]
pub struct LettreSender {
    timeout: Duration,
    sendmail_command: Option<PathBuf>,
}

impl Default for LettreSender {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            sendmail_command: None,
        }
    }
}

impl LettreSender {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use this command for local delivery instead of `sendmail` on `PATH`
    #[must_use]
    pub fn with_sendmail_command(mut self, command: impl Into<PathBuf>) -> Self {
        self.sendmail_command = Some(command.into());
        self
    }

    fn relay_transport(&self, relay: &RelaySettings) -> Result<AsyncSmtpTransport<Tokio1Executor>, SendError> {
        let builder = match relay.encryption {
            Some(Encryption::Ssl) => AsyncSmtpTransport::<Tokio1Executor>::relay(&relay.host)?,
            Some(Encryption::Tls) => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&relay.host)?,
            None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&relay.host),
        };

        let builder = builder.port(relay.port).timeout(Some(self.timeout));
        let builder = match &relay.auth {
            Some(auth) => builder.credentials(smtp::authentication::Credentials::new(
                auth.username.clone(),
                auth.password.clone(),
            )),
            None => builder,
        };

        Ok(builder.build())
    }

    async fn send_relay(&self, relay: &RelaySettings, message: Message) -> Result<(), SendError> {
        // 1 logs failed sessions, 2 adds the envelope and the server's reply
        let verbosity = relay.diagnostics.verbosity();
        if verbosity >= DETAILED_VERBOSITY {
            let envelope = message.envelope();
            tracing::error!(
                target: "ownomail::smtp",
                host = %relay.host,
                port = relay.port,
                encryption = ?relay.encryption,
                auth = relay.auth.as_ref().map(|auth| auth.username.as_str()),
                from = ?envelope.from(),
                to = ?envelope.to(),
                "Opening SMTP session"
            );
        }

        let result = self.relay_transport(relay)?.send(message).await;

        match &result {
            Ok(response) if verbosity >= DETAILED_VERBOSITY => tracing::error!(
                target: "ownomail::smtp",
                code = %response.code(),
                reply = ?response.message().collect::<Vec<_>>(),
                "SMTP session finished"
            ),
            Err(err) if verbosity > 0 => tracing::error!(
                target: "ownomail::smtp",
                host = %relay.host,
                port = relay.port,
                error = %err,
                "SMTP session failed"
            ),
            _ => {}
        }

        result?;
        Ok(())
    }

    async fn send_local(&self, message: Message) -> Result<(), SendError> {
        let transport = match &self.sendmail_command {
            Some(command) => AsyncSendmailTransport::<Tokio1Executor>::new_with_command(command.as_os_str()),
            None => AsyncSendmailTransport::<Tokio1Executor>::new(),
        };

        transport.send(message).await?;
        Ok(())
    }
}

#[async_trait]
impl MailSender for LettreSender {
    async fn send(&self, transport: &TransportConfig, message: &OutgoingMessage) -> Result<(), SendError> {
        let email = message.to_lettre()?;

        internal!(
            level = DEBUG,
            to = %message.to,
            relay = transport.is_relay(),
            "Sending message"
        );

        match transport {
            TransportConfig::Relay(relay) => self.send_relay(relay, email).await,
            TransportConfig::Local => self.send_local(email).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::transport::Diagnostics;

    fn message(to: &str, format: EmailFormat) -> OutgoingMessage {
        OutgoingMessage {
            from: SenderIdentity {
                email: "noreply@example.com".to_string(),
                name: "Acme Support".to_string(),
            },
            to: to.to_string(),
            subject: "Hello".to_string(),
            body: "<p>Hello</p>".to_string(),
            format,
        }
    }

    #[test]
    fn test_builds_html_message() {
        let email = message("admin@example.com", EmailFormat::Html)
            .to_lettre()
            .unwrap();
        let formatted = String::from_utf8(email.formatted()).unwrap();

        assert!(formatted.contains("Acme Support"));
        assert!(formatted.contains("<noreply@example.com>"));
        assert!(formatted.contains("admin@example.com"));
        assert!(formatted.contains("Subject: Hello"));
        assert!(formatted.contains("Content-Type: text/html; charset=utf-8"));
    }

    #[test]
    fn test_builds_text_message() {
        let email = message("admin@example.com", EmailFormat::Text)
            .to_lettre()
            .unwrap();
        let formatted = String::from_utf8(email.formatted()).unwrap();

        assert!(formatted.contains("Content-Type: text/plain; charset=utf-8"));
    }

    #[test]
    fn test_rejects_bad_recipient() {
        let err = message("not-an-address", EmailFormat::Html)
            .to_lettre()
            .unwrap_err();

        assert!(matches!(err, SendError::InvalidAddress { ref address, .. } if address == "not-an-address"));
    }

    #[tokio::test]
    async fn test_unreachable_relay_fails() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let transport = TransportConfig::Relay(RelaySettings {
            host: "127.0.0.1".to_string(),
            port,
            auth: None,
            encryption: None,
            diagnostics: Diagnostics::ErrorLog { verbosity: 2 },
        });

        let sender = LettreSender::new().with_timeout(Duration::from_secs(2));
        let result = sender
            .send(&transport, &message("admin@example.com", EmailFormat::Text))
            .await;

        assert!(matches!(result, Err(SendError::Smtp(_))));
    }
}
