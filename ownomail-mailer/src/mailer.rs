use std::sync::Arc;

use ownomail_common::{EmailFormat, Resolved};
use ownomail_store::ConfigStore;

use crate::{
    identity::{IdentityResolver, SenderIdentity},
    sender::{MailSender, OutgoingMessage, SendError},
    transport::{TransportConfig, TransportConfigurator},
};

/// Everything the host needs to put a message on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedMail {
    pub identity: SenderIdentity,
    pub transport: TransportConfig,
}

/// The hooks the host calls on each send: sender identity, then transport
#[derive(Debug, Clone)]
pub struct Mailer {
    identity: IdentityResolver,
    transport: TransportConfigurator,
}

impl Mailer {
    #[must_use]
    pub fn new(store: Arc<dyn ConfigStore>, transport: TransportConfigurator) -> Self {
        Self {
            identity: IdentityResolver::new(store),
            transport,
        }
    }

    #[must_use]
    pub const fn identity(&self) -> &IdentityResolver {
        &self.identity
    }

    #[must_use]
    pub const fn transport(&self) -> &TransportConfigurator {
        &self.transport
    }

    /// Resolve identity and transport for one send
    pub async fn prepare(&self) -> Resolved<PreparedMail> {
        let (identity, mut notices) = self.identity.resolve().into_parts();
        let (transport, transport_notices) = self.transport.resolve().await.into_parts();
        notices.extend(transport_notices);

        Resolved::new(PreparedMail { identity, transport }, notices)
    }

    /// Resolve, then hand one message to `sender`. Notices from resolution
    /// come back even when delivery fails.
    pub async fn send(
        &self,
        sender: &dyn MailSender,
        to: &str,
        subject: &str,
        body: String,
        format: EmailFormat,
    ) -> Resolved<Result<(), SendError>> {
        let (prepared, notices) = self.prepare().await.into_parts();

        let message = OutgoingMessage {
            from: prepared.identity,
            to: to.to_string(),
            subject: subject.to_string(),
            body,
            format,
        };

        Resolved::new(sender.send(&prepared.transport, &message).await, notices)
    }
}
