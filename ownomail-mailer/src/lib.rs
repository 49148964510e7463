//! The mail path of OwnOmail: who a message is from and how it leaves.

pub mod identity;
pub mod mailer;
pub mod sender;
pub mod transport;

pub use identity::{IdentityResolver, SenderIdentity, validate_sender_email, validate_sender_name};
pub use mailer::{Mailer, PreparedMail};
pub use sender::{LettreSender, MailSender, OutgoingMessage, SendError};
pub use transport::{
    CandidateSource, Credentials, DetectionMethod, Diagnostics, EnvironmentHints, EnvironmentProbe, ExplicitSmtp,
    RelayCandidate, RelaySettings, TransportConfig, TransportConfigurator, TransportStrategy,
    TransportStrategyConfig,
};
