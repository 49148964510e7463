//! Shared building blocks for OwnOmail: the settings model, validation,
//! notices and logging.

pub mod address_parser;
pub mod error;
pub mod logging;
pub mod notice;
pub mod settings;

pub use tracing;

pub use address_parser::{AddressError, Mailbox};
pub use error::ValidationError;
pub use notice::{Notice, NoticeCode, Resolved, Severity};
pub use settings::{EmailFormat, Encryption, MailSettings, NameTruncation, keys};
