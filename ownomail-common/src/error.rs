//! Validation errors shared by the resolvers and the settings shell.
//!
//! These are always recovered from locally. Each one maps to the advisory
//! [`Notice`] that tells the user which fallback was applied.

use thiserror::Error;

use crate::{
    address_parser::AddressError,
    notice::{Notice, NoticeCode},
    settings::MAX_SENDER_NAME_CHARS,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("The sender email cannot be empty")]
    EmptyEmail,

    #[error("The email format is invalid: {0}")]
    InvalidEmail(#[from] AddressError),

    #[error("The sender name cannot be empty")]
    EmptyName,

    #[error("The sender name has {0} characters, more than {MAX_SENDER_NAME_CHARS}")]
    NameTooLong(usize),

    #[error("Invalid SMTP host: {0}")]
    InvalidHostname(String),

    #[error("Invalid SMTP port {0:?}: must be between 1 and 65535")]
    InvalidPort(String),

    #[error("Invalid SMTP encryption {0:?}: expected ssl or tls")]
    InvalidEncryption(String),
}

impl ValidationError {
    #[must_use]
    pub const fn code(&self) -> NoticeCode {
        match self {
            Self::EmptyEmail => NoticeCode::EmptyEmail,
            Self::InvalidEmail(_) => NoticeCode::InvalidEmail,
            Self::EmptyName => NoticeCode::EmptyName,
            Self::NameTooLong(_) => NoticeCode::NameTooLong,
            Self::InvalidHostname(_) => NoticeCode::InvalidSmtpHost,
            Self::InvalidPort(_) => NoticeCode::InvalidSmtpPort,
            Self::InvalidEncryption(_) => NoticeCode::InvalidEncryption,
        }
    }

    /// The notice reporting this error, worded for the fallback that applies
    /// when the offending value is discarded.
    #[must_use]
    pub fn notice(&self) -> Notice {
        match self {
            Self::EmptyEmail => Notice::error(self.code(), "Error: The sender email cannot be empty."),
            Self::InvalidEmail(_) => Notice::warning(
                self.code(),
                "Warning: The email format is invalid. Using previous value.",
            ),
            Self::EmptyName => Notice::error(self.code(), "Error: The sender name cannot be empty."),
            Self::NameTooLong(_) => Notice::warning(
                self.code(),
                format!(
                    "Warning: The sender name exceeded {MAX_SENDER_NAME_CHARS} characters. It was truncated."
                ),
            ),
            Self::InvalidHostname(_) | Self::InvalidPort(_) => {
                Notice::error(self.code(), format!("Error: {self}."))
            }
            Self::InvalidEncryption(_) => Notice::warning(
                self.code(),
                format!("Warning: {self}. Falling back to ssl."),
            ),
        }
    }
}

impl From<ValidationError> for Notice {
    fn from(err: ValidationError) -> Self {
        err.notice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::Severity;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::InvalidPort("70000".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid SMTP port \"70000\": must be between 1 and 65535"
        );

        let err = ValidationError::from(AddressError::MissingAtSign);
        assert_eq!(
            err.to_string(),
            "The email format is invalid: Missing '@' separator in mailbox"
        );
    }

    #[test]
    fn test_notice_mapping() {
        let notice = ValidationError::NameTooLong(60).notice();
        assert_eq!(notice.code, NoticeCode::NameTooLong);
        assert_eq!(notice.severity, Severity::Warning);

        let notice = Notice::from(ValidationError::EmptyEmail);
        assert_eq!(notice.code, NoticeCode::EmptyEmail);
        assert_eq!(notice.severity, Severity::Error);

        let notice = ValidationError::InvalidEncryption("xyz".to_string()).notice();
        assert!(notice.message.contains("Falling back to ssl"));
    }
}
