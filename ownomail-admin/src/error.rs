use ownomail_common::{Notice, NoticeCode};
use ownomail_store::StoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdminError>;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Missing or invalid form token for {action}")]
    InvalidNonce { action: &'static str },

    #[error("{login} lacks the {capability} capability")]
    InsufficientCapability {
        login: String,
        capability: &'static str,
    },

    #[error("Unknown settings action {0:?}")]
    UnknownAction(String),

    #[error("The form token secret cannot be empty")]
    EmptySecret,

    #[error("Invalid form token secret: {0}")]
    InvalidSecret(#[from] hmac::digest::InvalidLength),

    #[error("Option store error: {0}")]
    Store(#[from] StoreError),
}

impl AdminError {
    /// The notice shown on the settings view when a submission stops here
    #[must_use]
    pub fn notice(&self) -> Notice {
        match self {
            Self::InvalidNonce { .. } => Notice::error(
                NoticeCode::InvalidNonce,
                "Error: The form has expired or was not sent from the settings page. Please try again.",
            ),
            Self::InsufficientCapability { .. } => Notice::error(
                NoticeCode::InsufficientCapability,
                "Error: You do not have sufficient permissions to manage OwnOmail settings.",
            ),
            Self::UnknownAction(_) | Self::EmptySecret | Self::InvalidSecret(_) | Self::Store(_) => {
                Notice::error(
                    NoticeCode::SettingsNotSaved,
                    format!("Error: The settings could not be saved. {self}."),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use ownomail_common::Severity;

    use super::*;

    #[test]
    fn test_authorization_notices() {
        let notice = AdminError::InvalidNonce {
            action: "ownomail_save_identity",
        }
        .notice();
        assert_eq!(notice.code, NoticeCode::InvalidNonce);
        assert_eq!(notice.severity, Severity::Error);

        let notice = AdminError::InsufficientCapability {
            login: "editor".to_string(),
            capability: "manage_options",
        }
        .notice();
        assert_eq!(notice.code, NoticeCode::InsufficientCapability);
    }

    #[test]
    fn test_store_error_notice_names_cause() {
        let err = AdminError::from(StoreError::Io(std::io::Error::other("disk full")));
        let notice = err.notice();

        assert_eq!(notice.code, NoticeCode::SettingsNotSaved);
        assert!(notice.message.contains("disk full"));
    }
}
