//! Advisory notices returned alongside resolved values.
//!
//! Nothing in OwnOmail fails hard on bad settings. Every recovery is reported
//! as a [`Notice`] carried next to the value it affected, and the caller decides
//! whether to render, log or drop it.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// How prominently a notice should be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Success,
    Info,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Success => "success",
            Self::Info => "info",
        })
    }
}

/// Stable identifier of a notice, suitable for matching in callers and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeCode {
    EmptyEmail,
    InvalidEmail,
    EmailAccepted,
    EmptyName,
    NameTooLong,
    NameAccepted,
    InvalidSmtpHost,
    InvalidSmtpPort,
    InvalidEncryption,
    RelayDetected,
    NoRelayDetected,
    SettingsSaved,
    SettingsNotSaved,
    InvalidNonce,
    InsufficientCapability,
    TestEmailEmpty,
    TestEmailSuccess,
    TestEmailFailure,
}

impl NoticeCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmptyEmail => "empty_email",
            Self::InvalidEmail => "invalid_email",
            Self::EmailAccepted => "email_accepted",
            Self::EmptyName => "empty_name",
            Self::NameTooLong => "name_too_long",
            Self::NameAccepted => "name_accepted",
            Self::InvalidSmtpHost => "invalid_smtp_host",
            Self::InvalidSmtpPort => "invalid_smtp_port",
            Self::InvalidEncryption => "invalid_encryption",
            Self::RelayDetected => "relay_detected",
            Self::NoRelayDetected => "no_relay_detected",
            Self::SettingsSaved => "settings_saved",
            Self::SettingsNotSaved => "settings_not_saved",
            Self::InvalidNonce => "invalid_nonce",
            Self::InsufficientCapability => "insufficient_capability",
            Self::TestEmailEmpty => "test_email_empty",
            Self::TestEmailSuccess => "test_email_success",
            Self::TestEmailFailure => "test_email_failure",
        }
    }
}

impl Display for NoticeCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `(severity, code, message)` triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub severity: Severity,
    pub code: NoticeCode,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn new(severity: Severity, code: NoticeCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(code: NoticeCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    #[must_use]
    pub fn warning(code: NoticeCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    #[must_use]
    pub fn success(code: NoticeCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Success, code, message)
    }

    #[must_use]
    pub fn info(code: NoticeCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl Display for Notice {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code, self.message)
    }
}

/// A value together with the notices produced while computing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    pub value: T,
    pub notices: Vec<Notice>,
}

impl<T> Resolved<T> {
    #[must_use]
    pub const fn new(value: T, notices: Vec<Notice>) -> Self {
        Self { value, notices }
    }

    #[must_use]
    pub fn with_notice(value: T, notice: Notice) -> Self {
        Self {
            value,
            notices: vec![notice],
        }
    }

    /// Whether a notice with `code` was produced
    #[must_use]
    pub fn has_notice(&self, code: NoticeCode) -> bool {
        self.notices.iter().any(|notice| notice.code == code)
    }

    #[must_use]
    pub fn into_parts(self) -> (T, Vec<Notice>) {
        (self.value, self.notices)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolved<U> {
        Resolved {
            value: f(self.value),
            notices: self.notices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_display() {
        let notice = Notice::warning(NoticeCode::NameTooLong, "truncated");
        assert_eq!(notice.to_string(), "[warning] name_too_long: truncated");
        assert!(!notice.is_error());
        assert!(Notice::error(NoticeCode::EmptyName, "empty").is_error());
    }

    #[test]
    fn test_codes_serialize_as_ids() {
        let notice = Notice::error(NoticeCode::InvalidEmail, "bad");
        let serialized = ron::to_string(&notice).unwrap_or_default();
        assert!(serialized.contains("invalid_email"));
        assert!(serialized.contains("error"));
    }

    #[test]
    fn test_resolved_helpers() {
        let resolved = Resolved::with_notice(3, Notice::info(NoticeCode::NameAccepted, "ok"));
        assert!(resolved.has_notice(NoticeCode::NameAccepted));
        assert!(!resolved.has_notice(NoticeCode::EmptyName));

        let (value, notices) = resolved.map(|v| v * 2).into_parts();
        assert_eq!(value, 6);
        assert_eq!(notices.len(), 1);
    }
}
