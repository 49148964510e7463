//! The `MailSettings` record and the keys it is stored under.

use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Configuration store keys. The flat namespace is shared with the host, so
/// these names are part of the external interface.
pub mod keys {
    pub const SENDER_EMAIL: &str = "sender_email";
    pub const SENDER_NAME: &str = "sender_name";
    pub const EMAIL_FORMAT: &str = "email_format";
    pub const USE_SMTP: &str = "use_smtp";
    pub const SMTP_HOST: &str = "smtp_host";
    pub const SMTP_PORT: &str = "smtp_port";
    pub const SMTP_USERNAME: &str = "smtp_username";
    pub const SMTP_PASSWORD: &str = "smtp_password";
    pub const SMTP_ENCRYPTION: &str = "smtp_encryption";
    pub const SMTP_DEBUG: &str = "smtp_debug";

    /// Every key OwnOmail ever writes
    pub const ALL: [&str; 10] = [
        SENDER_EMAIL,
        SENDER_NAME,
        EMAIL_FORMAT,
        USE_SMTP,
        SMTP_HOST,
        SMTP_PORT,
        SMTP_USERNAME,
        SMTP_PASSWORD,
        SMTP_ENCRYPTION,
        SMTP_DEBUG,
    ];
}

pub mod defaults {
    pub const SENDER_EMAIL: &str = "email@ownomail.com";
    pub const SENDER_NAME: &str = "OwnOmail Sender";
    pub const SMTP_PORT: u16 = 587;
}

/// Longest sender name, in Unicode code points
pub const MAX_SENDER_NAME_CHARS: usize = 50;

/// Body format of mail composed by OwnOmail itself
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailFormat {
    #[default]
    Html,
    Text,
}

impl EmailFormat {
    /// Only the exact token `text` selects plain text
    #[must_use]
    pub fn sanitize(raw: &str) -> Self {
        if raw == "text" { Self::Text } else { Self::Html }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Text => "text",
        }
    }
}

impl Display for EmailFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relay encryption mode. `Ssl` is implicit TLS, `Tls` is STARTTLS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encryption {
    #[default]
    Ssl,
    Tls,
}

impl Encryption {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ssl => "ssl",
            Self::Tls => "tls",
        }
    }
}

impl FromStr for Encryption {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ssl" => Ok(Self::Ssl),
            "tls" => Ok(Self::Tls),
            other => Err(ValidationError::InvalidEncryption(other.to_string())),
        }
    }
}

impl Display for Encryption {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a truncated sender name is written back on save, or only
/// truncated when read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NameTruncation {
    #[default]
    OnSave,
    OnRead,
}

/// Snapshot of every stored setting, with defaults filled in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailSettings {
    pub sender_email: String,
    pub sender_name: String,
    pub email_format: EmailFormat,
    pub use_smtp: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    // Stored and shown in plaintext.
    pub smtp_password: String,
    pub smtp_encryption: Encryption,
    pub smtp_debug: bool,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            sender_email: defaults::SENDER_EMAIL.to_string(),
            sender_name: defaults::SENDER_NAME.to_string(),
            email_format: EmailFormat::Html,
            use_smtp: true,
            smtp_host: String::new(),
            smtp_port: defaults::SMTP_PORT,
            smtp_username: String::new(),
            smtp_password: String::new(),
            smtp_encryption: Encryption::Ssl,
            smtp_debug: false,
        }
    }
}

/// Clean a single-line text field: control characters other than line
/// breaks and tabs are removed, whitespace runs (CR/LF included) collapse to
/// one space, ends are trimmed.
#[must_use]
pub fn sanitize_text_field(raw: &str) -> String {
    raw.chars()
        .filter(|ch| ch.is_whitespace() || !ch.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Clean an email field: surrounding whitespace and any control or
/// whitespace characters inside are dropped.
#[must_use]
pub fn sanitize_email(raw: &str) -> String {
    raw.chars()
        .filter(|ch| !ch.is_whitespace() && !ch.is_control())
        .collect()
}

/// Truncate to at most `max` code points
#[must_use]
pub fn truncate_chars(value: &str, max: usize) -> &str {
    value
        .char_indices()
        .nth(max)
        .map_or(value, |(idx, _)| &value[..idx])
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_email_format_sanitize() {
        assert_eq!(EmailFormat::sanitize("text"), EmailFormat::Text);
        assert_eq!(EmailFormat::sanitize("html"), EmailFormat::Html);
        assert_eq!(EmailFormat::sanitize("TEXT"), EmailFormat::Html);
        assert_eq!(EmailFormat::sanitize(""), EmailFormat::Html);
    }

    #[test]
    fn test_encryption_parse() {
        assert_eq!("ssl".parse::<Encryption>(), Ok(Encryption::Ssl));
        assert_eq!("tls".parse::<Encryption>(), Ok(Encryption::Tls));
        assert_eq!(
            "xyz".parse::<Encryption>(),
            Err(ValidationError::InvalidEncryption("xyz".to_string()))
        );
    }

    #[test]
    fn test_sanitize_text_field() {
        assert_eq!(sanitize_text_field("  Jane \r\n Doe\t"), "Jane Doe");
        assert_eq!(sanitize_text_field("Evil\r\nBcc: x@y.z"), "Evil Bcc: x@y.z");
        assert_eq!(sanitize_text_field("\u{7}"), "");
        assert_eq!(sanitize_text_field("Ac\u{7}me\u{0}"), "Acme");
    }

    #[test]
    fn test_sanitize_email() {
        assert_eq!(sanitize_email(" user@example.com\n"), "user@example.com");
    }

    #[test]
    fn test_truncate_chars_counts_code_points() {
        assert_eq!(truncate_chars("abc", 5), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("ééééé", 2), "éé");
        assert_eq!(truncate_chars(&"A".repeat(60), 50).chars().count(), 50);
    }

    #[test]
    fn test_default_settings() {
        let settings = MailSettings::default();
        assert_eq!(settings.sender_email, "email@ownomail.com");
        assert_eq!(settings.sender_name, "OwnOmail Sender");
        assert_eq!(settings.smtp_port, 587);
        assert!(settings.use_smtp);
        assert!(settings.smtp_host.is_empty());
    }

    #[test]
    fn test_all_keys_distinct() {
        let mut all = keys::ALL.to_vec();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), keys::ALL.len());
    }
}
