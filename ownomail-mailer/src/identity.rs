//! Sender identity resolution
//!
//! The host asks for the From address and display name before it composes
//! the headers of any outgoing message. Both answers are computed from the
//! option store on every call and always come back usable: a missing or
//! malformed stored value is replaced by a safe fallback and reported as a
//! [`Notice`].

use std::sync::Arc;

use ownomail_common::{
    Notice, NoticeCode, Resolved, ValidationError, address_parser, keys, resolver,
    settings::{MAX_SENDER_NAME_CHARS, defaults, sanitize_email, sanitize_text_field, truncate_chars},
};
use ownomail_store::{ConfigStore, ConfigStoreExt};
use serde::{Deserialize, Serialize};

/// The From address and display name stamped on outgoing mail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderIdentity {
    pub email: String,
    pub name: String,
}

impl Default for SenderIdentity {
    fn default() -> Self {
        Self {
            email: defaults::SENDER_EMAIL.to_string(),
            name: defaults::SENDER_NAME.to_string(),
        }
    }
}

/// Validate a candidate sender address.
///
/// `fallback` is what the caller had before: the previously stored address
/// when saving a form, the fixed default when reading for a send. An empty
/// candidate always falls back to the fixed default. The returned address
/// always passes [`address_parser::is_email`].
#[must_use]
pub fn validate_sender_email(raw: &str, fallback: &str) -> Resolved<String> {
    let email = sanitize_email(raw);

    if email.is_empty() {
        return Resolved::with_notice(
            defaults::SENDER_EMAIL.to_string(),
            ValidationError::EmptyEmail.notice(),
        );
    }

    match address_parser::parse_sender_address(&email) {
        Ok(_) => Resolved::with_notice(
            email,
            Notice::info(NoticeCode::EmailAccepted, "The sender email was accepted."),
        ),
        Err(err) => {
            let fallback = if address_parser::is_email(fallback) {
                fallback.to_string()
            } else {
                defaults::SENDER_EMAIL.to_string()
            };

            Resolved::with_notice(fallback, ValidationError::from(err).notice())
        }
    }
}

/// Sanitize a candidate sender name and cap it at
/// [`MAX_SENDER_NAME_CHARS`] code points.
#[must_use]
pub fn validate_sender_name(raw: &str) -> Resolved<String> {
    let name = sanitize_text_field(raw);

    if name.is_empty() {
        return Resolved::with_notice(
            defaults::SENDER_NAME.to_string(),
            ValidationError::EmptyName.notice(),
        );
    }

    let length = name.chars().count();
    if length > MAX_SENDER_NAME_CHARS {
        return Resolved::with_notice(
            truncate_chars(&name, MAX_SENDER_NAME_CHARS).to_string(),
            ValidationError::NameTooLong(length).notice(),
        );
    }

    Resolved::with_notice(
        name,
        Notice::info(NoticeCode::NameAccepted, "The sender name was accepted."),
    )
}

/// Reads the sender identity from the option store
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    store: Arc<dyn ConfigStore>,
}

impl IdentityResolver {
    #[must_use]
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }

    /// The From address for outgoing mail.
    ///
    /// The settings shell never persists an invalid address, so a malformed
    /// stored value can only come from outside; it is replaced by the fixed
    /// default.
    pub fn resolve_sender_email(&self) -> Resolved<String> {
        let raw = self
            .store
            .read_site(keys::SENDER_EMAIL)
            .map_or_else(|| defaults::SENDER_EMAIL.to_string(), |value| value.as_text());

        let resolved = validate_sender_email(&raw, defaults::SENDER_EMAIL);
        resolver!(email = %resolved.value, "Resolved sender email");
        resolved
    }

    /// The From display name for outgoing mail. Never writes to the store.
    pub fn resolve_sender_name(&self) -> Resolved<String> {
        let raw = self
            .store
            .read_site(keys::SENDER_NAME)
            .map_or_else(|| defaults::SENDER_NAME.to_string(), |value| value.as_text());

        let resolved = validate_sender_name(&raw);
        resolver!(name = %resolved.value, "Resolved sender name");
        resolved
    }

    /// Both halves of the identity, with their notices concatenated
    pub fn resolve(&self) -> Resolved<SenderIdentity> {
        let (email, mut notices) = self.resolve_sender_email().into_parts();
        let (name, name_notices) = self.resolve_sender_name().into_parts();
        notices.extend(name_notices);

        Resolved::new(SenderIdentity { email, name }, notices)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use ownomail_common::Severity;
    use ownomail_store::{MemoryStore, Scope, SettingValue};
    use pretty_assertions::assert_eq;

    use super::*;

    fn resolver_with(options: &[(&str, SettingValue)]) -> IdentityResolver {
        let store = MemoryStore::with_site_options(
            options
                .iter()
                .map(|(key, value)| ((*key).to_string(), value.clone())),
        );
        IdentityResolver::new(Arc::new(store))
    }

    #[test]
    fn test_unset_options_use_defaults() {
        let resolver = resolver_with(&[]);

        let identity = resolver.resolve();
        assert_eq!(identity.value, SenderIdentity::default());
        assert!(identity.has_notice(NoticeCode::EmailAccepted));
        assert!(identity.has_notice(NoticeCode::NameAccepted));
    }

    #[test]
    fn test_valid_email_is_trimmed_and_accepted() {
        let resolver = resolver_with(&[(keys::SENDER_EMAIL, " noreply@example.com ".into())]);

        let email = resolver.resolve_sender_email();
        assert_eq!(email.value, "noreply@example.com");
        assert_eq!(email.notices[0].severity, Severity::Info);
    }

    #[test]
    fn test_empty_email_falls_back_to_default() {
        let resolver = resolver_with(&[(keys::SENDER_EMAIL, "   ".into())]);

        let email = resolver.resolve_sender_email();
        assert_eq!(email.value, "email@ownomail.com");
        assert!(email.has_notice(NoticeCode::EmptyEmail));
        assert_eq!(email.notices[0].severity, Severity::Error);
    }

    #[test]
    fn test_malformed_stored_email_never_returned() {
        for raw in ["not-an-email", "a@b", "user@@example.com", "<user@example.com>"] {
            let resolver = resolver_with(&[(keys::SENDER_EMAIL, raw.into())]);
            let email = resolver.resolve_sender_email();

            assert_eq!(email.value, "email@ownomail.com", "input {raw:?}");
            assert!(address_parser::is_email(&email.value));
            assert!(email.has_notice(NoticeCode::InvalidEmail));
        }
    }

    #[test]
    fn test_invalid_candidate_keeps_previous_value() {
        let email = validate_sender_email("not-an-email", "previous@example.com");
        assert_eq!(email.value, "previous@example.com");
        assert!(email.has_notice(NoticeCode::InvalidEmail));

        let email = validate_sender_email("not-an-email", "also-broken");
        assert_eq!(email.value, "email@ownomail.com");
    }

    #[test]
    fn test_long_name_truncated_to_fifty() {
        let resolver = resolver_with(&[(keys::SENDER_NAME, "A".repeat(60).into())]);

        let name = resolver.resolve_sender_name();
        assert_eq!(name.value.chars().count(), 50);
        assert_eq!(name.notices.len(), 1);
        assert_eq!(name.notices[0].code, NoticeCode::NameTooLong);
        assert_eq!(name.notices[0].severity, Severity::Warning);
    }

    #[test]
    fn test_truncation_counts_code_points() {
        let name = validate_sender_name(&"é".repeat(51));
        assert_eq!(name.value, "é".repeat(50));
    }

    #[test]
    fn test_valid_name_returned_unchanged() {
        let longest = "B".repeat(50);
        for raw in ["A", "Acme Support", longest.as_str()] {
            let name = validate_sender_name(raw);
            assert_eq!(name.value, raw);
            assert!(name.has_notice(NoticeCode::NameAccepted));
        }
    }

    #[test]
    fn test_empty_name_uses_default() {
        let resolver = resolver_with(&[(keys::SENDER_NAME, "\r\n".into())]);

        let name = resolver.resolve_sender_name();
        assert_eq!(name.value, "OwnOmail Sender");
        assert!(name.has_notice(NoticeCode::EmptyName));
    }

    #[test]
    fn test_name_header_injection_removed() {
        let name = validate_sender_name("Support\r\nBcc: victim@example.com");
        assert!(!name.value.contains('\n'));
        assert!(!name.value.contains('\r'));
    }

    #[test]
    fn test_resolution_is_a_pure_read() {
        let store = MemoryStore::with_site_options([(keys::SENDER_NAME, "A".repeat(60))]);
        let resolver = IdentityResolver::new(Arc::new(store.clone()));

        let first = resolver.resolve();
        let second = resolver.resolve();

        assert_eq!(first, second);
        assert_eq!(
            store.get(Scope::Site, keys::SENDER_NAME).unwrap(),
            Some(SettingValue::Text("A".repeat(60)))
        );
    }

    #[test]
    fn test_non_text_stored_values_are_rendered() {
        let resolver = resolver_with(&[(keys::SENDER_NAME, SettingValue::Int(42))]);
        assert_eq!(resolver.resolve_sender_name().value, "42");
    }
}
