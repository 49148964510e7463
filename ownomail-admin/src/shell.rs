//! The settings submission endpoint
//!
//! Every submission is checked in the same order: form token, then
//! capability, then the action's own validation. A rejected token or missing
//! capability stops the submission before anything is written. Whatever
//! happens, the caller gets a [`Redirect`] back to the settings view.

use std::sync::Arc;

use ownomail_common::{
    EmailFormat, Encryption, NameTruncation, Notice, NoticeCode, ValidationError, address_parser,
    admin, keys,
    settings::{defaults, sanitize_text_field},
};
use ownomail_mailer::{EnvironmentProbe, MailSender, Mailer, validate_sender_email, validate_sender_name};
use ownomail_store::{ConfigStore, Scope, SettingValue};

use crate::{
    capability::{MANAGE_OPTIONS, Principal},
    error::{AdminError, Result},
    nonce::NonceKey,
    status,
    submission::{Redirect, SettingsAction, Submission, TEST_EMAIL_FIELD},
    test_email,
};

fn checkbox(raw: &str) -> bool {
    SettingValue::from(raw).as_bool().unwrap_or(false)
}

/// Handles settings forms and the test email form
#[derive(Clone)]
pub struct SettingsShell {
    store: Arc<dyn ConfigStore>,
    nonces: NonceKey,
    mailer: Mailer,
    sender: Arc<dyn MailSender>,
    name_truncation: NameTruncation,
    local_probe: Option<EnvironmentProbe>,
}

impl std::fmt::Debug for SettingsShell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsShell")
            .field("store", &self.store)
            .field("mailer", &self.mailer)
            .field("name_truncation", &self.name_truncation)
            .field("local_probe", &self.local_probe)
            .finish_non_exhaustive()
    }
}

impl SettingsShell {
    #[must_use]
    pub fn new(
        store: Arc<dyn ConfigStore>,
        nonces: NonceKey,
        mailer: Mailer,
        sender: Arc<dyn MailSender>,
    ) -> Self {
        Self {
            store,
            nonces,
            mailer,
            sender,
            name_truncation: NameTruncation::default(),
            local_probe: None,
        }
    }

    #[must_use]
    pub const fn with_name_truncation(mut self, name_truncation: NameTruncation) -> Self {
        self.name_truncation = name_truncation;
        self
    }

    /// Probe consulted by [`Self::relay_status`] when the configured
    /// transport leaves mail local
    #[must_use]
    pub fn with_local_probe(mut self, probe: EnvironmentProbe) -> Self {
        self.local_probe = Some(probe);
        self
    }

    /// A token the settings view embeds in the form for `action`
    #[must_use]
    pub fn issue_nonce(&self, principal: &Principal, action: SettingsAction) -> String {
        self.nonces.issue(action.as_str(), principal.session())
    }

    /// Handle one posted form
    pub async fn submit(&self, principal: &Principal, submission: &Submission) -> Redirect {
        match self.handle(principal, submission).await {
            Ok(notices) => Redirect::to_settings(notices),
            Err(err) => {
                admin!(
                    level = WARN,
                    login = principal.login(),
                    action = %submission.action,
                    error = %err,
                    "Settings submission rejected"
                );
                Redirect::to_settings(vec![err.notice()])
            }
        }
    }

    /// Success or warning notice for the settings view's relay indicator
    pub async fn relay_status(&self) -> Notice {
        status::relay_status(self.mailer.transport(), self.local_probe.as_ref()).await
    }

    fn authorize(&self, principal: &Principal, submission: &Submission) -> Result<()> {
        let action = submission.action.as_str();

        let valid = submission
            .nonce
            .as_deref()
            .is_some_and(|token| self.nonces.verify(action, principal.session(), token));
        if !valid {
            return Err(AdminError::InvalidNonce { action });
        }

        if !principal.can(MANAGE_OPTIONS) {
            return Err(AdminError::InsufficientCapability {
                login: principal.login().to_string(),
                capability: MANAGE_OPTIONS,
            });
        }

        Ok(())
    }

    async fn handle(&self, principal: &Principal, submission: &Submission) -> Result<Vec<Notice>> {
        self.authorize(principal, submission)?;

        let mut notices = match submission.action {
            SettingsAction::SaveIdentity => self.save_identity(submission)?,
            SettingsAction::SaveFormat => self.save_format(submission)?,
            SettingsAction::SaveSmtp => self.save_smtp(submission)?,
            SettingsAction::SendTestEmail => {
                return Ok(test_email::send_test_email(
                    self.store.as_ref(),
                    &self.mailer,
                    self.sender.as_ref(),
                    submission.field(TEST_EMAIL_FIELD),
                )
                .await);
            }
        };

        if notices.iter().any(Notice::is_error) {
            admin!(level = INFO, action = %submission.action, "Settings partially rejected");
        } else {
            admin!(level = INFO, action = %submission.action, "Settings saved");
            notices.push(Notice::success(
                NoticeCode::SettingsSaved,
                "OwnOmail settings have been saved successfully.",
            ));
        }

        Ok(notices)
    }

    fn stored_text(&self, key: &str, default: &str) -> Result<String> {
        Ok(self
            .store
            .get(Scope::Site, key)?
            .map_or_else(|| default.to_string(), |value| value.as_text()))
    }

    fn save_identity(&self, submission: &Submission) -> Result<Vec<Notice>> {
        let current = self.stored_text(keys::SENDER_EMAIL, defaults::SENDER_EMAIL)?;
        let (email, mut notices) =
            validate_sender_email(submission.field(keys::SENDER_EMAIL), &current).into_parts();
        let mut values: Vec<(&str, SettingValue)> = Vec::with_capacity(2);
        if notices.iter().any(|notice| notice.code == NoticeCode::EmailAccepted) {
            values.push((keys::SENDER_EMAIL, email.into()));
        }

        let raw_name = submission.field(keys::SENDER_NAME);
        let name = validate_sender_name(raw_name);
        if !name.has_notice(NoticeCode::EmptyName) {
            let persisted = match self.name_truncation {
                NameTruncation::OnSave => name.value,
                NameTruncation::OnRead => sanitize_text_field(raw_name),
            };
            values.push((keys::SENDER_NAME, persisted.into()));
        }
        notices.extend(name.notices);

        if !values.is_empty() {
            self.store.set_many(Scope::Site, &values)?;
        }

        Ok(notices)
    }

    fn save_format(&self, submission: &Submission) -> Result<Vec<Notice>> {
        let format = EmailFormat::sanitize(submission.field(keys::EMAIL_FORMAT));
        self.store
            .set(Scope::Site, keys::EMAIL_FORMAT, format.as_str().into())?;

        Ok(Vec::new())
    }

    fn save_smtp(&self, submission: &Submission) -> Result<Vec<Notice>> {
        let mut notices = Vec::new();

        let host = sanitize_text_field(submission.field(keys::SMTP_HOST));
        if !host.is_empty() && !address_parser::is_hostname(&host) {
            notices.push(ValidationError::InvalidHostname(host.clone()).notice());
        }

        let raw_port = submission.field(keys::SMTP_PORT).trim();
        let port = if raw_port.is_empty() {
            Some(defaults::SMTP_PORT)
        } else {
            raw_port.parse::<u16>().ok().filter(|port| *port != 0)
        };
        if port.is_none() {
            notices.push(ValidationError::InvalidPort(raw_port.to_string()).notice());
        }

        let Some(port) = port.filter(|_| notices.is_empty()) else {
            admin!(level = INFO, "SMTP settings rejected, keeping previous values");
            return Ok(notices);
        };

        let encryption = submission
            .field(keys::SMTP_ENCRYPTION)
            .trim()
            .parse()
            .unwrap_or_else(|err: ValidationError| {
                notices.push(err.notice());
                Encryption::Ssl
            });

        let values: [(&str, SettingValue); 7] = [
            (keys::USE_SMTP, checkbox(submission.field(keys::USE_SMTP)).into()),
            (keys::SMTP_HOST, host.into()),
            (keys::SMTP_PORT, port.into()),
            (
                keys::SMTP_USERNAME,
                sanitize_text_field(submission.field(keys::SMTP_USERNAME)).into(),
            ),
            (keys::SMTP_PASSWORD, submission.field(keys::SMTP_PASSWORD).into()),
            (keys::SMTP_ENCRYPTION, encryption.as_str().into()),
            (keys::SMTP_DEBUG, checkbox(submission.field(keys::SMTP_DEBUG)).into()),
        ];

        self.store.set_many(Scope::Site, &values)?;

        Ok(notices)
    }
}
