use std::sync::Arc;

use ownomail_admin::{Principal, Redirect, SettingsAction, SettingsShell, Submission};
use ownomail_common::{EmailFormat, Encryption, MailSettings, Notice, Resolved, keys, settings::defaults};
use ownomail_mailer::{EnvironmentProbe, Mailer, PreparedMail, SenderIdentity, TransportConfig};
use ownomail_store::{ConfigStore, ConfigStoreExt, SettingValue};

/// Snapshot of every stored setting, defaults filled in, without validation.
/// Unparsable values show as their defaults.
#[must_use]
pub fn load_settings(store: &dyn ConfigStore) -> MailSettings {
    let text = |key: &str| store.read_site(key).map(|value| value.as_text());
    let flag = |key: &str| store.read_site(key).as_ref().and_then(SettingValue::as_bool);

    MailSettings {
        sender_email: text(keys::SENDER_EMAIL).unwrap_or_else(|| defaults::SENDER_EMAIL.to_string()),
        sender_name: text(keys::SENDER_NAME).unwrap_or_else(|| defaults::SENDER_NAME.to_string()),
        email_format: text(keys::EMAIL_FORMAT).map_or(EmailFormat::Html, |raw| EmailFormat::sanitize(&raw)),
        use_smtp: flag(keys::USE_SMTP).unwrap_or(true),
        smtp_host: text(keys::SMTP_HOST).unwrap_or_default(),
        smtp_port: store
            .read_site(keys::SMTP_PORT)
            .and_then(|value| value.as_int())
            .and_then(|port| u16::try_from(port).ok())
            .unwrap_or(defaults::SMTP_PORT),
        smtp_username: text(keys::SMTP_USERNAME).unwrap_or_default(),
        smtp_password: text(keys::SMTP_PASSWORD).unwrap_or_default(),
        smtp_encryption: text(keys::SMTP_ENCRYPTION)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(Encryption::Ssl),
        smtp_debug: flag(keys::SMTP_DEBUG).unwrap_or(false),
    }
}

/// A configured OwnOmail instance
#[derive(Debug, Clone)]
pub struct App {
    store: Arc<dyn ConfigStore>,
    mailer: Mailer,
    shell: SettingsShell,
    probe: EnvironmentProbe,
    admin: Principal,
}

impl App {
    #[must_use]
    pub fn new(
        store: Arc<dyn ConfigStore>,
        mailer: Mailer,
        shell: SettingsShell,
        probe: EnvironmentProbe,
    ) -> Self {
        Self {
            store,
            mailer,
            shell,
            probe,
            admin: Principal::administrator("ownomailctl", format!("ownomailctl-{}", std::process::id())),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn ConfigStore> {
        &self.store
    }

    #[must_use]
    pub const fn shell(&self) -> &SettingsShell {
        &self.shell
    }

    #[must_use]
    pub fn settings(&self) -> MailSettings {
        load_settings(self.store.as_ref())
    }

    pub fn identity(&self) -> Resolved<SenderIdentity> {
        self.mailer.identity().resolve()
    }

    pub async fn transport(&self) -> Resolved<TransportConfig> {
        self.mailer.transport().resolve().await
    }

    pub async fn prepare(&self) -> Resolved<PreparedMail> {
        self.mailer.prepare().await
    }

    /// Run the environment probe, whichever strategy is configured
    pub async fn detect_local_relay(&self) -> bool {
        self.probe.detect_local_relay().await
    }

    pub async fn relay_status(&self) -> Notice {
        self.shell.relay_status().await
    }

    /// Submit a settings form as the local administrator, with a token
    /// issued for this process
    pub async fn submit<K, V>(&self, action: SettingsAction, fields: impl IntoIterator<Item = (K, V)>) -> Redirect
    where
        K: Into<String>,
        V: Into<String>,
    {
        let submission = fields.into_iter().fold(
            Submission::new(action).with_nonce(self.shell.issue_nonce(&self.admin, action)),
            |submission, (name, value)| submission.with_field(name, value),
        );

        self.shell.submit(&self.admin, &submission).await
    }

    /// Remove every OwnOmail option from both scopes
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    pub fn uninstall(&self) -> ownomail_store::Result<usize> {
        ownomail_store::uninstall(self.store.as_ref())
    }
}
