use std::sync::Arc;

use async_trait::async_trait;
use ownomail_common::{
    Encryption, Notice, NoticeCode, ValidationError, address_parser, keys, resolver,
    settings::defaults,
};
use ownomail_store::{ConfigStore, ConfigStoreExt, SettingValue};

use super::{Credentials, DETAILED_VERBOSITY, Diagnostics, RelaySettings, TransportConfig, TransportStrategy};

/// Relay settings taken verbatim from the option store
#[derive(Debug, Clone)]
pub struct ExplicitSmtp {
    store: Arc<dyn ConfigStore>,
}

impl ExplicitSmtp {
    #[must_use]
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }

    fn text(&self, key: &str) -> String {
        self.store
            .read_site(key)
            .map(|value| value.as_text().trim().to_string())
            .unwrap_or_default()
    }

    fn port(&self, notices: &mut Vec<Notice>) -> u16 {
        let Some(value) = self.store.read_site(keys::SMTP_PORT) else {
            return defaults::SMTP_PORT;
        };

        match value.as_int().and_then(|port| u16::try_from(port).ok()) {
            Some(port) if port != 0 => port,
            _ => {
                let err = ValidationError::InvalidPort(value.as_text());
                notices.push(Notice::warning(
                    err.code(),
                    format!("Warning: {err}. Using port {}.", defaults::SMTP_PORT),
                ));
                defaults::SMTP_PORT
            }
        }
    }

    fn encryption(&self, notices: &mut Vec<Notice>) -> Encryption {
        self.store
            .read_site(keys::SMTP_ENCRYPTION)
            .map_or(Ok(Encryption::Ssl), |value| value.as_text().trim().parse())
            .unwrap_or_else(|err: ValidationError| {
                notices.push(err.notice());
                Encryption::Ssl
            })
    }
}

#[async_trait]
impl TransportStrategy for ExplicitSmtp {
    async fn configure(&self, transport: &mut TransportConfig) -> Vec<Notice> {
        let mut notices = Vec::new();

        let use_smtp = self
            .store
            .read_site(keys::USE_SMTP)
            .and_then(|value| value.as_bool())
            .unwrap_or(true);
        let host = self.text(keys::SMTP_HOST);

        if !use_smtp || host.is_empty() {
            resolver!(use_smtp, "No SMTP relay configured, using local mail");
            return notices;
        }

        if let Err(err) = address_parser::parse_hostname(&host) {
            resolver!(level = WARN, host, error = %err, "Ignoring invalid SMTP host");
            notices.push(Notice::warning(
                NoticeCode::InvalidSmtpHost,
                format!("Warning: Invalid SMTP host {host:?}. Using local mail."),
            ));
            return notices;
        }

        let port = self.port(&mut notices);

        let username = self.text(keys::SMTP_USERNAME);
        let auth = (!username.is_empty()).then(|| Credentials {
            username,
            password: self
                .store
                .read_site(keys::SMTP_PASSWORD)
                .map(|value| value.as_text())
                .unwrap_or_default(),
        });

        let encryption = self.encryption(&mut notices);

        let diagnostics = if self
            .store
            .read_site(keys::SMTP_DEBUG)
            .as_ref()
            .and_then(SettingValue::as_bool)
            .unwrap_or(false)
        {
            Diagnostics::ErrorLog {
                verbosity: DETAILED_VERBOSITY,
            }
        } else {
            Diagnostics::Off
        };

        resolver!(
            level = DEBUG,
            host,
            port,
            auth = auth.is_some(),
            %encryption,
            "Using explicit SMTP relay"
        );

        *transport = TransportConfig::Relay(RelaySettings {
            host,
            port,
            auth,
            encryption: Some(encryption),
            diagnostics,
        });

        notices
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use ownomail_store::MemoryStore;
    use pretty_assertions::assert_eq;

    use super::*;

    async fn configure(options: Vec<(&str, SettingValue)>) -> (TransportConfig, Vec<Notice>) {
        let store = MemoryStore::with_site_options(options);
        let strategy = ExplicitSmtp::new(Arc::new(store));

        let mut transport = TransportConfig::Local;
        let notices = strategy.configure(&mut transport).await;
        (transport, notices)
    }

    #[tokio::test]
    async fn test_full_relay_settings() {
        let (transport, notices) = configure(vec![
            (keys::SMTP_HOST, "smtp.example.com".into()),
            (keys::SMTP_PORT, SettingValue::Int(587)),
            (keys::SMTP_USERNAME, "u".into()),
            (keys::SMTP_PASSWORD, "p".into()),
            (keys::SMTP_ENCRYPTION, "tls".into()),
        ])
        .await;

        assert!(notices.is_empty());
        assert_eq!(
            transport,
            TransportConfig::Relay(RelaySettings {
                host: "smtp.example.com".to_string(),
                port: 587,
                auth: Some(Credentials {
                    username: "u".to_string(),
                    password: "p".to_string(),
                }),
                encryption: Some(Encryption::Tls),
                diagnostics: Diagnostics::Off,
            })
        );
    }

    #[tokio::test]
    async fn test_empty_host_stays_local() {
        let (transport, notices) = configure(vec![(keys::SMTP_HOST, "".into())]).await;
        assert_eq!(transport, TransportConfig::Local);
        assert!(notices.is_empty());

        let (transport, _) = configure(vec![]).await;
        assert_eq!(transport, TransportConfig::Local);
    }

    #[tokio::test]
    async fn test_disabled_smtp_stays_local() {
        let (transport, _) = configure(vec![
            (keys::USE_SMTP, false.into()),
            (keys::SMTP_HOST, "smtp.example.com".into()),
        ])
        .await;

        assert_eq!(transport, TransportConfig::Local);
    }

    #[tokio::test]
    async fn test_invalid_encryption_falls_back_to_ssl() {
        let (transport, notices) = configure(vec![
            (keys::SMTP_HOST, "smtp.example.com".into()),
            (keys::SMTP_ENCRYPTION, "xyz".into()),
        ])
        .await;

        assert_eq!(transport.relay().unwrap().encryption, Some(Encryption::Ssl));
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].code, NoticeCode::InvalidEncryption);
    }

    #[tokio::test]
    async fn test_no_username_disables_auth() {
        let (transport, _) = configure(vec![
            (keys::SMTP_HOST, "smtp.example.com".into()),
            (keys::SMTP_PASSWORD, "orphan".into()),
        ])
        .await;

        let relay = transport.relay().unwrap();
        assert_eq!(relay.auth, None);
        assert_eq!(relay.port, 587);
        assert_eq!(relay.encryption, Some(Encryption::Ssl));
    }

    #[tokio::test]
    async fn test_bad_port_uses_default() {
        for port in [SettingValue::Int(70_000), SettingValue::Int(0), "abc".into()] {
            let (transport, notices) = configure(vec![
                (keys::SMTP_HOST, "smtp.example.com".into()),
                (keys::SMTP_PORT, port),
            ])
            .await;

            assert_eq!(transport.relay().unwrap().port, 587);
            assert_eq!(notices[0].code, NoticeCode::InvalidSmtpPort);
        }
    }

    #[tokio::test]
    async fn test_textual_port_accepted() {
        let (transport, notices) = configure(vec![
            (keys::SMTP_HOST, "smtp.example.com".into()),
            (keys::SMTP_PORT, "2525".into()),
        ])
        .await;

        assert!(notices.is_empty());
        assert_eq!(transport.relay().unwrap().port, 2525);
    }

    #[tokio::test]
    async fn test_invalid_host_stays_local() {
        let (transport, notices) =
            configure(vec![(keys::SMTP_HOST, "bad host!".into())]).await;

        assert_eq!(transport, TransportConfig::Local);
        assert_eq!(notices[0].code, NoticeCode::InvalidSmtpHost);
    }

    #[tokio::test]
    async fn test_debug_enables_diagnostics() {
        let (transport, _) = configure(vec![
            (keys::SMTP_HOST, "smtp.example.com".into()),
            (keys::SMTP_DEBUG, true.into()),
        ])
        .await;

        assert_eq!(
            transport.relay().unwrap().diagnostics,
            Diagnostics::ErrorLog { verbosity: 2 }
        );
    }
}
