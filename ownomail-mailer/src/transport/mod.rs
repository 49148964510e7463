//! Outgoing transport configuration
//!
//! Before every send the host hands over a fresh [`TransportConfig`] set to
//! [`TransportConfig::Local`]. A [`TransportStrategy`] then either leaves it
//! alone or switches it to a fully populated relay. Two strategies exist:
//! [`ExplicitSmtp`] reads relay settings from the option store and
//! [`EnvironmentProbe`] looks for a relay on the local machine.

pub mod explicit;
pub mod probe;

use std::{
    fmt::{self, Debug, Formatter},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use ownomail_common::{Encryption, Notice, Resolved, resolver};
use ownomail_store::ConfigStore;
use serde::Deserialize;

pub use explicit::ExplicitSmtp;
pub use probe::{CandidateSource, DetectionMethod, EnvironmentHints, EnvironmentProbe, RelayCandidate};

/// SMTP protocol verbosity used when diagnostics are switched on
pub const DETAILED_VERBOSITY: u8 = 2;

/// Username and password for relay authentication
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where SMTP session diagnostics go
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Diagnostics {
    #[default]
    Off,
    /// Protocol traffic is written to the error log at the given verbosity
    ErrorLog { verbosity: u8 },
}

impl Diagnostics {
    /// SMTP protocol verbosity, `0` when diagnostics are off
    #[must_use]
    pub const fn verbosity(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::ErrorLog { verbosity } => verbosity,
        }
    }
}

/// A fully specified SMTP relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySettings {
    pub host: String,
    pub port: u16,
    /// `None` disables authentication
    pub auth: Option<Credentials>,
    /// `None` means a plaintext session
    pub encryption: Option<Encryption>,
    pub diagnostics: Diagnostics,
}

/// How the next message leaves the machine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TransportConfig {
    /// The system's local mail facility
    #[default]
    Local,
    Relay(RelaySettings),
}

impl TransportConfig {
    #[must_use]
    pub const fn is_relay(&self) -> bool {
        matches!(self, Self::Relay(_))
    }

    #[must_use]
    pub const fn relay(&self) -> Option<&RelaySettings> {
        match self {
            Self::Relay(relay) => Some(relay),
            Self::Local => None,
        }
    }
}

/// Rewrites a transport configuration in place
#[async_trait]
pub trait TransportStrategy: Send + Sync + Debug {
    /// Leave `transport` untouched or replace it with a relay. The returned
    /// notices are advisory; this never fails.
    async fn configure(&self, transport: &mut TransportConfig) -> Vec<Notice>;
}

/// Applies the selected [`TransportStrategy`] on every send
#[derive(Debug, Clone)]
pub struct TransportConfigurator {
    strategy: Arc<dyn TransportStrategy>,
}

impl TransportConfigurator {
    #[must_use]
    pub fn new(strategy: Arc<dyn TransportStrategy>) -> Self {
        Self { strategy }
    }

    /// Pick explicit SMTP settings or the environment probe
    #[must_use]
    pub fn select(
        explicit_smtp_enabled: bool,
        store: Arc<dyn ConfigStore>,
        probe: EnvironmentProbe,
    ) -> Self {
        if explicit_smtp_enabled {
            Self::new(Arc::new(ExplicitSmtp::new(store)))
        } else {
            Self::new(Arc::new(probe))
        }
    }

    /// Configure the host's transport object
    pub async fn configure(&self, transport: &mut TransportConfig) -> Vec<Notice> {
        let notices = self.strategy.configure(transport).await;
        resolver!(relay = transport.is_relay(), "Configured outgoing transport");
        notices
    }

    /// Configure a fresh local transport and return it
    pub async fn resolve(&self) -> Resolved<TransportConfig> {
        let mut transport = TransportConfig::Local;
        let notices = self.configure(&mut transport).await;
        Resolved::new(transport, notices)
    }
}

const fn default_probe_timeout_secs() -> u64 {
    probe::DEFAULT_TIMEOUT.as_secs()
}

const fn default_true() -> bool {
    true
}

/// Runtime selection of the transport strategy
///
/// ```ron
/// transport: Explicit,
/// ```
///
/// ```ron
/// transport: Probe(
///     hints: (sendmail_path: Some("/usr/bin/msmtp")),
///     method: Reachability,
///     timeout_secs: 2,
/// ),
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub enum TransportStrategyConfig {
    #[default]
    Explicit,
    Probe {
        #[serde(default)]
        hints: EnvironmentHints,
        #[serde(default)]
        method: DetectionMethod,
        #[serde(default = "default_probe_timeout_secs")]
        timeout_secs: u64,
        /// Fill unset hints from `OWNOMAIL_*` environment variables
        #[serde(default = "default_true")]
        hints_from_env: bool,
    },
}

impl TransportStrategyConfig {
    #[must_use]
    pub const fn explicit_smtp_enabled(&self) -> bool {
        matches!(self, Self::Explicit)
    }

    /// The environment probe this configuration describes. Explicit mode
    /// still gets one, built from environment hints only, for status checks.
    #[must_use]
    pub fn probe(&self) -> EnvironmentProbe {
        match self {
            Self::Explicit => EnvironmentProbe::new(EnvironmentHints::from_env()),
            Self::Probe {
                hints,
                method,
                timeout_secs,
                hints_from_env,
            } => {
                let hints = if *hints_from_env {
                    hints.clone().fill_from(EnvironmentHints::from_env())
                } else {
                    hints.clone()
                };

                EnvironmentProbe::new(hints)
                    .with_method(*method)
                    .with_timeout(Duration::from_secs(*timeout_secs))
            }
        }
    }

    #[must_use]
    pub fn build(&self, store: Arc<dyn ConfigStore>) -> TransportConfigurator {
        TransportConfigurator::select(self.explicit_smtp_enabled(), store, self.probe())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::path::PathBuf;

    use ownomail_common::{NoticeCode, keys};
    use ownomail_store::MemoryStore;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials {
            username: "mailer".to_string(),
            password: "hunter2".to_string(),
        };

        let debug = format!("{credentials:?}");
        assert!(debug.contains("mailer"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_diagnostics_verbosity() {
        assert_eq!(Diagnostics::Off.verbosity(), 0);
        assert_eq!(
            Diagnostics::ErrorLog {
                verbosity: DETAILED_VERBOSITY
            }
            .verbosity(),
            2
        );
    }

    #[test]
    fn test_deserialize_strategy_config() {
        let config: TransportStrategyConfig = ron::from_str("Explicit").unwrap();
        assert!(config.explicit_smtp_enabled());

        let config: TransportStrategyConfig = ron::from_str(
            r#"Probe(
                hints: (sendmail_path: Some("/usr/bin/msmtp")),
                method: SendmailName,
            )"#,
        )
        .unwrap();

        assert_eq!(
            config,
            TransportStrategyConfig::Probe {
                hints: EnvironmentHints {
                    sendmail_path: Some(PathBuf::from("/usr/bin/msmtp")),
                    ..EnvironmentHints::default()
                },
                method: DetectionMethod::SendmailName,
                timeout_secs: 2,
                hints_from_env: true,
            }
        );
    }

    #[tokio::test]
    async fn test_selector_routes_to_explicit() {
        let store = Arc::new(MemoryStore::with_site_options([(
            keys::SMTP_HOST,
            "smtp.example.com",
        )]));
        let probe = EnvironmentProbe::new(EnvironmentHints::default());

        let configurator = TransportConfigurator::select(true, store, probe);
        let transport = configurator.resolve().await;

        assert_eq!(transport.value.relay().unwrap().host, "smtp.example.com");
    }

    #[tokio::test]
    async fn test_selector_routes_to_probe() {
        let store = Arc::new(MemoryStore::with_site_options([(
            keys::SMTP_HOST,
            "smtp.example.com",
        )]));
        let probe = EnvironmentProbe::new(EnvironmentHints::default());

        let configurator = TransportConfigurator::select(false, store, probe);
        let transport = configurator.resolve().await;

        assert_eq!(transport.value, TransportConfig::Local);
        assert!(transport.has_notice(NoticeCode::NoRelayDetected));
    }
}
