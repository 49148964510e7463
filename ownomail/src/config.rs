use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use ownomail_admin::{NonceKey, SettingsShell};
use ownomail_common::{NameTruncation, internal};
use ownomail_mailer::{LettreSender, Mailer, TransportStrategyConfig};
use ownomail_store::StoreConfig;
use rand::RngCore;
use serde::Deserialize;

use crate::app::App;

pub const CONFIG_ENV: &str = "OWNOMAIL_CONFIG";

const fn default_send_timeout_secs() -> u64 {
    30
}

/// Application configuration, read from `ownomail.config.ron`
///
/// ```ron
/// Ownomail (
///     store: File(path: "/var/lib/ownomail/options.ron"),
///     transport: Explicit,
///     name_truncation: OnSave,
///     nonce_secret: Some("change-me"),
/// )
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Ownomail {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub transport: TransportStrategyConfig,
    #[serde(default)]
    pub name_truncation: NameTruncation,
    /// Form token secret. Without one, tokens only verify inside the process
    /// that issued them.
    #[serde(default)]
    pub nonce_secret: Option<String>,
    /// Local delivery command, `sendmail` on `PATH` when unset
    #[serde(default)]
    pub sendmail_command: Option<PathBuf>,
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
}

/// Bytes of randomness in a generated token secret
const EPHEMERAL_SECRET_LEN: usize = 32;

fn ephemeral_secret() -> String {
    let mut secret = [0_u8; EPHEMERAL_SECRET_LEN];
    rand::rng().fill_bytes(&mut secret);
    hex::encode(secret)
}

impl Ownomail {
    /// # Errors
    /// Returns an error if `content` is not a valid configuration.
    pub fn from_ron(content: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(content)?)
    }

    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        Self::from_ron(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Wire up the store, resolvers and settings shell
    ///
    /// # Errors
    /// Returns an error if the store path is rejected or the token secret is
    /// empty.
    pub fn build(self) -> anyhow::Result<App> {
        let store = self.store.into_store()?;
        let probe = self.transport.probe();
        let configurator = self.transport.build(store.clone());
        let mailer = Mailer::new(store.clone(), configurator);

        let mut sender = LettreSender::new().with_timeout(Duration::from_secs(self.send_timeout_secs));
        if let Some(command) = self.sendmail_command {
            sender = sender.with_sendmail_command(command);
        }

        let secret = self.nonce_secret.unwrap_or_else(ephemeral_secret);
        let mut shell = SettingsShell::new(
            store.clone(),
            NonceKey::new(secret)?,
            mailer.clone(),
            Arc::new(sender),
        )
        .with_name_truncation(self.name_truncation);

        // In probe mode the configured strategy already runs the probe
        if self.transport.explicit_smtp_enabled() {
            shell = shell.with_local_probe(probe.clone());
        }

        internal!(
            level = DEBUG,
            explicit_smtp = self.transport.explicit_smtp_enabled(),
            "OwnOmail configured"
        );

        Ok(App::new(store, mailer, shell, probe))
    }
}

/// Find the configuration file using the following precedence:
/// 1. `explicit`, usually from `--config`
/// 2. `OWNOMAIL_CONFIG` environment variable
/// 3. ./ownomail.config.ron (current working directory)
/// 4. /etc/ownomail/ownomail.config.ron (system-wide config)
///
/// # Errors
/// Returns an error if an explicitly named file does not exist, or none of
/// the default locations holds one.
pub fn find_config_file(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    let explicit = explicit
        .map(Path::to_path_buf)
        .map(|path| (path, "--config"))
        .or_else(|| std::env::var(CONFIG_ENV).ok().map(|path| (PathBuf::from(path), CONFIG_ENV)));

    if let Some((path, source)) = explicit {
        if path.exists() {
            return Ok(path);
        }
        anyhow::bail!("{source} points to non-existent file: {}", path.display());
    }

    let default_paths = [
        PathBuf::from("./ownomail.config.ron"),
        PathBuf::from("/etc/ownomail/ownomail.config.ron"),
    ];

    if let Some(path) = default_paths.iter().find(|path| path.exists()) {
        return Ok(path.clone());
    }

    let paths_tried = default_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    anyhow::bail!(
        "No configuration file found. Tried:\n  - {CONFIG_ENV} environment variable\n{paths_tried}"
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use ownomail_mailer::DetectionMethod;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Ownomail::from_ron("Ownomail ()").unwrap();

        assert_eq!(config.store, StoreConfig::default());
        assert_eq!(config.transport, TransportStrategyConfig::Explicit);
        assert_eq!(config.name_truncation, NameTruncation::OnSave);
        assert_eq!(config.nonce_secret, None);
        assert_eq!(config.send_timeout_secs, 30);
    }

    #[test]
    fn test_full_config() {
        let config = Ownomail::from_ron(
            r#"Ownomail (
                store: Memory,
                transport: Probe(
                    hints: (smtp_host: Some("127.0.0.1"), smtp_port: Some(2525)),
                    method: Reachability,
                    timeout_secs: 1,
                    hints_from_env: false,
                ),
                name_truncation: OnRead,
                nonce_secret: Some("secret"),
                sendmail_command: Some("/usr/sbin/sendmail"),
            )"#,
        )
        .unwrap();

        assert_eq!(config.store, StoreConfig::Memory);
        assert_eq!(config.name_truncation, NameTruncation::OnRead);
        assert!(matches!(
            config.transport,
            TransportStrategyConfig::Probe {
                method: DetectionMethod::Reachability,
                timeout_secs: 1,
                ..
            }
        ));
        assert!(config.build().is_ok());
    }

    #[test]
    fn test_ephemeral_secret_is_random() {
        let first = ephemeral_secret();
        let second = ephemeral_secret();

        assert_eq!(first.len(), EPHEMERAL_SECRET_LEN * 2);
        assert!(first.chars().all(|ch| ch.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }

    #[test]
    fn test_empty_secret_rejected() {
        let config = Ownomail::from_ron(r#"Ownomail (store: Memory, nonce_secret: Some(""))"#).unwrap();
        assert!(config.build().is_err());
    }

    #[test]
    fn test_explicit_config_path_must_exist() {
        let err = find_config_file(Some(Path::new("/nonexistent/ownomail.config.ron"))).unwrap_err();
        assert!(err.to_string().contains("--config"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ownomail.config.ron");
        std::fs::write(&path, "Ownomail ()").unwrap();
        assert_eq!(find_config_file(Some(&path)).unwrap(), path);
    }
}
