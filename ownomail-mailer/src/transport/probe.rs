use std::{
    path::{Component, Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use ownomail_common::{Notice, NoticeCode, address_parser, resolver};
use serde::Deserialize;
use tokio::net::TcpStream;

use super::{Diagnostics, RelaySettings, TransportConfig, TransportStrategy};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Port assumed for a relay found through its sendmail binary
pub const LOCAL_RELAY_PORT: u16 = 25;

/// Relay programs that install a sendmail-compatible binary
pub const KNOWN_RELAYS: [&str; 6] = ["msmtp", "postfix", "exim", "ssmtp", "nullmailer", "opensmtpd"];

/// Clues about a relay running next to us
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EnvironmentHints {
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    /// The system's configured sendmail command
    pub sendmail_path: Option<PathBuf>,
}

impl EnvironmentHints {
    /// Read `OWNOMAIL_SMTP_HOST`, `OWNOMAIL_SMTP_PORT` and
    /// `OWNOMAIL_SENDMAIL_PATH`. Unset, empty or unparsable values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        fn var(name: &str) -> Option<String> {
            std::env::var(name)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        }

        Self {
            smtp_host: var("OWNOMAIL_SMTP_HOST"),
            smtp_port: var("OWNOMAIL_SMTP_PORT").and_then(|port| port.parse().ok()),
            sendmail_path: var("OWNOMAIL_SENDMAIL_PATH").map(PathBuf::from),
        }
    }

    /// Fill each unset hint from `fallback`
    #[must_use]
    pub fn fill_from(self, fallback: Self) -> Self {
        Self {
            smtp_host: self.smtp_host.or(fallback.smtp_host),
            smtp_port: self.smtp_port.or(fallback.smtp_port),
            sendmail_path: self.sendmail_path.or(fallback.sendmail_path),
        }
    }
}

/// How a candidate relay is confirmed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum DetectionMethod {
    /// Open a TCP connection to the candidate
    #[default]
    Reachability,
    /// Trust a sendmail binary named after a known relay program, without
    /// touching the network
    SendmailName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSource {
    SmtpHint,
    /// Named after the matched entry of [`KNOWN_RELAYS`]
    SendmailBinary(&'static str),
}

/// Where a relay would be, if there is one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayCandidate {
    pub host: String,
    pub port: u16,
    pub source: CandidateSource,
}

/// Name of the known relay program the sendmail command points at
fn relay_program(command: &Path) -> Option<&'static str> {
    // The configured command may carry arguments, e.g. "/usr/bin/msmtp -t"
    let binary = command
        .to_str()
        .and_then(|command| command.split_whitespace().next())
        .map_or_else(|| command.to_path_buf(), PathBuf::from);

    let matches = |path: &Path| {
        path.components().rev().find_map(|component| match component {
            Component::Normal(name) => {
                let name = name.to_string_lossy().to_ascii_lowercase();
                KNOWN_RELAYS
                    .iter()
                    .find(|relay| name.starts_with(*relay))
                    .copied()
            }
            _ => None,
        })
    };

    matches(&binary).or_else(|| {
        // /usr/sbin/sendmail is usually a symlink into the relay's tree
        std::fs::canonicalize(&binary)
            .ok()
            .and_then(|resolved| matches(&resolved))
    })
}

async fn is_reachable(host: &str, port: u16, timeout: Duration) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');

    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => true,
        Ok(Err(err)) => {
            resolver!(level = DEBUG, host, port, error = %err, "Relay candidate refused connection");
            false
        }
        Err(_) => {
            resolver!(level = DEBUG, host, port, ?timeout, "Relay candidate timed out");
            false
        }
    }
}

/// Looks for a mail relay on the local machine
#[derive(Debug, Clone)]
pub struct EnvironmentProbe {
    hints: EnvironmentHints,
    method: DetectionMethod,
    timeout: Duration,
}

impl EnvironmentProbe {
    #[must_use]
    pub fn new(hints: EnvironmentHints) -> Self {
        Self {
            hints,
            method: DetectionMethod::Reachability,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_method(mut self, method: DetectionMethod) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn hints(&self) -> &EnvironmentHints {
        &self.hints
    }

    fn host_hint_candidate(&self) -> Option<RelayCandidate> {
        let host = self
            .hints
            .smtp_host
            .as_deref()
            .map(str::trim)
            .filter(|host| address_parser::is_hostname(host))?;

        Some(RelayCandidate {
            host: host.to_string(),
            port: self.hints.smtp_port.unwrap_or(LOCAL_RELAY_PORT),
            source: CandidateSource::SmtpHint,
        })
    }

    fn sendmail_candidate(&self) -> Option<RelayCandidate> {
        let program = relay_program(self.hints.sendmail_path.as_deref()?)?;

        Some(RelayCandidate {
            host: "localhost".to_string(),
            port: LOCAL_RELAY_PORT,
            source: CandidateSource::SendmailBinary(program),
        })
    }

    /// The relay the hints point at, as the configured method sees them.
    ///
    /// For [`DetectionMethod::Reachability`] an SMTP host hint wins over the
    /// sendmail command; a host hint that is not a valid hostname is ignored.
    /// [`DetectionMethod::SendmailName`] only looks at the sendmail command.
    #[must_use]
    pub fn candidate(&self) -> Option<RelayCandidate> {
        match self.method {
            DetectionMethod::Reachability => self
                .host_hint_candidate()
                .or_else(|| self.sendmail_candidate()),
            DetectionMethod::SendmailName => self.sendmail_candidate(),
        }
    }

    /// The confirmed relay, if any. Takes at most the configured timeout.
    pub async fn detect(&self) -> Option<RelayCandidate> {
        let candidate = self.candidate()?;

        let confirmed = match self.method {
            DetectionMethod::Reachability => {
                is_reachable(&candidate.host, candidate.port, self.timeout).await
            }
            DetectionMethod::SendmailName => true,
        };

        confirmed.then_some(candidate)
    }

    /// Whether a usable relay runs alongside us. Takes at most the
    /// configured timeout, and never fails.
    pub async fn detect_local_relay(&self) -> bool {
        self.detect().await.is_some()
    }
}

#[async_trait]
impl TransportStrategy for EnvironmentProbe {
    async fn configure(&self, transport: &mut TransportConfig) -> Vec<Notice> {
        let Some(candidate) = self.detect().await else {
            resolver!(level = DEBUG, method = ?self.method, "No local relay detected");
            return vec![Notice::warning(
                NoticeCode::NoRelayDetected,
                "Warning: No local mail relay was detected. Mail goes out through the local \
                 transport and may be classified as spam.",
            )];
        };

        resolver!(
            level = INFO,
            host = %candidate.host,
            port = candidate.port,
            source = ?candidate.source,
            "Detected local relay"
        );

        let notice = Notice::success(
            NoticeCode::RelayDetected,
            format!(
                "A local mail relay was detected at {}:{}.",
                candidate.host, candidate.port
            ),
        );

        *transport = TransportConfig::Relay(RelaySettings {
            host: candidate.host,
            port: candidate.port,
            auth: None,
            encryption: None,
            diagnostics: Diagnostics::Off,
        });

        vec![notice]
    }
}
