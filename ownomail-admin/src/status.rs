use ownomail_common::{Notice, NoticeCode};
use ownomail_mailer::{EnvironmentProbe, TransportConfigurator};

/// Whether outgoing mail can go through a relay. Runs the configured
/// strategy exactly as a send would. When that leaves mail on the local
/// transport, `local_probe` gets a chance to report a relay found on this
/// machine.
pub async fn relay_status(
    transport: &TransportConfigurator,
    local_probe: Option<&EnvironmentProbe>,
) -> Notice {
    if let Some(relay) = transport.resolve().await.value.relay() {
        return Notice::success(
            NoticeCode::RelayDetected,
            format!("Mail is sent through the SMTP relay at {}:{}.", relay.host, relay.port),
        );
    }

    if let Some(probe) = local_probe
        && let Some(candidate) = probe.detect().await
    {
        return Notice::success(
            NoticeCode::RelayDetected,
            format!(
                "A local mail relay was detected at {}:{}.",
                candidate.host, candidate.port
            ),
        );
    }

    Notice::warning(
        NoticeCode::NoRelayDetected,
        "Warning: No SMTP relay is configured or detected. Mail falls back to the local \
         transport and may be classified as spam.",
    )
}
