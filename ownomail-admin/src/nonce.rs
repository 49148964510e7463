//! Form tokens
//!
//! A token binds a form action to a login session. It is the hex encoded
//! HMAC-SHA256, under a server secret, of the current validity window, the
//! action name and the session id. A token stays valid for the window it was
//! issued in and the one after, so between 12 and 24 hours.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{AdminError, Result};

type HmacSha256 = Hmac<Sha256>;

pub const NONCE_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

fn current_window() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs());

    now / (NONCE_LIFETIME.as_secs() / 2)
}

/// Issues and checks form tokens
#[derive(Clone)]
pub struct NonceKey {
    mac: HmacSha256,
}

impl std::fmt::Debug for NonceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceKey").finish_non_exhaustive()
    }
}

impl NonceKey {
    /// # Errors
    /// Returns an error if `secret` is empty.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(AdminError::EmptySecret);
        }

        Ok(Self {
            mac: HmacSha256::new_from_slice(secret)?,
        })
    }

    fn keyed(&self, window: u64, action: &str, session: &str) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(&window.to_be_bytes());
        mac.update(action.as_bytes());
        mac.update(&[0]);
        mac.update(session.as_bytes());
        mac
    }

    fn issue_in(&self, window: u64, action: &str, session: &str) -> String {
        hex::encode(self.keyed(window, action, session).finalize().into_bytes())
    }

    fn verify_in(&self, window: u64, action: &str, session: &str, token: &str) -> bool {
        let Ok(token) = hex::decode(token.trim()) else {
            return false;
        };

        [window, window.saturating_sub(1)]
            .into_iter()
            .any(|window| self.keyed(window, action, session).verify_slice(&token).is_ok())
    }

    /// A token for `action` in `session`
    #[must_use]
    pub fn issue(&self, action: &str, session: &str) -> String {
        self.issue_in(current_window(), action, session)
    }

    /// Constant-time check of a token issued by [`NonceKey::issue`]
    #[must_use]
    pub fn verify(&self, action: &str, session: &str, token: &str) -> bool {
        self.verify_in(current_window(), action, session, token)
    }
}
