//! The administrator-facing side of OwnOmail: settings submissions, form
//! tokens, the test email and the relay indicator.

pub mod capability;
pub mod error;
pub mod nonce;
pub mod shell;
pub mod status;
pub mod submission;
pub mod test_email;

pub use capability::{MANAGE_OPTIONS, Principal};
pub use error::{AdminError, Result};
pub use nonce::NonceKey;
pub use shell::SettingsShell;
pub use status::relay_status;
pub use submission::{Redirect, SETTINGS_URL, SettingsAction, Submission, TEST_EMAIL_FIELD};
