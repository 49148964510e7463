//! OwnOmail keeps the From identity of outgoing mail under control and picks
//! how that mail leaves the machine: through an explicitly configured SMTP
//! relay, through a relay found next to us, or through local delivery.

pub mod app;
pub mod config;

pub use app::{App, load_settings};
pub use config::{CONFIG_ENV, Ownomail, find_config_file};
