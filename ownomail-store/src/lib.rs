pub mod backends;
pub mod config;
pub mod error;
pub mod r#trait;
pub mod uninstall;
pub mod value;

pub use backends::{FileStore, MemoryStore};
pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use r#trait::{ConfigStore, ConfigStoreExt};
pub use uninstall::uninstall;
pub use value::{Scope, SettingValue};
