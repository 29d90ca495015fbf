//! Configuration for diskwatch.
//!
//! Values are layered, highest precedence first: process environment,
//! `.env` file, optional TOML file, built-in defaults. The result is an
//! immutable [`Config`] that the server hands to the monitor and the API
//! clients; nothing else reads the environment.

pub mod loader;
pub mod models;
pub mod util;

pub use loader::{ConfigLoad, ConfigLoader, error::ConfigLoadError};
pub use models::sources::{EnvConfig, FileConfig};
pub use models::{
    Config, ConfigMetadata, ConfigWarning, TelegramSettings, YandexSettings,
};
