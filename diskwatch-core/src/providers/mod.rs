//! Concrete adapters for the storage and messaging ports.

pub mod telegram;
pub mod yandex_disk;

pub use telegram::{BotIdentity, TelegramConfig, TelegramSink};
pub use yandex_disk::{YandexDiskClient, YandexDiskConfig};

const USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
