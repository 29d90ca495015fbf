pub mod sources;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use diskwatch_core::{
    FolderMonitorConfig, Secret,
    providers::{TelegramConfig, YandexDiskConfig},
};
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    /// Folders to watch, in processing order, without duplicates
    pub folders: Vec<String>,
    pub check_interval: Duration,
    pub cooldown_factor: u32,
    pub http_timeout: Duration,
    pub telegram: TelegramSettings,
    pub yandex: YandexSettings,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone)]
pub struct TelegramSettings {
    pub bot_token: Secret,
    pub chat_id: String,
    pub api_base: Url,
}

#[derive(Debug, Clone)]
pub struct YandexSettings {
    pub token: Secret,
    pub page_size: u32,
    pub api_base: Url,
}

/// Where the configuration came from, for startup logging.
#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub env_file: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
}

impl Config {
    pub fn monitor_config(&self) -> FolderMonitorConfig {
        FolderMonitorConfig::new(self.folders.clone(), self.telegram.chat_id.clone())
            .with_poll_interval(self.check_interval)
            .with_cooldown_factor(self.cooldown_factor)
    }

    pub fn yandex_client_config(&self) -> YandexDiskConfig {
        YandexDiskConfig {
            token: self.yandex.token.clone(),
            api_base: self.yandex.api_base.clone(),
            page_size: self.yandex.page_size,
            timeout: self.http_timeout,
        }
    }

    pub fn telegram_client_config(&self) -> TelegramConfig {
        TelegramConfig {
            bot_token: self.telegram.bot_token.clone(),
            api_base: self.telegram.api_base.clone(),
            timeout: self.http_timeout,
        }
    }
}

/// Non-fatal adjustments made while resolving the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    DuplicateFolder(String),
    CooldownFactorRaised { requested: u32, applied: u32 },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::DuplicateFolder(folder) => {
                write!(f, "folder '{folder}' is listed more than once; watching it once")
            }
            ConfigWarning::CooldownFactorRaised { requested, applied } => write!(
                f,
                "cooldown factor {requested} is below the minimum; using {applied}"
            ),
        }
    }
}
