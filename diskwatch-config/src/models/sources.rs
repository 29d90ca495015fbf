use serde::Deserialize;
use std::path::PathBuf;

use crate::util::{non_blank, parse_csv};

pub const ENV_FOLDER_PATHS: &str = "YANDEX_FOLDER_PATHS";
pub const ENV_CHECK_INTERVAL: &str = "CHECK_INTERVAL_SECONDS";
pub const ENV_TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
pub const ENV_YANDEX_TOKEN: &str = "YANDEX_TOKEN";
pub const ENV_COOLDOWN_FACTOR: &str = "ERROR_COOLDOWN_FACTOR";
pub const ENV_HTTP_TIMEOUT: &str = "HTTP_TIMEOUT_SECONDS";
pub const ENV_YANDEX_PAGE_SIZE: &str = "YANDEX_PAGE_SIZE";
pub const ENV_YANDEX_API_BASE: &str = "YANDEX_API_BASE";
pub const ENV_TELEGRAM_API_BASE: &str = "TELEGRAM_API_BASE";
pub const ENV_CONFIG_PATH: &str = "DISKWATCH_CONFIG_PATH";

/// Raw configuration as defined in a TOML file.
///
/// ```toml
/// folders = ["/Documents", "/Photos/Camera"]
/// check_interval_seconds = 300
///
/// [telegram]
/// chat_id = "-1001234567890"
///
/// [yandex]
/// page_size = 500
/// ```
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct FileConfig {
    pub folders: Option<Vec<String>>,
    pub check_interval_seconds: Option<u64>,
    pub cooldown_factor: Option<u32>,
    pub http_timeout_seconds: Option<u64>,
    #[serde(default)]
    pub telegram: FileTelegramConfig,
    #[serde(default)]
    pub yandex: FileYandexConfig,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileTelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub api_base: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileYandexConfig {
    pub token: Option<String>,
    pub page_size: Option<u32>,
    pub api_base: Option<String>,
}

/// Environment-derived configuration values. Numbers are kept raw so the
/// loader can report malformed values instead of silently ignoring them.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub folder_paths: Option<Vec<String>>,
    pub check_interval_seconds: Option<String>,
    pub cooldown_factor: Option<String>,
    pub http_timeout_seconds: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub telegram_api_base: Option<String>,
    pub yandex_token: Option<String>,
    pub yandex_page_size: Option<String>,
    pub yandex_api_base: Option<String>,
    pub config_path: Option<PathBuf>,
}

impl EnvConfig {
    /// Read from the process environment.
    pub fn gather() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_blank(lookup(key));

        Self {
            folder_paths: get(ENV_FOLDER_PATHS).map(|raw| parse_csv(&raw)),
            check_interval_seconds: get(ENV_CHECK_INTERVAL),
            cooldown_factor: get(ENV_COOLDOWN_FACTOR),
            http_timeout_seconds: get(ENV_HTTP_TIMEOUT),
            telegram_bot_token: get(ENV_TELEGRAM_BOT_TOKEN),
            telegram_chat_id: get(ENV_TELEGRAM_CHAT_ID),
            telegram_api_base: get(ENV_TELEGRAM_API_BASE),
            yandex_token: get(ENV_YANDEX_TOKEN),
            yandex_page_size: get(ENV_YANDEX_PAGE_SIZE),
            yandex_api_base: get(ENV_YANDEX_API_BASE),
            config_path: get(ENV_CONFIG_PATH).map(PathBuf::from),
        }
    }
}
