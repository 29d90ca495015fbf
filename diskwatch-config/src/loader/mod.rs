pub mod error;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use diskwatch_core::{
    Secret,
    monitor::MIN_COOLDOWN_FACTOR,
    providers::{telegram::TELEGRAM_API_BASE, yandex_disk},
};
use url::Url;

use self::error::ConfigLoadError;
use crate::models::{
    Config, ConfigMetadata, ConfigWarning, TelegramSettings, YandexSettings,
    sources::{self, EnvConfig, FileConfig},
};
use crate::util::dedupe_preserving_order;

const DEFAULT_CONFIG_LOCATIONS: &[&str] =
    &["diskwatch.toml", "config/diskwatch.toml"];
const DEFAULT_ENV_FILE: &str = ".env";

pub const DEFAULT_FOLDER: &str = "/";
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 120;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

/// A resolved configuration plus anything worth telling the operator about.
#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: Vec<ConfigWarning>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Resolve from the process environment, the `.env` file and the
    /// optional TOML file. Process variables win over `.env` entries.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let (dotenv, env_file) = self.read_env_file()?;
        let env = EnvConfig::from_lookup(|key| {
            std::env::var(key).ok().or_else(|| dotenv.get(key).cloned())
        });
        self.resolve(env, env_file)
    }

    /// Resolve from an already-gathered environment; no `.env` file is read.
    pub fn load_from_env(
        &self,
        env: EnvConfig,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        self.resolve(env, None)
    }

    fn resolve(
        &self,
        env: EnvConfig,
        env_file: Option<PathBuf>,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        let metadata = ConfigMetadata {
            env_file,
            config_path,
        };
        compose(env, file_config.unwrap_or_default(), metadata)
    }

    fn read_env_file(
        &self,
    ) -> Result<(HashMap<String, String>, Option<PathBuf>), ConfigLoadError>
    {
        let (path, explicit) = match &self.options.env_file {
            Some(path) => (path.clone(), true),
            None => (PathBuf::from(DEFAULT_ENV_FILE), false),
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((HashMap::new(), None));
        }

        let env_error = |source| ConfigLoadError::EnvFile {
            path: path.clone(),
            source,
        };
        let mut values = HashMap::new();
        for entry in dotenvy::from_path_iter(&path).map_err(env_error)? {
            let (key, value) = entry.map_err(env_error)?;
            values.insert(key, value);
        }
        Ok((values, Some(path)))
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let explicit = self
            .options
            .config_path
            .clone()
            .or_else(|| env.config_path.clone());

        let path = match explicit {
            Some(path) if !path.exists() => {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            Some(path) => path,
            None => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists())
            {
                Some(path) => path,
                None => return Ok((None, None)),
            },
        };

        let file_config = read_file_config(&path)?;
        Ok((Some(file_config), Some(path)))
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigLoadError> {
    let contents =
        fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn compose(
    env: EnvConfig,
    file: FileConfig,
    metadata: ConfigMetadata,
) -> Result<ConfigLoad, ConfigLoadError> {
    let mut warnings = Vec::new();

    let folders = env
        .folder_paths
        .or_else(|| {
            file.folders.map(|folders| {
                folders
                    .into_iter()
                    .map(|f| f.trim().to_string())
                    .filter(|f| !f.is_empty())
                    .collect()
            })
        })
        .unwrap_or_else(|| vec![DEFAULT_FOLDER.to_string()]);
    if folders.is_empty() {
        return Err(ConfigLoadError::InvalidValue {
            key: sources::ENV_FOLDER_PATHS,
            value: String::new(),
            reason: "at least one folder is required".into(),
        });
    }
    let (folders, duplicates) = dedupe_preserving_order(folders);
    warnings.extend(duplicates.into_iter().map(ConfigWarning::DuplicateFolder));

    let check_interval = positive(
        sources::ENV_CHECK_INTERVAL,
        parse_number(sources::ENV_CHECK_INTERVAL, env.check_interval_seconds)?
            .or(file.check_interval_seconds)
            .unwrap_or(DEFAULT_CHECK_INTERVAL_SECS),
    )?;

    let requested_factor =
        parse_number(sources::ENV_COOLDOWN_FACTOR, env.cooldown_factor)?
            .or(file.cooldown_factor)
            .unwrap_or(MIN_COOLDOWN_FACTOR);
    let cooldown_factor = requested_factor.max(MIN_COOLDOWN_FACTOR);
    if cooldown_factor != requested_factor {
        warnings.push(ConfigWarning::CooldownFactorRaised {
            requested: requested_factor,
            applied: cooldown_factor,
        });
    }

    let http_timeout = positive(
        sources::ENV_HTTP_TIMEOUT,
        parse_number(sources::ENV_HTTP_TIMEOUT, env.http_timeout_seconds)?
            .or(file.http_timeout_seconds)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
    )?;

    let page_size: u32 =
        parse_number(sources::ENV_YANDEX_PAGE_SIZE, env.yandex_page_size)?
            .or(file.yandex.page_size)
            .unwrap_or(yandex_disk::DEFAULT_PAGE_SIZE);
    if page_size == 0 {
        return Err(ConfigLoadError::InvalidValue {
            key: sources::ENV_YANDEX_PAGE_SIZE,
            value: "0".into(),
            reason: "must be greater than zero".into(),
        });
    }

    let bot_token = env.telegram_bot_token.or(file.telegram.bot_token);
    let chat_id = env.telegram_chat_id.or(file.telegram.chat_id);
    let yandex_token = env.yandex_token.or(file.yandex.token);

    let mut missing = Vec::new();
    if bot_token.is_none() {
        missing.push(sources::ENV_TELEGRAM_BOT_TOKEN);
    }
    if chat_id.is_none() {
        missing.push(sources::ENV_TELEGRAM_CHAT_ID);
    }
    if yandex_token.is_none() {
        missing.push(sources::ENV_YANDEX_TOKEN);
    }
    let (Some(bot_token), Some(chat_id), Some(yandex_token)) =
        (bot_token, chat_id, yandex_token)
    else {
        return Err(ConfigLoadError::MissingRequired { keys: missing });
    };

    let telegram_api_base = parse_url(
        sources::ENV_TELEGRAM_API_BASE,
        env.telegram_api_base
            .or(file.telegram.api_base)
            .as_deref()
            .unwrap_or(TELEGRAM_API_BASE),
    )?;
    let yandex_api_base = parse_url(
        sources::ENV_YANDEX_API_BASE,
        env.yandex_api_base
            .or(file.yandex.api_base)
            .as_deref()
            .unwrap_or(yandex_disk::YANDEX_DISK_API_BASE),
    )?;

    let config = Config {
        folders,
        check_interval: Duration::from_secs(check_interval),
        cooldown_factor,
        http_timeout: Duration::from_secs(http_timeout),
        telegram: TelegramSettings {
            bot_token: Secret::new(bot_token),
            chat_id: chat_id.trim().to_string(),
            api_base: telegram_api_base,
        },
        yandex: YandexSettings {
            token: Secret::new(yandex_token),
            page_size,
            api_base: yandex_api_base,
        },
        metadata,
    };

    Ok(ConfigLoad { config, warnings })
}

fn parse_number<T>(
    key: &'static str,
    raw: Option<String>,
) -> Result<Option<T>, ConfigLoadError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|value| {
        value.trim().parse::<T>().map_err(|err| {
            ConfigLoadError::InvalidValue {
                key,
                reason: err.to_string(),
                value,
            }
        })
    })
    .transpose()
}

fn positive(key: &'static str, value: u64) -> Result<u64, ConfigLoadError> {
    if value == 0 {
        return Err(ConfigLoadError::InvalidValue {
            key,
            value: "0".into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(value)
}

fn parse_url(key: &'static str, raw: &str) -> Result<Url, ConfigLoadError> {
    // Endpoints are joined relative to the base, which needs a trailing slash.
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized)
        .map_err(|source| ConfigLoadError::InvalidUrl { key, source })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> EnvConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvConfig::from_lookup(|key| map.get(key).cloned())
    }

    fn credentials() -> Vec<(&'static str, &'static str)> {
        vec![
            (sources::ENV_TELEGRAM_BOT_TOKEN, "123:abc"),
            (sources::ENV_TELEGRAM_CHAT_ID, "-100500"),
            (sources::ENV_YANDEX_TOKEN, "y0_token"),
        ]
    }

    fn resolve(pairs: &[(&str, &str)]) -> Result<ConfigLoad, ConfigLoadError> {
        compose(env(pairs), FileConfig::default(), ConfigMetadata::default())
    }

    #[test]
    fn defaults_apply_when_only_credentials_are_set() {
        let load = resolve(&credentials()).unwrap();
        let config = load.config;

        assert_eq!(config.folders, vec!["/"]);
        assert_eq!(config.check_interval, Duration::from_secs(120));
        assert_eq!(config.cooldown_factor, 5);
        assert_eq!(config.yandex.page_size, 1000);
        assert_eq!(config.telegram.chat_id, "-100500");
        assert_eq!(config.telegram.bot_token.expose(), "123:abc");
        assert_eq!(config.yandex.api_base.as_str(), "https://cloud-api.yandex.net/");
        assert!(load.warnings.is_empty());
    }

    #[test]
    fn every_missing_credential_is_reported() {
        let err = resolve(&[(sources::ENV_TELEGRAM_CHAT_ID, "1")]).unwrap_err();
        match err {
            ConfigLoadError::MissingRequired { keys } => {
                assert_eq!(keys, vec!["TELEGRAM_BOT_TOKEN", "YANDEX_TOKEN"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_interval_is_rejected() {
        let mut pairs = credentials();
        pairs.push((sources::ENV_CHECK_INTERVAL, "two minutes"));
        let err = resolve(&pairs).unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::InvalidValue {
                key: "CHECK_INTERVAL_SECONDS",
                ..
            }
        ));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut pairs = credentials();
        pairs.push((sources::ENV_CHECK_INTERVAL, "0"));
        assert!(resolve(&pairs).is_err());
    }

    #[test]
    fn low_cooldown_factor_is_raised_with_a_warning() {
        let mut pairs = credentials();
        pairs.push((sources::ENV_COOLDOWN_FACTOR, "2"));
        let load = resolve(&pairs).unwrap();

        assert_eq!(load.config.cooldown_factor, 5);
        assert_eq!(
            load.warnings,
            vec![ConfigWarning::CooldownFactorRaised {
                requested: 2,
                applied: 5
            }]
        );
    }

    #[test]
    fn duplicate_folders_are_collapsed() {
        let mut pairs = credentials();
        pairs.push((sources::ENV_FOLDER_PATHS, "/docs, /photos, /docs"));
        let load = resolve(&pairs).unwrap();

        assert_eq!(load.config.folders, vec!["/docs", "/photos"]);
        assert_eq!(
            load.warnings,
            vec![ConfigWarning::DuplicateFolder("/docs".into())]
        );
    }

    #[test]
    fn blank_folder_variable_falls_back_to_root() {
        let mut pairs = credentials();
        pairs.push((sources::ENV_FOLDER_PATHS, "   "));
        let load = resolve(&pairs).unwrap();
        assert_eq!(load.config.folders, vec!["/"]);
    }

    #[test]
    fn empty_folder_list_is_rejected() {
        let mut pairs = credentials();
        pairs.push((sources::ENV_FOLDER_PATHS, " , "));
        assert!(matches!(
            resolve(&pairs).unwrap_err(),
            ConfigLoadError::InvalidValue {
                key: "YANDEX_FOLDER_PATHS",
                ..
            }
        ));
    }

    #[test]
    fn api_base_gains_a_trailing_slash() {
        let mut pairs = credentials();
        pairs.push((sources::ENV_YANDEX_API_BASE, "http://127.0.0.1:8080/proxy"));
        let load = resolve(&pairs).unwrap();
        assert_eq!(
            load.config.yandex.api_base.as_str(),
            "http://127.0.0.1:8080/proxy/"
        );
    }

    #[test]
    fn monitor_config_carries_interval_and_destination() {
        let mut pairs = credentials();
        pairs.push((sources::ENV_CHECK_INTERVAL, "30"));
        let config = resolve(&pairs).unwrap().config;
        let monitor = config.monitor_config();

        assert_eq!(monitor.destination, "-100500");
        assert_eq!(monitor.poll_interval, Duration::from_secs(30));
        assert_eq!(monitor.cooldown(), Duration::from_secs(150));
    }
}
