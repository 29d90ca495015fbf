use std::sync::Arc;

use diskwatch_config::Config;
use diskwatch_core::{
    FolderMonitor, SinkError, StorageBackend, StorageError,
    providers::{BotIdentity, TelegramSink, YandexDiskClient},
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build the Yandex.Disk client")]
    StorageClient(#[source] StorageError),
    #[error("failed to build the Telegram client")]
    SinkClient(#[source] SinkError),
    #[error("Yandex.Disk rejected the OAuth token; check YANDEX_TOKEN")]
    InvalidStorageCredentials,
    #[error("could not verify Yandex.Disk credentials")]
    CredentialCheck(#[source] StorageError),
    #[error("Telegram rejected the bot token; check TELEGRAM_BOT_TOKEN")]
    BotCheck(#[source] SinkError),
}

/// The two live API clients, shared between the monitor and startup checks.
#[derive(Debug, Clone)]
pub struct Services {
    pub storage: Arc<YandexDiskClient>,
    pub sink: Arc<TelegramSink>,
}

impl Services {
    pub fn build(config: &Config) -> Result<Self, StartupError> {
        let storage = YandexDiskClient::new(config.yandex_client_config())
            .map_err(StartupError::StorageClient)?;
        let sink = TelegramSink::new(config.telegram_client_config())
            .map_err(StartupError::SinkClient)?;

        Ok(Self {
            storage: Arc::new(storage),
            sink: Arc::new(sink),
        })
    }

    pub fn monitor(&self, config: &Config) -> FolderMonitor {
        FolderMonitor::new(
            config.monitor_config(),
            self.storage.clone(),
            self.sink.clone(),
        )
    }
}

/// Refuse to start unless the storage token is accepted. Not retried; the
/// caller logs the returned error.
pub async fn verify_storage_access(
    storage: &dyn StorageBackend,
) -> Result<(), StartupError> {
    match storage.check_credentials().await {
        Ok(true) => {
            info!("Yandex.Disk token accepted");
            Ok(())
        }
        Ok(false) => Err(StartupError::InvalidStorageCredentials),
        Err(err) => Err(StartupError::CredentialCheck(err)),
    }
}

pub async fn verify_bot(sink: &TelegramSink) -> Result<BotIdentity, StartupError> {
    let identity = sink.get_me().await.map_err(StartupError::BotCheck)?;
    info!(
        bot_id = identity.id,
        username = identity.username.as_deref().unwrap_or("<none>"),
        "Telegram bot token accepted"
    );
    Ok(identity)
}
