use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::StorageError;
use crate::secret::Secret;
use crate::storage::StorageBackend;

use super::USER_AGENT;

pub const YANDEX_DISK_API_BASE: &str = "https://cloud-api.yandex.net/";
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

const LISTING_FIELDS: &str =
    "_embedded.items.name,_embedded.limit,_embedded.offset,_embedded.total";

#[derive(Debug, Clone)]
pub struct YandexDiskConfig {
    pub token: Secret,
    pub api_base: Url,
    /// Entries requested per listing call
    pub page_size: u32,
    pub timeout: Duration,
}

impl YandexDiskConfig {
    pub fn new(token: Secret) -> Self {
        Self {
            token,
            api_base: default_api_base(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout: Duration::from_secs(30),
        }
    }
}

fn default_api_base() -> Url {
    Url::parse(YANDEX_DISK_API_BASE).expect("static URL is valid")
}

/// Yandex.Disk REST client covering folder listings and token checks.
pub struct YandexDiskClient {
    http: reqwest::Client,
    token: Secret,
    resources_url: Url,
    disk_url: Url,
    page_size: u32,
}

impl fmt::Debug for YandexDiskClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YandexDiskClient")
            .field("resources_url", &self.resources_url.as_str())
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct ListingQuery<'a> {
    path: &'a str,
    limit: u32,
    offset: u64,
    fields: &'static str,
}

#[derive(Debug, Deserialize)]
struct Resource {
    #[serde(rename = "_embedded")]
    embedded: Option<ResourceList>,
}

#[derive(Debug, Deserialize)]
struct ResourceList {
    #[serde(default)]
    items: Vec<ResourceItem>,
    #[serde(default)]
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ResourceItem {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl YandexDiskClient {
    pub fn new(config: YandexDiskConfig) -> Result<Self, StorageError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()?;

        let resources_url = join(&config.api_base, "v1/disk/resources")?;
        let disk_url = join(&config.api_base, "v1/disk/")?;

        Ok(Self {
            http,
            token: config.token,
            resources_url,
            disk_url,
            page_size: config.page_size.max(1),
        })
    }

    async fn get_json<Q, T>(
        &self,
        url: &Url,
        query: &Q,
        path: &str,
    ) -> Result<T, StorageError>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .get(url.clone())
            .header(
                reqwest::header::AUTHORIZATION,
                format!("OAuth {}", self.token.expose()),
            )
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|err| StorageError::Decode(err.to_string()));
        }

        let message = response
            .json::<ApiErrorBody>()
            .await
            .ok()
            .and_then(|body| body.description.or(body.message))
            .unwrap_or_else(|| {
                format!("Yandex.Disk request failed with status {}", status)
            });

        Err(match status {
            StatusCode::NOT_FOUND => StorageError::NotFound(path.to_string()),
            StatusCode::UNAUTHORIZED => StorageError::Unauthorized,
            StatusCode::TOO_MANY_REQUESTS => StorageError::RateLimited,
            _ => StorageError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl StorageBackend for YandexDiskClient {
    async fn list_names(
        &self,
        folder: &str,
    ) -> Result<HashSet<String>, StorageError> {
        let mut names = HashSet::new();
        let mut offset: u64 = 0;

        loop {
            let query = ListingQuery {
                path: folder,
                limit: self.page_size,
                offset,
                fields: LISTING_FIELDS,
            };
            let resource: Resource =
                self.get_json(&self.resources_url, &query, folder).await?;

            let page = resource.embedded.ok_or_else(|| {
                StorageError::Decode(format!("'{folder}' is not a directory"))
            })?;

            let fetched = page.items.len() as u64;
            names.extend(page.items.into_iter().map(|item| item.name));
            offset += fetched;

            let exhausted = match page.total {
                Some(total) => offset >= total,
                None => fetched < u64::from(self.page_size),
            };
            if fetched == 0 || exhausted {
                break;
            }
        }

        debug!(folder, count = names.len(), "listed folder");
        Ok(names)
    }

    async fn check_credentials(&self) -> Result<bool, StorageError> {
        #[derive(Debug, Deserialize)]
        struct DiskInfo {}

        match self
            .get_json::<_, DiskInfo>(&self.disk_url, &[("fields", "total_space")], "/")
            .await
        {
            Ok(_) => Ok(true),
            Err(StorageError::Unauthorized) => Ok(false),
            Err(StorageError::Api { status: 403, .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

fn join(base: &Url, path: &str) -> Result<Url, StorageError> {
    base.join(path).map_err(|err| {
        StorageError::Decode(format!("invalid API base {base}: {err}"))
    })
}
