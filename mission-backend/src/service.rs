//! The seven read operations behind the HTTP routes.
//!
//! Every operation goes through one shared [`ResponseCache`] keyed by
//! resource, storing normalized JSON. Upstream payloads are reshaped by the
//! mapper in `mission_common::normalize` before they are cached.

use std::sync::Arc;
use std::time::Duration;

use mission_common::normalize;
use mission_common::{
    Apod, Clock, EarthImage, EpicArchive, ImageSearchPage, LaunchDetail, NormalizedLaunch,
    ResponseCache, StatusPolicy, SystemClock,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;

use crate::config::BackendConfig;
use crate::error::{MissionError, Result};
use crate::upstream::{LaunchLibrary, NasaApi, Upstream};

pub const UPCOMING_KEY: &str = "upcoming_launches";
pub const PREVIOUS_KEY: &str = "previous_launches";
pub const ALL_MISSIONS_KEY: &str = "all_missions";
pub const APOD_KEY: &str = "nasa_apod";
pub const EPIC_KEY: &str = "nasa_epic";

/// Per-resource cache lifetimes.
#[derive(Debug, Clone, Copy)]
pub struct CacheTtls {
    pub default: Duration,
    pub apod: Duration,
    pub epic: Duration,
}

impl From<&BackendConfig> for CacheTtls {
    fn from(config: &BackendConfig) -> Self {
        Self {
            default: config.cache_ttl(),
            apod: config.apod_ttl(),
            epic: config.epic_ttl(),
        }
    }
}

impl Default for CacheTtls {
    fn default() -> Self {
        CacheTtls::from(&BackendConfig::default())
    }
}

struct ServiceInner {
    upstream: Arc<dyn Upstream>,
    launches: LaunchLibrary,
    nasa: NasaApi,
    archive: EpicArchive,
    policy: StatusPolicy,
    ttls: CacheTtls,
    cache: ResponseCache<Value, MissionError>,
}

/// Data access layer shared by all request handlers. Cheap to clone.
#[derive(Clone)]
pub struct MissionService {
    inner: Arc<ServiceInner>,
}

/// Cache occupancy, for `/stats`.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub in_flight: usize,
}

impl MissionService {
    pub fn new(config: &BackendConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self::with_clock(config, upstream, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: &BackendConfig,
        upstream: Arc<dyn Upstream>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ttls = CacheTtls::from(config);
        info!(
            "Mission service ready (status policy: {}, default ttl: {:?})",
            config.status_policy, ttls.default
        );

        Self {
            inner: Arc::new(ServiceInner {
                upstream,
                launches: LaunchLibrary::from(config),
                nasa: NasaApi::from(config),
                archive: EpicArchive {
                    base_url: config.nasa_epic_archive_url.clone(),
                    api_key: config.nasa_api_key.clone(),
                },
                policy: config.status_policy,
                ttls,
                cache: ResponseCache::with_clock(ttls.default, clock),
            }),
        }
    }

    pub async fn cache_stats(&self) -> CacheStats {
        CacheStats {
            entries: self.inner.cache.len().await,
            in_flight: self.inner.cache.in_flight().await,
        }
    }

    pub async fn upcoming_launches(&self) -> Result<Vec<NormalizedLaunch>> {
        let url = self.inner.launches.upcoming();
        self.launch_list(UPCOMING_KEY, url).await
    }

    pub async fn previous_launches(&self) -> Result<Vec<NormalizedLaunch>> {
        let url = self.inner.launches.previous();
        self.launch_list(PREVIOUS_KEY, url).await
    }

    pub async fn launch_by_id(&self, id: &str) -> Result<LaunchDetail> {
        let id = id.trim();
        if id.is_empty() {
            return Err(MissionError::InvalidRequest("Launch id is required".to_string()));
        }

        let url = self.inner.launches.launch(id);
        let policy = self.inner.policy;
        self.cached(format!("launch_{}", id), self.inner.ttls.default, url, move |raw| {
            normalize::normalize_launch_detail(&raw, policy)
        })
        .await
    }

    pub async fn picture_of_day(&self) -> Result<Apod> {
        let url = self.inner.nasa.apod();
        self.cached(APOD_KEY, self.inner.ttls.apod, url, |raw| {
            normalize::normalize_apod(&raw)
        })
        .await
    }

    pub async fn search_images(&self, query: &str, page: u32) -> Result<ImageSearchPage> {
        let query = query.trim();
        if query.is_empty() {
            return Err(MissionError::InvalidRequest(
                "Search query is required".to_string(),
            ));
        }
        if page == 0 {
            return Err(MissionError::InvalidRequest(
                "Page numbers start at 1".to_string(),
            ));
        }

        let url = self.inner.nasa.image_search(query, page);
        let key = format!("nasa_search_{}_{}", query, page);
        self.cached(key, self.inner.ttls.default, url, move |raw| {
            normalize::normalize_image_search(&raw, page)
        })
        .await
    }

    pub async fn earth_imagery(&self) -> Result<Vec<EarthImage>> {
        let url = self.inner.nasa.epic_natural();
        let archive = self.inner.archive.clone();
        self.cached(EPIC_KEY, self.inner.ttls.epic, url, move |raw| {
            normalize::normalize_earth_images(&raw, &archive)
        })
        .await
    }

    /// Upcoming followed by previous launches. Both halves go through the
    /// cache as well and are fetched concurrently.
    pub async fn all_missions(&self) -> Result<Vec<NormalizedLaunch>> {
        let service = self.clone();
        let value = self
            .inner
            .cache
            .get_or_fetch(ALL_MISSIONS_KEY, self.inner.ttls.default, move || async move {
                let (mut upcoming, previous) =
                    tokio::try_join!(service.upcoming_launches(), service.previous_launches())?;
                upcoming.extend(previous);
                Ok(serde_json::to_value(upcoming)?)
            })
            .await?;
        decode(value)
    }

    async fn launch_list(&self, key: &str, url: String) -> Result<Vec<NormalizedLaunch>> {
        let policy = self.inner.policy;
        self.cached(key, self.inner.ttls.default, url, move |raw| {
            normalize::normalize_launches(&raw, policy)
        })
        .await
    }

    /// Fetch `url`, normalize it and cache the normalized JSON under `key`.
    async fn cached<T, F>(
        &self,
        key: impl Into<String>,
        ttl: Duration,
        url: String,
        normalize: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Value) -> T + Send + 'static,
    {
        let upstream = Arc::clone(&self.inner.upstream);
        let value = self
            .inner
            .cache
            .get_or_fetch(key, ttl, move || async move {
                let raw = upstream.get_json(&url).await?;
                Ok(serde_json::to_value(normalize(raw))?)
            })
            .await?;
        decode(value)
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(MissionError::from)
}
