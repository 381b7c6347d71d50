///! Typed client for the mission proxy's HTTP routes
use std::time::Duration;

use mission_common::{
    Apod, EarthImage, ImageSearchPage, LaunchDetail, NormalizedLaunch, ResponseCache,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ClientError, Result};
use crate::fallback;

pub const DEFAULT_CLIENT_TTL: Duration = Duration::from_secs(5 * 60);

/// Reads from a running `mission-backend`, caching each decoded response.
#[derive(Clone)]
pub struct MissionClient {
    base_url: String,
    http: Client,
    cache: ResponseCache<Value, ClientError>,
}

impl MissionClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_ttl(base_url, DEFAULT_CLIENT_TTL)
    }

    pub fn with_ttl(base_url: impl Into<String>, ttl: Duration) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            cache: ResponseCache::new(ttl),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn upcoming_launches(&self) -> Result<Vec<NormalizedLaunch>> {
        self.get("/api/launches/upcoming", "launches").await
    }

    pub async fn previous_launches(&self) -> Result<Vec<NormalizedLaunch>> {
        self.get("/api/launches/previous", "launches").await
    }

    pub async fn launch_by_id(&self, id: &str) -> Result<LaunchDetail> {
        let path = format!("/api/launches/{}", urlencoding::encode(id.trim()));
        self.get(&path, "launch").await
    }

    pub async fn picture_of_day(&self) -> Result<Apod> {
        self.get("/api/nasa/apod", "apod").await
    }

    pub async fn search_images(&self, query: &str, page: u32) -> Result<ImageSearchPage> {
        let path = format!(
            "/api/nasa/search?q={}&page={}",
            urlencoding::encode(query),
            page
        );
        // The search response is the page itself, not wrapped in a field.
        let value = self.fetch(&path).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn earth_imagery(&self) -> Result<Vec<EarthImage>> {
        self.get("/api/nasa/epic", "epic").await
    }

    pub async fn all_missions(&self) -> Result<Vec<NormalizedLaunch>> {
        self.get("/api/missions", "missions").await
    }

    /// Like [`MissionClient::all_missions`], but serves the bundled mission
    /// list when the proxy call fails.
    pub async fn missions_or_fallback(&self) -> Result<Vec<NormalizedLaunch>> {
        match self.all_missions().await {
            Ok(missions) => Ok(missions),
            Err(e) => {
                tracing::warn!("Mission list unavailable ({}), using fallback data", e);
                fallback::missions()
            }
        }
    }

    /// Fetch `path` and decode the value under `field`.
    async fn get<T: DeserializeOwned>(&self, path: &str, field: &str) -> Result<T> {
        let mut value = self.fetch(path).await?;
        let inner = value
            .get_mut(field)
            .map(Value::take)
            .ok_or_else(|| ClientError::Decode(format!("missing '{}' in response", field)))?;
        Ok(serde_json::from_value(inner)?)
    }

    /// Raw response body for `path`, through the cache.
    async fn fetch(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let http = self.http.clone();
        self.cache
            .get_or_fetch_default(path, move || async move {
                tracing::debug!("GET {}", url);
                let response = http.get(&url).send().await?;
                let status = response.status();
                if !status.is_success() {
                    let body: Value = response.json().await.unwrap_or(Value::Null);
                    let message = body
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed"))
                        .to_string();
                    return Err(ClientError::Status {
                        status: status.as_u16(),
                        message,
                    });
                }
                Ok(response.json::<Value>().await?)
            })
            .await
    }
}
