pub mod client;
pub mod endpoints;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub use client::HttpUpstream;
pub use endpoints::{LaunchLibrary, NasaApi};

/// Source of raw upstream JSON.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn get_json(&self, url: &str) -> Result<Value>;
}
