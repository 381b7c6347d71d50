use std::sync::Arc;

use anyhow::Result;
use mission_backend::config;
use mission_backend::upstream::HttpUpstream;
use mission_backend::{api, logging, MissionService};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = config::read_config()?;

    // Initialize logging
    let _logging_guard = logging::init_logging(
        &config.log_dir,
        "mission-backend",
        &config.log_level,
        config.log_retention_days,
    )?;

    tracing::info!("Mission backend starting...");
    tracing::info!(
        "Launch Library: {}, NASA API: {}, NASA images: {}",
        config.launch_library_url,
        config.nasa_api_url,
        config.nasa_images_url
    );

    let upstream = HttpUpstream::from_config(config)?;
    let service = MissionService::new(config, Arc::new(upstream));
    let app = api::router(service);

    // Bind to address
    let addr = config.server_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("HTTP server listening on http://{}", listener.local_addr()?);

    // Start the server
    axum::serve(listener, app).await?;

    Ok(())
}
