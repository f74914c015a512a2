//! Configuration management

use anyhow::Result;

/// Service-level configuration for embedding applications.
///
/// Scheduling parameters themselves ([`crate::types::AiSettings`],
/// [`crate::types::AppSettings`]) are passed explicitly into every core
/// function; this struct only covers the external collaborators.
#[derive(Debug, Clone)]
pub struct Config {
    /// Distance/map service base URL (optional, falls back to mock if unset)
    pub distance_service_url: Option<String>,

    /// Hub address used as the default departure source for new schedules
    pub hub_address: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let distance_service_url = std::env::var("DISTANCE_SERVICE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let hub_address = std::env::var("HUB_ADDRESS")
            .ok()
            .filter(|s| !s.trim().is_empty());

        if distance_service_url.is_none() {
            tracing::warn!("DISTANCE_SERVICE_URL not set, distance lookups will use the mock service");
        }

        Ok(Self {
            distance_service_url,
            hub_address,
        })
    }
}
