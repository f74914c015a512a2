//! Distance/mapping service client.
//!
//! The scheduling engine itself never touches the network: the caller
//! resolves the distances a run needs up front (hub to site, and
//! site-to-site pairs for co-join probing) and hands them to the engine
//! as a lookup. Lookups are best-effort; an unresolved distance leaves
//! the field unset for manual entry and simply disqualifies co-join
//! pairings that depend on it.
//!
//! `MockDistanceService` is deterministic and offline, for tests and
//! development.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::Config;

/// A resolved route between two addresses.
#[derive(Debug, Clone)]
pub struct DistanceResult {
    pub distance_km: f64,
    pub map_url: Option<String>,
    /// Addresses as normalized by the service.
    pub from_address: String,
    pub to_address: String,
}

/// Abstraction over the external distance service.
#[async_trait]
pub trait DistanceService: Send + Sync {
    /// Driving route between two addresses. `Ok(None)` when the service
    /// cannot resolve the pair; hard failures only for transport errors.
    async fn route(&self, from: &str, to: &str) -> Result<Option<DistanceResult>>;

    fn name(&self) -> &'static str;
}

/// Pick the backend from configuration: HTTP when a service URL is set,
/// otherwise the offline mock.
pub fn from_config(config: &Config) -> Arc<dyn DistanceService> {
    match &config.distance_service_url {
        Some(url) => {
            tracing::info!(url, "using HTTP distance service");
            Arc::new(HttpDistanceClient::new(url))
        }
        None => {
            tracing::info!("no distance service configured, using mock");
            Arc::new(MockDistanceService)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteResponse {
    success: bool,
    distance: Option<RouteDistance>,
    map_url: Option<String>,
    from: Option<RouteEndpoint>,
    to: Option<RouteEndpoint>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RouteDistance {
    km: f64,
}

#[derive(Debug, Deserialize)]
struct RouteEndpoint {
    address: String,
}

/// HTTP client for the distance-and-map service.
pub struct HttpDistanceClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpDistanceClient {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("rentops-scheduler/0.3")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl DistanceService for HttpDistanceClient {
    async fn route(&self, from: &str, to: &str) -> Result<Option<DistanceResult>> {
        let url = format!(
            "{}/route?from={}&to={}",
            self.base_url,
            urlencoding::encode(from),
            urlencoding::encode(to)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send distance request")?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "distance service returned an error status");
            return Ok(None);
        }

        let body: RouteResponse = response
            .json()
            .await
            .context("Failed to parse distance response")?;

        if !body.success {
            tracing::debug!(
                from,
                to,
                error = body.error.as_deref().unwrap_or("unknown"),
                "distance unresolved"
            );
            return Ok(None);
        }

        let Some(distance) = body.distance else {
            return Ok(None);
        };

        Ok(Some(DistanceResult {
            distance_km: distance.km,
            map_url: body.map_url,
            from_address: body.from.map_or_else(|| from.to_string(), |e| e.address),
            to_address: body.to.map_or_else(|| to.to_string(), |e| e.address),
        }))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Deterministic offline backend: the distance between two addresses is a
/// hash of the (unordered) pair, so repeated lookups agree and the result
/// is symmetric.
pub struct MockDistanceService;

impl MockDistanceService {
    fn pair_km(from: &str, to: &str) -> f64 {
        if from == to {
            return 0.0;
        }
        let (a, b) = if from <= to { (from, to) } else { (to, from) };
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in a.bytes().chain([0u8]).chain(b.bytes()) {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        // 0.1 – 40.0 km
        (hash % 400) as f64 / 10.0 + 0.1
    }
}

#[async_trait]
impl DistanceService for MockDistanceService {
    async fn route(&self, from: &str, to: &str) -> Result<Option<DistanceResult>> {
        Ok(Some(DistanceResult {
            distance_km: Self::pair_km(from, to),
            map_url: None,
            from_address: from.to_string(),
            to_address: to.to_string(),
        }))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Pre-resolved distances for one engine invocation, keyed on the
/// unordered address pair. Bridges the async service boundary to the
/// synchronous lookup the engine takes.
#[derive(Debug, Clone, Default)]
pub struct DistanceTable {
    entries: HashMap<(String, String), f64>,
}

impl DistanceTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(from: &str, to: &str) -> (String, String) {
        if from <= to {
            (from.to_string(), to.to_string())
        } else {
            (to.to_string(), from.to_string())
        }
    }

    pub fn insert(&mut self, from: &str, to: &str, km: f64) {
        self.entries.insert(Self::key(from, to), km);
    }

    pub fn km(&self, from: &str, to: &str) -> Option<f64> {
        if from == to {
            return Some(0.0);
        }
        self.entries.get(&Self::key(from, to)).copied()
    }

    /// Resolve every pair through the service, best-effort. Pairs the
    /// service cannot resolve are left absent.
    pub async fn resolve(
        &mut self,
        service: &dyn DistanceService,
        pairs: &[(&str, &str)],
    ) -> Result<()> {
        for (from, to) in pairs {
            if self.km(from, to).is_some() {
                continue;
            }
            match service.route(from, to).await {
                Ok(Some(result)) => self.insert(from, to, result.distance_km),
                Ok(None) => {
                    tracing::debug!(from, to, "pair left unresolved");
                }
                Err(e) => {
                    tracing::warn!(from, to, error = %e, "distance lookup failed");
                }
            }
        }
        Ok(())
    }
}
