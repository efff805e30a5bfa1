//! Best-effort device geolocation for maps-grounded queries.
//!
//! Failure is never an error here: the location-grounded call is simply
//! made without a position.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::constants::{IP_LOOKUP_URL, LOCATE_TIMEOUT_SECS};
use crate::gateway::Coordinates;
use crate::util::env_first;

/// The geolocation collaborator: one outstanding lookup per query, no retry.
#[async_trait]
pub trait Locator: Send + Sync {
    async fn request_position(&self) -> Option<Coordinates>;
}

/// Resolves a position from `AGENTFI_LAT`/`AGENTFI_LNG`, falling back to a
/// single IP-geolocation lookup.
pub struct IpLocator {
    http_client: HttpClient,
}

impl IpLocator {
    pub fn new() -> Self {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(LOCATE_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        IpLocator { http_client }
    }
}

#[derive(Deserialize)]
struct IpLookup {
    lat: f64,
    lon: f64,
}

#[async_trait]
impl Locator for IpLocator {
    async fn request_position(&self) -> Option<Coordinates> {
        if let Some(position) = env_override() {
            return Some(position);
        }

        let response = self.http_client.get(IP_LOOKUP_URL).send().await.ok()?;
        let lookup: IpLookup = response.json().await.ok()?;
        Some(Coordinates {
            lat: lookup.lat,
            lng: lookup.lon,
        })
    }
}

fn env_override() -> Option<Coordinates> {
    let lat = env_first(&["AGENTFI_LAT"])?.trim().parse::<f64>().ok()?;
    let lng = env_first(&["AGENTFI_LNG"])?.trim().parse::<f64>().ok()?;
    Some(Coordinates { lat, lng })
}
