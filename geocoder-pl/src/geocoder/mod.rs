//! Client du géocodeur Nominatim / OpenStreetMap
//!
//! Utilisé pour relocaliser les points adresse tombés hors de leur gmina.
//! L'instance publique limite à une requête par seconde.
//!
//! Voir <https://nominatim.org/release-docs/develop/api/Search/>

pub mod retry;

use anyhow::{Context, Result};
use geo::Coord;
use sektor::{GeocodeError, Geocoder};

use std::time::Duration;

use crate::config::GeocoderSettings;
use retry::{with_retry, Pacer, RetryPolicy};

/// Géocodeur Nominatim avec nouvelles tentatives bornées
pub struct NominatimGeocoder {
    client: reqwest::Client,
    url: String,
    policy: RetryPolicy,
    pacer: Pacer,
}

impl NominatimGeocoder {
    pub fn new(settings: &GeocoderSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url: settings.url.clone(),
            policy: RetryPolicy::from_settings(settings),
            pacer: Pacer::new(Duration::from_millis(settings.min_interval_ms)),
        })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Une requête de recherche en texte libre, sans nouvelle tentative
    async fn search_once(&self, address: &str) -> Result<Option<Coord<f64>>, GeocodeError> {
        self.pacer.wait().await;
        let resp = self
            .client
            .get(&self.url)
            .query(&[
                ("q", address),
                ("countrycodes", "pl"),
                ("format", "jsonv2"),
                ("limit", "1"),
            ])
            .send()
            .await
            .map_err(request_error)?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }
        if status.is_server_error() {
            return Err(GeocodeError::Http(format!("HTTP {}", status)));
        }
        if status.is_client_error() {
            return Err(GeocodeError::Rejected(status.as_u16()));
        }

        let body: serde_json::Value = resp.json().await.map_err(|e| GeocodeError::Parse(e.to_string()))?;
        parse_response(&body)
    }
}

impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coord<f64>>, GeocodeError> {
        with_retry(&self.policy, || self.search_once(address)).await
    }
}

fn request_error(e: reqwest::Error) -> GeocodeError {
    if e.is_timeout() {
        GeocodeError::Timeout
    } else {
        GeocodeError::Http(e.to_string())
    }
}

/// Extrait `(lon, lat)` du premier résultat ; liste vide → `None`
pub fn parse_response(body: &serde_json::Value) -> Result<Option<Coord<f64>>, GeocodeError> {
    let results = body
        .as_array()
        .ok_or_else(|| GeocodeError::Parse("Nominatim response is not an array".to_string()))?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = first["lat"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse("Missing lat in Nominatim response".to_string()))?;

    let lon = first["lon"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse("Missing lon in Nominatim response".to_string()))?;

    Ok(Some(Coord { x: lon, y: lat }))
}
