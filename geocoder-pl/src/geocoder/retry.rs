//! Nouvelles tentatives bornées pour le géocodeur externe
//!
//! Délai exponentiel `base_delay × 2^tentative`, délai maximal par requête,
//! abandon explicite après `max_attempts` essais.

use std::future::Future;
use std::time::Duration;

use sektor::GeocodeError;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::warn;

use crate::config::GeocoderSettings;

/// Politique de nouvelles tentatives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn from_settings(settings: &GeocoderSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: Duration::from_millis(settings.base_delay_ms),
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }

    /// Attente avant la tentative `attempt + 1`
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

/// Espace les requêtes d'au moins `min_interval`
#[derive(Debug)]
pub struct Pacer {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    /// Attend le créneau suivant puis le réserve
    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            tokio::time::sleep_until(previous + self.min_interval).await;
        }
        *last = Some(Instant::now());
    }
}

/// Exécute `op` jusqu'à succès, erreur définitive ou épuisement des essais
///
/// Les erreurs `RateLimited`, `Http` et `Timeout` sont retentées ; les autres
/// sont rendues immédiatement.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, GeocodeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GeocodeError>>,
{
    let mut last = GeocodeError::Timeout;

    for attempt in 0..policy.max_attempts {
        if attempt > 0 {
            let delay = policy.delay(attempt - 1);
            warn!(
                attempt,
                max_attempts = policy.max_attempts,
                delay = ?delay,
                error = %last,
                "Retrying geocoder request"
            );
            tokio::time::sleep(delay).await;
        }

        match tokio::time::timeout(policy.timeout, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) if e.is_retryable() => last = e,
            Ok(Err(e)) => return Err(e),
            Err(_) => last = GeocodeError::Timeout,
        }
    }

    Err(GeocodeError::Exhausted {
        attempts: policy.max_attempts,
        last: last.to_string(),
    })
}
