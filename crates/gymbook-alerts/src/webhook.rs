//! Alert delivery over HTTP.
//!
//! Each alert is POSTed as JSON on a spawned task. When a secret is configured
//! the body is signed GitHub-style: `X-Gymbook-Signature: sha256=<hex>`.
//! Spawned deliveries are tracked so `flush` can wait for them on shutdown.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use url::Url;

use crate::{
    error::AlertError,
    sink::AlertSink,
    types::{Alert, Tags},
};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-gymbook-signature";
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts alerts to a webhook endpoint.
#[derive(Clone)]
pub struct WebhookAlertSink {
    client: reqwest::Client,
    endpoint: Url,
    secret: Option<String>,
    in_flight: Arc<Mutex<JoinSet<()>>>,
}

impl WebhookAlertSink {
    pub fn new(endpoint: &str, secret: Option<String>) -> Result<Self, AlertError> {
        let invalid = |reason: String| AlertError::InvalidEndpoint {
            url: endpoint.to_string(),
            reason,
        };

        let endpoint = Url::parse(endpoint.trim()).map_err(|e| invalid(e.to_string()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(invalid("expected an http(s) URL".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            secret: secret.filter(|s| !s.is_empty()),
            in_flight: Arc::new(Mutex::new(JoinSet::new())),
        })
    }

    /// Send one alert and wait for the endpoint to accept it.
    pub async fn deliver(&self, alert: &Alert) -> Result<(), AlertError> {
        let body = serde_json::to_vec(alert)?;

        let mut req = self
            .client
            .post(self.endpoint.clone())
            .header("content-type", "application/json");
        if let Some(ref secret) = self.secret {
            req = req.header(SIGNATURE_HEADER, format!("sha256={}", sign(secret, &body)));
        }

        let resp = req.body(body).send().await?;
        if !resp.status().is_success() {
            return Err(AlertError::Rejected {
                status: resp.status().as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AlertSink for WebhookAlertSink {
    fn name(&self) -> &str {
        "webhook"
    }

    fn report(&self, message: &str, tags: &Tags) {
        let alert = Alert::new(message, tags);

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("no Tokio runtime; alert dropped");
            return;
        };

        let sink = self.clone();
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        while in_flight.try_join_next().is_some() {}
        in_flight.spawn_on(
            async move {
                match sink.deliver(&alert).await {
                    Ok(()) => debug!(message = %alert.message, "alert delivered"),
                    Err(e) => warn!(error = %e, "alert delivery failed"),
                }
            },
            &handle,
        );
    }

    async fn flush(&self, timeout: Duration) -> bool {
        let mut pending =
            std::mem::take(&mut *self.in_flight.lock().unwrap_or_else(|e| e.into_inner()));
        if pending.is_empty() {
            return true;
        }

        let drained = tokio::time::timeout(timeout, async {
            while pending.join_next().await.is_some() {}
        })
        .await
        .is_ok();

        if !drained {
            warn!(pending = pending.len(), "alert flush timed out; undelivered alerts dropped");
        }
        drained
    }
}

/// Hex HMAC-SHA256 of `body` keyed with `secret`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length, so this cannot fail.
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
