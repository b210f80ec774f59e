use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gymbook_core::config::AlertingConfig;
use tracing::{info, warn};

use crate::{types::Tags, webhook::WebhookAlertSink};

/// Destination for operational alerts raised by the booking loop.
///
/// Reporting is fire-and-forget: implementations must not block the caller and
/// must swallow their own delivery failures. Call [`AlertSink::flush`] before
/// the runtime exits so queued alerts are not lost.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Stable lowercase identifier used in logs (e.g. `"webhook"`).
    fn name(&self) -> &str;

    /// Queue `message` with `tags` for delivery.
    fn report(&self, message: &str, tags: &Tags);

    /// Wait up to `timeout` for queued alerts to finish. Returns `false` if
    /// some were still pending and got dropped.
    async fn flush(&self, _timeout: Duration) -> bool {
        true
    }
}

/// Sink used when alerting is not configured. Drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAlertSink;

impl AlertSink for NoopAlertSink {
    fn name(&self) -> &str {
        "noop"
    }

    fn report(&self, _message: &str, _tags: &Tags) {}
}

/// Build the sink described by `config`.
///
/// Missing configuration, or an endpoint that cannot be used, yields the
/// no-op sink; alerting never stops the scheduler from starting.
pub fn from_config(config: Option<&AlertingConfig>) -> Arc<dyn AlertSink> {
    let Some(cfg) = config else {
        return Arc::new(NoopAlertSink);
    };

    match WebhookAlertSink::new(&cfg.endpoint, cfg.secret.clone()) {
        Ok(sink) => {
            info!(endpoint = %cfg.endpoint, signed = cfg.secret.is_some(), "alert webhook enabled");
            Arc::new(sink)
        }
        Err(e) => {
            warn!(error = %e, "alert webhook disabled");
            Arc::new(NoopAlertSink)
        }
    }
}
