use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Free-form key/value labels attached to an alert (`phase`, `club`, …).
pub type Tags = BTreeMap<String, String>;

/// JSON body POSTed to the alert webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Human-readable error text.
    pub message: String,

    /// Context labels, sorted by key.
    pub tags: Tags,

    /// RFC 3339 timestamp of when the alert was raised.
    pub timestamp: String,
}

impl Alert {
    pub fn new(message: &str, tags: &Tags) -> Self {
        Self {
            message: message.to_string(),
            tags: tags.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
