pub mod error;
pub mod sink;
pub mod types;
pub mod webhook;

pub use error::AlertError;
pub use sink::{from_config, AlertSink, NoopAlertSink};
pub use types::{Alert, Tags};
pub use webhook::WebhookAlertSink;
