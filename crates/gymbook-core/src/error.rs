use thiserror::Error;

#[derive(Debug, Error)]
pub enum GymbookError {
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GymbookError {
    /// Short error code used as an alert tag.
    pub fn code(&self) -> &'static str {
        match self {
            GymbookError::Config(_) => "CONFIG_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, GymbookError>;
