//! Crate-level errors. Domain errors live in `snsim-error` and are
//! re-exported here.

pub use snsim_error::{
    DeliveryError, DeliveryResult, ErrorClass, ErrorExt, LogLevel, RegistryError,
    RegistryResult, StatusCode,
};
use thiserror::Error;

/// Failure to assemble the service from settings.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
