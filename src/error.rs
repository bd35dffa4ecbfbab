use thiserror::Error;

use crate::layers::LayerId;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or parse the INI file
    #[error("Failed to read config file: {0}")]
    Read(#[from] ini::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// Errors from fetching the local feature collection.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error! status: {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid GeoJSON: {0}")]
    Parse(String),
}

/// Lookups into the composed layer model.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no layer titled '{0}'")]
    UnknownTitle(String),

    #[error("no group titled '{0}'")]
    UnknownGroup(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VisibilityError {
    #[error("layer {0:?} is not registered with the coordinator")]
    UnknownLayer(LayerId),
}
