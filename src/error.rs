//! Error types shared across the browser shell.
//!
//! Most failures in B2B are recovered locally (a failed probe falls back to
//! search, a failed load shows the error page). `BrowserError` covers the
//! ones that actually have to travel: startup, config persistence, resource
//! lookup and worker spawning.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for fallible browser operations.
pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("cannot serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("search target could not be built: {0}")]
    Address(#[from] crate::address::AddressError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to spawn probe worker: {0}")]
    ProbeSpawn(std::io::Error),

    #[error("resource not found: {}", .0.display())]
    MissingResource(PathBuf),

    #[error("resource path escapes the resources directory: {}", .0.display())]
    ResourceTraversal(PathBuf),

    #[error("invalid font: {0}")]
    Font(&'static str),

    #[error("rendering context: {0}")]
    Rendering(String),

    #[error("window creation failed: {0}")]
    Window(String),
}
