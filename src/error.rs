//! Error types for OVF deployment.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("Deployment of {vm_name} failed: {}", .errors.join("; "))]
    Deployment { vm_name: String, errors: Vec<String> },

    #[error("Failed to power on VM {vm_id}: {reason}")]
    PowerOn { vm_id: String, reason: String },

    #[error("Unhandled failure in deployment task: {0}")]
    UnhandledTask(String),

    #[error("API error: {status} {error_type}: {message}")]
    Api {
        status: u16,
        error_type: String,
        message: String,
    },

    #[cfg(feature = "reqwest")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl DeployError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        DeployError::NotFound {
            kind,
            name: name.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;
