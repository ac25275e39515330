//! Cloud driver error types

use thiserror::Error;

/// Errors raised while translating and executing a lifecycle command.
///
/// Every variant is fatal for the current invocation.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error(transparent)]
    Config(#[from] vmflow_config::ConfigError),

    #[error("Cannot select descriptor section: {0}")]
    Resolution(String),

    #[error("Invalid resource descriptor: {0}")]
    Descriptor(String),

    #[error("{0}")]
    Validation(String),

    /// Failure reported by the remote provider, message kept verbatim
    #[error("{0}")]
    ProviderCall(String),

    #[error("Instance {0} does not exist")]
    InstanceNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
