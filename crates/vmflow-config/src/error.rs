use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "Driver configuration not found. Looked in:\n\
        - VMFLOW_CONFIG_PATH\n\
        - ~/.config/vmflow/ec2_driver.conf\n\
        - /etc/vmflow/ec2_driver.conf"
    )]
    ConfigFileNotFound,

    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("No region configured for host '{0}' and no 'default' region")]
    NoBinding(String),

    #[error("Instance type '{0}' is not defined in instance_types")]
    UnknownInstanceType(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
