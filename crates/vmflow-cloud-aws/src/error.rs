//! EC2 provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Ec2Error {
    /// Request rejected by the EC2 API; the message is the service's own
    #[error("{message}")]
    Api {
        operation: &'static str,
        message: String,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("EC2 returned no instance for {0}")]
    EmptyResponse(&'static str),
}

impl From<Ec2Error> for vmflow_cloud::CloudError {
    fn from(err: Ec2Error) -> Self {
        vmflow_cloud::CloudError::ProviderCall(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Ec2Error>;
