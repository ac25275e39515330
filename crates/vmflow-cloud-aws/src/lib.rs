//! AWS EC2 provider for vmflow
//!
//! Implements the `ComputeProvider` trait on top of `aws-sdk-ec2`, turning
//! the mapping engine's parameter trees into EC2 API requests.
//!
//! # Requirements
//!
//! - A region binding (`region_name`, optionally `access_key_id` and
//!   `secret_access_key`) from the driver configuration
//! - Without static keys, the default AWS credential chain is used
//!
//! # Example
//!
//! ```ignore
//! use vmflow_cloud::LifecycleExecutor;
//! use vmflow_cloud_aws::Ec2Provider;
//!
//! let provider = Ec2Provider::connect(&binding).await;
//! let report = LifecycleExecutor::new(&provider).poll("i-0abc").await?;
//! println!("{}", report);
//! ```

pub mod error;
pub mod params;
pub mod provider;

pub use error::{Ec2Error, Result};
pub use params::{AddressRef, PlacementParams, RunInstancesParams};
pub use provider::Ec2Provider;
