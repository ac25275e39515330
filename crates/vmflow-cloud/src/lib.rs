//! vmflow cloud driver core
//!
//! Translates the orchestrator's VM lifecycle commands into calls against a
//! remote compute provider and normalizes the answers back.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                 vmflow CLI                        │
//! │  (deploy / shutdown / poll / monitor ...)         │
//! └─────────────────┬────────────────────────────────┘
//!                   │
//! ┌─────────────────▼────────────────────────────────┐
//! │                vmflow-cloud                       │
//! │  ┌────────────┐ ┌────────────┐ ┌──────────────┐  │
//! │  │ Descriptor │ │  Mapping   │ │    State     │  │
//! │  │  Resolver  │ │  Engine    │ │  Normalizer  │  │
//! │  └────────────┘ └────────────┘ └──────────────┘  │
//! │  ┌──────────────────────────────────────────┐    │
//! │  │ LifecycleExecutor + trait ComputeProvider│    │
//! │  └──────────────────────────────────────────┘    │
//! └─────────────────┬────────────────────────────────┘
//!                   │
//!           ┌───────▼───────┐
//!           │  ec2 provider │
//!           └───────────────┘
//! ```

pub mod action;
pub mod descriptor;
pub mod error;
pub mod executor;
pub mod mapping;
pub mod provider;
pub mod state;

#[cfg(test)]
mod testing;

// Re-exports
pub use action::{ACTIONS, Action, ActionMapping, ParameterSpec, ProviderCall, Transform};
pub use descriptor::{DescriptorSection, ResourceDescriptor};
pub use error::{CloudError, Result};
pub use executor::{DeployPlan, LifecycleExecutor};
pub use mapping::{AttributeSource, DefaultsTable, ParameterTree, build_parameters, set_path};
pub use provider::{ComputeProvider, InstanceInfo, InstanceStatus, RemoteInstance};
pub use state::{
    CanonicalState, FleetReport, IDENTITY_TAG, PollReport, VmRecord, build_fleet_report,
    capacity_totals, normalize, report_fleet, report_instance,
};
