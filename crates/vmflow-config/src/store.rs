//! Region bindings and the instance type reference table
//!
//! The primary driver configuration is a YAML document:
//!
//! ```yaml
//! regions:
//!   default:
//!     region_name: us-east-1
//!     access_key_id: AKIA...
//!     secret_access_key: ...
//!     capacity:
//!       m1.small: 5
//! instance_types:
//!   m1.small:
//!     cpu: 1
//!     memory: 1.7
//! ```

use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Name of the fallback region entry
pub const DEFAULT_BINDING: &str = "default";

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    regions: BTreeMap<String, RawRegion>,
    #[serde(default)]
    instance_types: BTreeMap<String, RawInstanceType>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawRegion {
    region_name: String,
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    #[serde(default)]
    capacity: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawInstanceType {
    cpu: f64,
    memory: f64,
}

/// Credentials, region and capacity resolved for one target host
#[derive(Debug, Clone, PartialEq)]
pub struct RegionBinding {
    /// Key of the `regions` entry this binding came from
    pub name: String,

    /// Provider region identifier (e.g. "us-east-1")
    pub region_name: String,

    pub access_key_id: Option<String>,

    pub secret_access_key: Option<String>,

    /// Instance type name to number of instances this host may run
    pub capacity: BTreeMap<String, u32>,
}

impl RegionBinding {
    /// Both halves of a static key pair, if configured
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret.as_str())),
            _ => None,
        }
    }
}

/// Size of one instance type
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceTypeSpec {
    pub name: String,
    /// Cores
    pub cpu: f64,
    /// GiB
    pub memory: f64,
}

/// Read-only view over the primary driver configuration
#[derive(Debug, Clone)]
pub struct ConfigStore {
    regions: BTreeMap<String, RegionBinding>,
    instance_types: BTreeMap<String, InstanceTypeSpec>,
}

impl ConfigStore {
    /// Load the configuration document from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!("Loading driver configuration from {}", path.display());
        Self::parse(&content).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parse a configuration document
    pub fn from_yaml(content: &str) -> Result<Self> {
        Self::parse(content).map_err(|message| ConfigError::Parse {
            path: "<inline>".into(),
            message,
        })
    }

    fn parse(content: &str) -> std::result::Result<Self, String> {
        let raw: RawConfig = serde_yaml::from_str(content).map_err(|e| e.to_string())?;

        let regions = raw
            .regions
            .into_iter()
            .map(|(name, r)| {
                let binding = RegionBinding {
                    name: name.clone(),
                    region_name: r.region_name,
                    access_key_id: r.access_key_id,
                    secret_access_key: r.secret_access_key,
                    capacity: r.capacity,
                };
                (name, binding)
            })
            .collect();

        let instance_types = raw
            .instance_types
            .into_iter()
            .map(|(name, t)| {
                let spec = InstanceTypeSpec {
                    name: name.clone(),
                    cpu: t.cpu,
                    memory: t.memory,
                };
                (name, spec)
            })
            .collect();

        Ok(Self {
            regions,
            instance_types,
        })
    }

    /// Resolve the region binding for a host.
    ///
    /// An exact host entry wins, otherwise the `default` entry is used.
    pub fn binding_for(&self, host: &str) -> Result<RegionBinding> {
        if let Some(binding) = self.regions.get(host) {
            return Ok(binding.clone());
        }

        match self.regions.get(DEFAULT_BINDING) {
            Some(binding) => {
                tracing::debug!("No region for host '{}', using '{}'", host, DEFAULT_BINDING);
                Ok(binding.clone())
            }
            None => Err(ConfigError::NoBinding(host.to_string())),
        }
    }

    pub fn instance_types(&self) -> &BTreeMap<String, InstanceTypeSpec> {
        &self.instance_types
    }

    pub fn instance_type(&self, name: &str) -> Result<&InstanceTypeSpec> {
        self.instance_types
            .get(name)
            .ok_or_else(|| ConfigError::UnknownInstanceType(name.to_string()))
    }
}
