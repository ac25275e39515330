//! Compute provider trait and remote instance handle

use crate::action::ProviderCall;
use crate::error::{CloudError, Result};
use crate::mapping::ParameterTree;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Remote compute provider abstraction
///
/// Implementations translate parameter trees into provider API requests.
/// They carry no retry logic; a failed request is returned as
/// [`CloudError::ProviderCall`].
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    /// Hypervisor name reported to the orchestrator (e.g. "ec2")
    fn name(&self) -> &str;

    /// Create one instance and return its provider-assigned id
    async fn run_instance(&self, params: &ParameterTree) -> Result<String>;

    /// Current view of an instance, `None` if the provider does not know it
    async fn describe_instance(&self, instance_id: &str) -> Result<Option<InstanceInfo>>;

    /// Every instance visible in the bound region
    async fn list_instances(&self) -> Result<Vec<InstanceInfo>>;

    /// Issue an instance-scoped call
    async fn invoke(
        &self,
        instance_id: &str,
        call: ProviderCall,
        params: &ParameterTree,
    ) -> Result<()>;
}

/// Provider-side instance status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceStatus {
    Pending,
    Running,
    ShuttingDown,
    Terminated,
    Stopping,
    Stopped,
    Other(String),
}

impl InstanceStatus {
    pub fn from_api(state: &str) -> Self {
        match state {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "shutting-down" => Self::ShuttingDown,
            "terminated" => Self::Terminated,
            "stopping" => Self::Stopping,
            "stopped" => Self::Stopped,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::ShuttingDown => "shutting-down",
            Self::Terminated => "terminated",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one remote instance
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceInfo {
    pub instance_id: String,
    pub status: InstanceStatus,
    pub instance_type: Option<String>,
    /// Public address, if one is assigned
    pub ip_address: Option<String>,
    pub tags: BTreeMap<String, String>,
}

impl InstanceInfo {
    pub fn new(instance_id: impl Into<String>, status: InstanceStatus) -> Self {
        Self {
            instance_id: instance_id.into(),
            status,
            instance_type: None,
            ip_address: None,
            tags: BTreeMap::new(),
        }
    }

    pub fn with_instance_type(mut self, instance_type: impl Into<String>) -> Self {
        self.instance_type = Some(instance_type.into());
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// Handle on one remote instance, valid for a single action
pub struct RemoteInstance<'p> {
    provider: &'p dyn ComputeProvider,
    instance_id: String,
}

impl<'p> RemoteInstance<'p> {
    /// Handle without an existence check
    pub fn new(provider: &'p dyn ComputeProvider, instance_id: impl Into<String>) -> Self {
        Self {
            provider,
            instance_id: instance_id.into(),
        }
    }

    /// Create a new instance from run parameters
    pub async fn create(provider: &'p dyn ComputeProvider, params: &ParameterTree) -> Result<Self> {
        let instance_id = provider.run_instance(params).await?;
        tracing::info!("Created instance {} on {}", instance_id, provider.name());
        Ok(Self::new(provider, instance_id))
    }

    /// Handle on an existing instance; fails if the provider does not know it
    pub async fn resolve(provider: &'p dyn ComputeProvider, instance_id: &str) -> Result<Self> {
        let handle = Self::new(provider, instance_id);
        if !handle.exists().await? {
            return Err(CloudError::InstanceNotFound(instance_id.to_string()));
        }
        Ok(handle)
    }

    pub fn id(&self) -> &str {
        &self.instance_id
    }

    pub async fn describe(&self) -> Result<Option<InstanceInfo>> {
        self.provider.describe_instance(&self.instance_id).await
    }

    pub async fn exists(&self) -> Result<bool> {
        Ok(self.describe().await?.is_some())
    }

    pub async fn status(&self) -> Result<Option<InstanceStatus>> {
        Ok(self.describe().await?.map(|info| info.status))
    }

    pub async fn call(&self, call: ProviderCall, params: &ParameterTree) -> Result<()> {
        tracing::debug!("{} {}", call, self.instance_id);
        self.provider.invoke(&self.instance_id, call, params).await
    }

    pub async fn add_tag(&self, key: &str, value: &str) -> Result<()> {
        let mut tags = serde_json::Map::new();
        tags.insert(key.to_string(), serde_json::Value::from(value));

        let mut params = ParameterTree::new();
        params.insert("tags".to_string(), serde_json::Value::Object(tags));
        self.call(ProviderCall::CreateTags, &params).await
    }
}
