//! Lifecycle executor
//!
//! One entry point per canonical verb. Every call is issued in order and
//! the first failure aborts the action; nothing already created is rolled
//! back.

use crate::action::Action;
use crate::error::{CloudError, Result};
use crate::mapping::{AttributeSource, ParameterTree, build_parameters};
use crate::provider::{ComputeProvider, RemoteInstance};
use crate::state::{FleetReport, IDENTITY_TAG, PollReport, report_fleet, report_instance};
use serde_json::Value;
use std::collections::BTreeMap;
use vmflow_config::{InstanceTypeSpec, RegionBinding};

const IMAGE_ATTRIBUTE: &str = "AMI";

/// Everything `deploy` sends to the provider, computed before any call
#[derive(Debug, Clone, PartialEq)]
pub struct DeployPlan {
    /// Orchestrator VM id, written to the identity tag
    pub vm_id: String,
    pub run: ParameterTree,
    /// User tags applied after creation; the identity tag is not among them
    pub tags: BTreeMap<String, String>,
    pub associate: Option<ParameterTree>,
}

impl DeployPlan {
    /// Validate the attributes and build every parameter tree.
    ///
    /// Fails when no image id is available from any attribute layer.
    pub fn prepare(vm_id: &str, source: &AttributeSource<'_>) -> Result<Self> {
        if source.raw(IMAGE_ATTRIBUTE).is_none() {
            return Err(CloudError::Validation(
                "Cannot find AMI in deployment file".to_string(),
            ));
        }

        let mut seed = ParameterTree::new();
        seed.insert("min_count".to_string(), Value::from(1));
        seed.insert("max_count".to_string(), Value::from(1));
        let run = build_parameters(Action::Run.mapping(), source, seed);

        let tag_tree = build_parameters(Action::Tags.mapping(), source, ParameterTree::new());
        let tags: BTreeMap<String, String> = match tag_tree.get("tags") {
            Some(Value::Object(map)) => map
                .iter()
                .filter(|(k, _)| k.as_str() != IDENTITY_TAG)
                .map(|(k, v)| (k.clone(), v.as_str().unwrap_or_default().to_string()))
                .collect(),
            _ => BTreeMap::new(),
        };

        let associate = build_parameters(
            Action::Associate.mapping(),
            source,
            ParameterTree::new(),
        );

        Ok(Self {
            vm_id: vm_id.to_string(),
            run,
            tags,
            associate: (!associate.is_empty()).then_some(associate),
        })
    }
}

/// Dispatches canonical verbs to a provider
pub struct LifecycleExecutor<'p> {
    provider: &'p dyn ComputeProvider,
}

impl<'p> LifecycleExecutor<'p> {
    pub fn new(provider: &'p dyn ComputeProvider) -> Self {
        Self { provider }
    }

    /// Create the instance, tag it, then associate the address if any.
    /// Returns the provider-assigned instance id.
    ///
    /// The identity tag is applied last, after every user tag.
    pub async fn deploy(&self, plan: &DeployPlan) -> Result<String> {
        let instance = RemoteInstance::create(self.provider, &plan.run).await?;

        for (key, value) in &plan.tags {
            instance.add_tag(key, value).await?;
        }
        instance.add_tag(IDENTITY_TAG, &plan.vm_id).await?;

        if let Some(params) = &plan.associate {
            instance.call(Action::Associate.mapping().call, params).await?;
        }

        tracing::info!("Deployed VM {} as {}", plan.vm_id, instance.id());
        Ok(instance.id().to_string())
    }

    pub async fn shutdown(&self, instance_id: &str) -> Result<()> {
        self.control(instance_id, Action::Terminate).await
    }

    pub async fn cancel(&self, instance_id: &str) -> Result<()> {
        self.control(instance_id, Action::Terminate).await
    }

    pub async fn reboot(&self, instance_id: &str) -> Result<()> {
        self.control(instance_id, Action::Reboot).await
    }

    pub async fn save(&self, instance_id: &str) -> Result<()> {
        self.control(instance_id, Action::Stop).await
    }

    pub async fn restore(&self, instance_id: &str) -> Result<()> {
        self.control(instance_id, Action::Start).await
    }

    /// Poll one instance; fails if the provider does not know it
    pub async fn poll(&self, instance_id: &str) -> Result<PollReport> {
        let instance = RemoteInstance::resolve(self.provider, instance_id).await?;
        report_instance(&instance).await
    }

    pub async fn monitor_all(
        &self,
        hostname: &str,
        binding: &RegionBinding,
        types: &BTreeMap<String, InstanceTypeSpec>,
    ) -> Result<FleetReport> {
        report_fleet(self.provider, hostname, binding, types).await
    }

    async fn control(&self, instance_id: &str, action: Action) -> Result<()> {
        let instance = RemoteInstance::resolve(self.provider, instance_id).await?;
        let mapping = action.mapping();
        instance.call(mapping.call, &ParameterTree::new()).await?;
        tracing::info!("{} {}", action, instance_id);
        Ok(())
    }
}
