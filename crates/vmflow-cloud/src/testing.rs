//! In-memory provider for unit tests

use crate::action::ProviderCall;
use crate::error::{CloudError, Result};
use crate::mapping::ParameterTree;
use crate::provider::{ComputeProvider, InstanceInfo, InstanceStatus};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub instance_id: Option<String>,
    pub call: ProviderCall,
    pub params: ParameterTree,
}

#[derive(Default)]
pub struct MemoryProvider {
    instances: Mutex<Vec<InstanceInfo>>,
    calls: Mutex<Vec<RecordedCall>>,
    failing: HashSet<ProviderCall>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instance(self, info: InstanceInfo) -> Self {
        self.instances.lock().unwrap().push(info);
        self
    }

    /// Make every request of this kind fail
    pub fn failing(mut self, call: ProviderCall) -> Self {
        self.failing.insert(call);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn instance(&self, id: &str) -> Option<InstanceInfo> {
        self.instances
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.instance_id == id)
            .cloned()
    }

    fn record(
        &self,
        instance_id: Option<&str>,
        call: ProviderCall,
        params: &ParameterTree,
    ) -> Result<()> {
        self.calls.lock().unwrap().push(RecordedCall {
            instance_id: instance_id.map(str::to_string),
            call,
            params: params.clone(),
        });

        if self.failing.contains(&call) {
            return Err(CloudError::ProviderCall(format!("{} refused", call)));
        }
        Ok(())
    }
}

#[async_trait]
impl ComputeProvider for MemoryProvider {
    fn name(&self) -> &str {
        "ec2"
    }

    async fn run_instance(&self, params: &ParameterTree) -> Result<String> {
        self.record(None, ProviderCall::RunInstances, params)?;

        let mut instances = self.instances.lock().unwrap();
        let id = format!("i-{:04}", instances.len() + 1);
        let mut info = InstanceInfo::new(&id, InstanceStatus::Pending);
        info.instance_type = params
            .get("instance_type")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        instances.push(info);
        Ok(id)
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<Option<InstanceInfo>> {
        self.record(Some(instance_id), ProviderCall::DescribeInstances, &ParameterTree::new())?;
        Ok(self.instance(instance_id))
    }

    async fn list_instances(&self) -> Result<Vec<InstanceInfo>> {
        self.record(None, ProviderCall::DescribeInstances, &ParameterTree::new())?;
        Ok(self.instances.lock().unwrap().clone())
    }

    async fn invoke(
        &self,
        instance_id: &str,
        call: ProviderCall,
        params: &ParameterTree,
    ) -> Result<()> {
        self.record(Some(instance_id), call, params)?;

        let mut instances = self.instances.lock().unwrap();
        let Some(info) = instances.iter_mut().find(|i| i.instance_id == instance_id) else {
            return Err(CloudError::ProviderCall(format!(
                "The instance ID '{}' does not exist",
                instance_id
            )));
        };

        match call {
            ProviderCall::TerminateInstances => info.status = InstanceStatus::ShuttingDown,
            ProviderCall::StopInstances => info.status = InstanceStatus::Stopping,
            ProviderCall::StartInstances => info.status = InstanceStatus::Pending,
            ProviderCall::CreateTags => {
                if let Some(tags) = params.get("tags").and_then(|t| t.as_object()) {
                    for (k, v) in tags {
                        info.tags
                            .insert(k.clone(), v.as_str().unwrap_or_default().to_string());
                    }
                }
            }
            ProviderCall::AssociateAddress => {
                info.ip_address = params
                    .get("public_ip")
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
            }
            _ => {}
        }
        Ok(())
    }
}
