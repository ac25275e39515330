//! EC2 provider implementation

use crate::error::{Ec2Error, Result};
use crate::params::{AddressRef, RunInstancesParams, tags_from_tree};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ec2::Client;
use aws_sdk_ec2::config::{Credentials, Region};
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ec2::types::{Instance, InstanceType, Placement, Tag, Tenancy};
use vmflow_cloud::{ComputeProvider, InstanceInfo, InstanceStatus, ParameterTree, ProviderCall};
use vmflow_config::RegionBinding;

const NOT_FOUND_CODE: &str = "InvalidInstanceID.NotFound";
const CREDENTIALS_SOURCE: &str = "vmflow-config";

fn api_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> Ec2Error
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
    tracing::debug!("{} failed: {}", operation, message);
    Ec2Error::Api { operation, message }
}

/// Compute provider backed by the EC2 API of one region
pub struct Ec2Provider {
    client: Client,
    region: String,
}

impl Ec2Provider {
    /// Build a client for the region binding.
    ///
    /// Static keys from the binding are used when present, otherwise the
    /// default AWS credential chain applies.
    pub async fn connect(binding: &RegionBinding) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(binding.region_name.clone()));

        if let Some((key_id, secret)) = binding.static_credentials() {
            loader = loader.credentials_provider(Credentials::new(
                key_id,
                secret,
                None,
                None,
                CREDENTIALS_SOURCE,
            ));
        }

        let config = loader.load().await;
        tracing::debug!("EC2 client for region {}", binding.region_name);

        Self {
            client: Client::new(&config),
            region: binding.region_name.clone(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    async fn create(&self, params: &RunInstancesParams) -> Result<String> {
        let mut request = self
            .client
            .run_instances()
            .min_count(params.min_count.unwrap_or(1))
            .max_count(params.max_count.unwrap_or(1))
            .set_image_id(params.image_id.clone())
            .set_kernel_id(params.kernel_id.clone())
            .set_ramdisk_id(params.ramdisk_id.clone())
            .set_client_token(params.client_token.clone())
            .set_key_name(params.key_name.clone())
            .set_private_ip_address(params.private_ip_address.clone())
            .set_subnet_id(params.subnet_id.clone())
            .set_user_data(params.encoded_user_data())
            .set_ebs_optimized(params.ebs_optimized);

        if let Some(instance_type) = &params.instance_type {
            request = request.instance_type(InstanceType::from(instance_type.as_str()));
        }

        let (group_ids, group_names) = params.security_group_refs();
        for id in group_ids {
            request = request.security_group_ids(id);
        }
        for name in group_names {
            request = request.security_groups(name);
        }

        if let Some(placement) = &params.placement {
            request = request.placement(
                Placement::builder()
                    .set_availability_zone(placement.availability_zone.clone())
                    .set_group_name(placement.group_name.clone())
                    .set_tenancy(placement.tenancy.as_deref().map(Tenancy::from))
                    .build(),
            );
        }

        let resp = request
            .send()
            .await
            .map_err(|e| api_error("RunInstances", e))?;

        let instance_id = resp
            .instances()
            .first()
            .and_then(|i| i.instance_id())
            .ok_or(Ec2Error::EmptyResponse("RunInstances"))?;

        Ok(instance_id.to_string())
    }

    async fn describe(&self, instance_id: &str) -> Result<Option<InstanceInfo>> {
        let resp = match self
            .client
            .describe_instances()
            .instance_ids(instance_id)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) if e.code() == Some(NOT_FOUND_CODE) => return Ok(None),
            Err(e) => return Err(api_error("DescribeInstances", e)),
        };

        Ok(resp
            .reservations()
            .iter()
            .flat_map(|r| r.instances())
            .find(|i| i.instance_id() == Some(instance_id))
            .map(to_instance_info))
    }

    async fn list(&self) -> Result<Vec<InstanceInfo>> {
        let mut instances = Vec::new();
        let mut pages = self.client.describe_instances().into_paginator().send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| api_error("DescribeInstances", e))?;
            for reservation in page.reservations() {
                instances.extend(reservation.instances().iter().map(to_instance_info));
            }
        }

        Ok(instances)
    }

    async fn create_tags(&self, instance_id: &str, params: &ParameterTree) -> Result<()> {
        let tags = tags_from_tree(params)
            .into_iter()
            .map(|(k, v)| Tag::builder().key(k).value(v).build())
            .collect::<Vec<_>>();

        self.client
            .create_tags()
            .resources(instance_id)
            .set_tags(Some(tags))
            .send()
            .await
            .map_err(|e| api_error("CreateTags", e))?;
        Ok(())
    }

    async fn associate_address(&self, instance_id: &str, params: &ParameterTree) -> Result<()> {
        let request = self.client.associate_address().instance_id(instance_id);
        let request = match AddressRef::from_tree(params)? {
            AddressRef::AllocationId(id) => request.allocation_id(id),
            AddressRef::PublicIp(ip) => request.public_ip(ip),
        };

        request
            .send()
            .await
            .map_err(|e| api_error("AssociateAddress", e))?;
        Ok(())
    }

    async fn lifecycle(&self, instance_id: &str, call: ProviderCall) -> Result<()> {
        match call {
            ProviderCall::TerminateInstances => {
                self.client
                    .terminate_instances()
                    .instance_ids(instance_id)
                    .send()
                    .await
                    .map_err(|e| api_error("TerminateInstances", e))?;
            }
            ProviderCall::RebootInstances => {
                self.client
                    .reboot_instances()
                    .instance_ids(instance_id)
                    .send()
                    .await
                    .map_err(|e| api_error("RebootInstances", e))?;
            }
            ProviderCall::StopInstances => {
                self.client
                    .stop_instances()
                    .instance_ids(instance_id)
                    .send()
                    .await
                    .map_err(|e| api_error("StopInstances", e))?;
            }
            ProviderCall::StartInstances => {
                self.client
                    .start_instances()
                    .instance_ids(instance_id)
                    .send()
                    .await
                    .map_err(|e| api_error("StartInstances", e))?;
            }
            other => {
                return Err(Ec2Error::InvalidParameter(format!(
                    "{} is not supported by the EC2 provider",
                    other
                )));
            }
        }
        Ok(())
    }
}

fn to_instance_info(instance: &Instance) -> InstanceInfo {
    let status = instance
        .state()
        .and_then(|s| s.name())
        .map(|name| InstanceStatus::from_api(name.as_str()))
        .unwrap_or_else(|| InstanceStatus::Other("unknown".to_string()));

    let mut info = InstanceInfo::new(instance.instance_id().unwrap_or_default(), status);
    info.instance_type = instance.instance_type().map(|t| t.as_str().to_string());
    info.ip_address = instance.public_ip_address().map(str::to_string);
    for tag in instance.tags() {
        if let (Some(key), Some(value)) = (tag.key(), tag.value()) {
            info.tags.insert(key.to_string(), value.to_string());
        }
    }
    info
}

#[async_trait]
impl ComputeProvider for Ec2Provider {
    fn name(&self) -> &str {
        "ec2"
    }

    async fn run_instance(&self, params: &ParameterTree) -> vmflow_cloud::Result<String> {
        let params = RunInstancesParams::from_tree(params)?;
        Ok(self.create(&params).await?)
    }

    async fn describe_instance(
        &self,
        instance_id: &str,
    ) -> vmflow_cloud::Result<Option<InstanceInfo>> {
        Ok(self.describe(instance_id).await?)
    }

    async fn list_instances(&self) -> vmflow_cloud::Result<Vec<InstanceInfo>> {
        Ok(self.list().await?)
    }

    async fn invoke(
        &self,
        instance_id: &str,
        call: ProviderCall,
        params: &ParameterTree,
    ) -> vmflow_cloud::Result<()> {
        match call {
            ProviderCall::CreateTags => self.create_tags(instance_id, params).await?,
            ProviderCall::AssociateAddress => self.associate_address(instance_id, params).await?,
            other => self.lifecycle(instance_id, other).await?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ec2::types::{InstanceState, InstanceStateName};

    #[test]
    fn test_to_instance_info() {
        let instance = Instance::builder()
            .instance_id("i-0abc")
            .instance_type(InstanceType::from("m1.small"))
            .public_ip_address("203.0.113.5")
            .state(InstanceState::builder().name(InstanceStateName::Running).build())
            .tags(Tag::builder().key("ONE_ID").value("9").build())
            .build();

        let info = to_instance_info(&instance);
        assert_eq!(info.instance_id, "i-0abc");
        assert_eq!(info.status, InstanceStatus::Running);
        assert_eq!(info.instance_type.as_deref(), Some("m1.small"));
        assert_eq!(info.ip_address.as_deref(), Some("203.0.113.5"));
        assert_eq!(info.tag("ONE_ID"), Some("9"));
    }

    #[test]
    fn test_to_instance_info_without_state() {
        let instance = Instance::builder().instance_id("i-1").build();
        let info = to_instance_info(&instance);
        assert_eq!(info.status, InstanceStatus::Other("unknown".to_string()));
        assert!(info.tags.is_empty());
    }

    #[tokio::test]
    async fn test_connect_uses_binding_region() {
        let binding = RegionBinding {
            name: "default".to_string(),
            region_name: "eu-west-1".to_string(),
            access_key_id: Some("AKIATEST".to_string()),
            secret_access_key: Some("secret".to_string()),
            capacity: Default::default(),
        };

        let provider = Ec2Provider::connect(&binding).await;
        assert_eq!(provider.region(), "eu-west-1");
        assert_eq!(provider.name(), "ec2");
    }
}
