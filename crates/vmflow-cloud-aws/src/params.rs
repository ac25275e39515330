//! Typed views over the parameter trees built by the mapping engine

use crate::error::{Ec2Error, Result};
use base64::Engine;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use vmflow_cloud::ParameterTree;

/// RunInstances request fields
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunInstancesParams {
    pub image_id: Option<String>,
    pub kernel_id: Option<String>,
    pub ramdisk_id: Option<String>,
    pub client_token: Option<String>,
    pub instance_type: Option<String>,
    pub key_name: Option<String>,
    pub private_ip_address: Option<String>,
    pub subnet_id: Option<String>,
    pub user_data: Option<String>,
    pub security_groups: Vec<String>,
    pub placement: Option<PlacementParams>,
    #[serde(deserialize_with = "flexible_bool")]
    pub ebs_optimized: Option<bool>,
    pub min_count: Option<i32>,
    pub max_count: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlacementParams {
    pub availability_zone: Option<String>,
    pub group_name: Option<String>,
    pub tenancy: Option<String>,
}

impl RunInstancesParams {
    pub fn from_tree(tree: &ParameterTree) -> Result<Self> {
        serde_json::from_value(Value::Object(tree.clone()))
            .map_err(|e| Ec2Error::InvalidParameter(e.to_string()))
    }

    /// User data as the API expects it (base64)
    pub fn encoded_user_data(&self) -> Option<String> {
        self.user_data
            .as_ref()
            .map(|data| base64::engine::general_purpose::STANDARD.encode(data))
    }

    /// Split security groups into (ids, names); ids start with `sg-`
    pub fn security_group_refs(&self) -> (Vec<String>, Vec<String>) {
        self.security_groups
            .iter()
            .cloned()
            .partition(|g| g.starts_with("sg-"))
    }
}

/// Descriptor values arrive as strings; accept "true"/"false" as well as booleans
fn flexible_bool<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(Value::String(s)) => match s.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(Some(true)),
            "false" | "no" | "0" => Ok(Some(false)),
            other => Err(serde::de::Error::custom(format!(
                "ebs_optimized must be true or false, got '{}'",
                other
            ))),
        },
        Some(other) => Err(serde::de::Error::custom(format!(
            "ebs_optimized must be true or false, got {}",
            other
        ))),
    }
}

/// Address to associate: an allocation id (`eipalloc-...`) or a public IP
#[derive(Debug, Clone, PartialEq)]
pub enum AddressRef {
    AllocationId(String),
    PublicIp(String),
}

impl AddressRef {
    pub fn from_tree(tree: &ParameterTree) -> Result<Self> {
        let value = tree
            .get("public_ip")
            .and_then(Value::as_str)
            .ok_or_else(|| Ec2Error::InvalidParameter("public_ip is required".to_string()))?;

        Ok(if value.starts_with("eipalloc-") {
            AddressRef::AllocationId(value.to_string())
        } else {
            AddressRef::PublicIp(value.to_string())
        })
    }
}

/// Tag set from a `{"tags": {...}}` tree
pub fn tags_from_tree(tree: &ParameterTree) -> BTreeMap<String, String> {
    tree.get("tags")
        .and_then(Value::as_object)
        .map(|tags| {
            tags.iter()
                .map(|(k, v)| (k.clone(), v.as_str().unwrap_or_default().to_string()))
                .collect()
        })
        .unwrap_or_default()
}
