//! Resource descriptor documents
//!
//! A descriptor carries one or more provider-site sections under an `EC2`
//! key. Each section is a flat attribute bag, optionally naming the target
//! host it applies to:
//!
//! ```yaml
//! EC2:
//!   - HOST: us-east
//!     AMI: ami-0a1b2c
//!     INSTANCETYPE: m1.small
//!   - HOST: eu-west
//!     AMI: ami-9f8e7d
//! ```

use crate::error::{CloudError, Result};
use std::collections::BTreeMap;
use std::path::Path;
use vmflow_config::scalar_to_string;

const SECTION_KEY: &str = "EC2";
const TEMPLATE_KEY: &str = "USER_TEMPLATE";
const HOST_FIELD: &str = "HOST";
/// Older descriptors name the site with CLOUD instead of HOST
const LEGACY_HOST_FIELD: &str = "CLOUD";

/// Attribute bag for one provider site
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptorSection {
    attributes: BTreeMap<String, String>,
}

impl DescriptorSection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn host(&self) -> Option<&str> {
        self.get(HOST_FIELD)
    }

    pub fn legacy_host(&self) -> Option<&str> {
        self.get(LEGACY_HOST_FIELD)
    }

    fn from_mapping(mapping: &serde_yaml::Mapping) -> Self {
        let attributes = mapping
            .iter()
            .filter_map(|(k, v)| Some((k.as_str()?.to_string(), scalar_to_string(v)?)))
            .collect();
        Self { attributes }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DescriptorSection {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            attributes: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A parsed resource descriptor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceDescriptor {
    sections: Vec<DescriptorSection>,
}

impl ResourceDescriptor {
    pub fn new(sections: Vec<DescriptorSection>) -> Self {
        Self { sections }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let root: serde_yaml::Value = serde_yaml::from_str(content)?;

        let sections = root
            .get(SECTION_KEY)
            .or_else(|| root.get(TEMPLATE_KEY).and_then(|t| t.get(SECTION_KEY)));

        let sections = match sections {
            None | Some(serde_yaml::Value::Null) => Vec::new(),
            Some(serde_yaml::Value::Mapping(m)) => vec![DescriptorSection::from_mapping(m)],
            Some(serde_yaml::Value::Sequence(items)) => items
                .iter()
                .map(|item| match item {
                    serde_yaml::Value::Mapping(m) => Ok(DescriptorSection::from_mapping(m)),
                    _ => Err(CloudError::Descriptor(format!(
                        "every {} entry must be a mapping",
                        SECTION_KEY
                    ))),
                })
                .collect::<Result<Vec<_>>>()?,
            Some(_) => {
                return Err(CloudError::Descriptor(format!(
                    "{} must be a mapping or a list of mappings",
                    SECTION_KEY
                )));
            }
        };

        Ok(Self { sections })
    }

    pub fn sections(&self) -> &[DescriptorSection] {
        &self.sections
    }

    /// Select the section that applies to `host`.
    ///
    /// Precedence: a section whose `HOST` matches (case-insensitive), then one
    /// whose legacy `CLOUD` field matches, then the only section of the
    /// document. Anything else is a resolution error. Among several matching
    /// sections the last one wins.
    pub fn select(&self, host: &str) -> Result<&DescriptorSection> {
        let matches = |field: Option<&str>| field.is_some_and(|f| f.eq_ignore_ascii_case(host));

        let by_host: Vec<&DescriptorSection> =
            self.sections.iter().filter(|s| matches(s.host())).collect();
        if let Some(&section) = by_host.last() {
            if by_host.len() > 1 {
                tracing::warn!("Several sections name host '{}', using the last", host);
            }
            return Ok(section);
        }

        if let Some(section) = self
            .sections
            .iter()
            .rev()
            .find(|s| matches(s.legacy_host()))
        {
            tracing::debug!("Selected section for '{}' by legacy CLOUD field", host);
            return Ok(section);
        }

        match self.sections.as_slice() {
            [only] => Ok(only),
            [] => Err(CloudError::Resolution(format!(
                "no {} section in deployment file",
                SECTION_KEY
            ))),
            many => Err(CloudError::Resolution(format!(
                "{} {} sections and none matches host '{}'",
                many.len(),
                SECTION_KEY,
                host
            ))),
        }
    }
}
