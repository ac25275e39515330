//! Secondary defaults document
//!
//! Fallback attribute values used when a resource descriptor leaves an
//! attribute out. The document is grouped by action:
//!
//! ```yaml
//! run:
//!   INSTANCETYPE: m1.small
//!   KEYPAIR: ops
//! tags:
//!   TAGS: owner=ops
//! ```
//!
//! A flat `EC2:` attribute bag is accepted as well.

use crate::error::{ConfigError, Result};
use crate::scalar_to_string;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultsDocument {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl DefaultsDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the document if it exists. A missing file yields an empty document.
    pub fn load_optional(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No defaults document at {}", path.display());
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Self::parse(content).map_err(|message| ConfigError::Parse {
            path: "<inline>".into(),
            message,
        })
    }

    fn parse(content: &str) -> std::result::Result<Self, String> {
        let value: serde_yaml::Value = serde_yaml::from_str(content).map_err(|e| e.to_string())?;

        let mut doc = Self::new();
        let root = match value {
            serde_yaml::Value::Null => return Ok(doc),
            serde_yaml::Value::Mapping(m) => m,
            _ => return Err("defaults document must be a mapping".to_string()),
        };

        for (key, value) in root {
            let Some(key) = key.as_str() else { continue };

            match value {
                serde_yaml::Value::Mapping(attrs) => {
                    let section = doc.sections.entry(key.to_string()).or_default();
                    for (attr, v) in attrs {
                        if let (Some(attr), Some(v)) = (attr.as_str(), scalar_to_string(&v)) {
                            section.insert(attr.to_string(), v);
                        }
                    }
                }
                other => {
                    // top-level scalars form an unnamed section
                    if let Some(v) = scalar_to_string(&other) {
                        doc.sections
                            .entry(String::new())
                            .or_default()
                            .insert(key.to_string(), v);
                    }
                }
            }
        }

        Ok(doc)
    }

    /// Value for an attribute, preferring the section named after `action`
    pub fn lookup(&self, action: &str, attribute: &str) -> Option<&str> {
        self.sections
            .get(action)
            .and_then(|s| s.get(attribute))
            .or_else(|| self.sections.values().find_map(|s| s.get(attribute)))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.values().all(BTreeMap::is_empty)
    }
}
