//! Attribute mapping engine
//!
//! Turns descriptor attributes into nested provider call parameters using
//! the tables in [`crate::action`].

use crate::action::{ACTIONS, ActionMapping, Transform};
use crate::descriptor::DescriptorSection;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use vmflow_config::DefaultsDocument;

/// Nested call parameters handed to a provider
pub type ParameterTree = Map<String, Value>;

/// Fallback attribute values, keyed by descriptor attribute name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultsTable {
    values: BTreeMap<String, String>,
}

impl DefaultsTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Keep the document values for attributes some action actually maps
    pub fn from_document(doc: &DefaultsDocument) -> Self {
        let mut values = BTreeMap::new();
        for mapping in ACTIONS {
            for spec in mapping.parameters {
                if let Some(value) = doc.lookup(mapping.action.as_str(), spec.source) {
                    values.insert(spec.source.to_string(), value.to_string());
                }
            }
        }

        tracing::debug!("Loaded {} default attribute values", values.len());
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DefaultsTable {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Layered attribute lookup: explicit overrides, then the descriptor
/// section, then defaults.
#[derive(Debug, Clone)]
pub struct AttributeSource<'a> {
    overrides: BTreeMap<String, String>,
    section: &'a DescriptorSection,
    defaults: &'a DefaultsTable,
}

impl<'a> AttributeSource<'a> {
    pub fn new(section: &'a DescriptorSection, defaults: &'a DefaultsTable) -> Self {
        Self {
            overrides: BTreeMap::new(),
            section,
            defaults,
        }
    }

    pub fn with_override(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(name.into(), value.into());
        self
    }

    /// Raw string value of an attribute, first layer that has it wins
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.overrides
            .get(name)
            .map(String::as_str)
            .or_else(|| self.section.get(name))
            .or_else(|| self.defaults.get(name))
    }

    /// Attribute value with an optional transform applied
    pub fn read(&self, name: &str, transform: Option<&Transform>) -> Option<Value> {
        let raw = self.raw(name)?;
        Some(match transform {
            Some(t) => t.apply(raw),
            None => Value::String(raw.to_string()),
        })
    }
}

/// Build the parameter tree for one action.
///
/// `seed` holds fixed fields. Mapped attributes overwrite the seed only at
/// their own leaf paths.
pub fn build_parameters(
    mapping: &ActionMapping,
    source: &AttributeSource<'_>,
    seed: ParameterTree,
) -> ParameterTree {
    let mut tree = seed;

    for spec in mapping.parameters {
        if let Some(value) = source.read(spec.source, Some(&spec.transform)) {
            tracing::debug!(
                "{}: {} -> {}",
                mapping.action,
                spec.source,
                spec.destination.join("/")
            );
            set_path(&mut tree, spec.destination, value);
        }
    }

    tree
}

/// Write `value` at `path`, creating intermediate mappings as needed.
///
/// Sibling keys along the path are preserved. A scalar sitting where an
/// intermediate mapping is needed gets replaced.
pub fn set_path(tree: &mut ParameterTree, path: &[&str], value: Value) {
    let Some((leaf, parents)) = path.split_last() else {
        tracing::warn!("Ignoring parameter with an empty destination path");
        return;
    };

    let mut node = tree;
    for segment in parents {
        let slot = node
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(child) = slot else {
            return;
        };
        node = child;
    }

    node.insert(leaf.to_string(), value);
}
