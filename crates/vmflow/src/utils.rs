use anyhow::Context;
use std::path::{Path, PathBuf};
use vmflow_cloud::DefaultsTable;
use vmflow_cloud_aws::Ec2Provider;
use vmflow_config::{ConfigStore, DefaultsDocument, RegionBinding};

/// Configuration shared by every command of one invocation
pub struct DriverContext {
    pub store: ConfigStore,
    pub defaults: DefaultsTable,
}

impl DriverContext {
    pub fn binding_for(&self, host: &str) -> anyhow::Result<RegionBinding> {
        Ok(self.store.binding_for(host)?)
    }
}

/// Load the config store and the defaults table.
///
/// Explicit paths win; otherwise the usual discovery applies.
pub fn load_context(
    config: Option<&Path>,
    defaults: Option<&Path>,
) -> anyhow::Result<DriverContext> {
    let config_path: PathBuf = match config {
        Some(path) => path.to_path_buf(),
        None => vmflow_config::find_config_file()?,
    };
    tracing::debug!("Using config {}", config_path.display());

    let store = ConfigStore::load(&config_path)?;

    let defaults_path = match defaults {
        Some(path) => path.to_path_buf(),
        None => vmflow_config::defaults_path_for(&config_path),
    };
    let document = DefaultsDocument::load_optional(&defaults_path)
        .with_context(|| format!("loading defaults from {}", defaults_path.display()))?;

    Ok(DriverContext {
        store,
        defaults: DefaultsTable::from_document(&document),
    })
}

/// Build the EC2 client for a region binding
pub async fn connect(binding: &RegionBinding) -> Ec2Provider {
    tracing::debug!("Binding '{}' -> region {}", binding.name, binding.region_name);
    Ec2Provider::connect(binding).await
}
