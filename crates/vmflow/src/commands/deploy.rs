use crate::utils::{self, DriverContext};
use anyhow::Context;
use std::path::Path;
use vmflow_cloud::{AttributeSource, DeployPlan, LifecycleExecutor, ResourceDescriptor};

/// Deploy a VM and print the new instance id.
///
/// Everything that can fail locally (binding, descriptor, image id) is
/// checked before the EC2 client is built.
pub async fn handle(
    ctx: &DriverContext,
    vm_id: &str,
    host: &str,
    descriptor: &Path,
    attributes: &[(String, String)],
) -> anyhow::Result<()> {
    let binding = ctx.binding_for(host)?;

    let document = ResourceDescriptor::load(descriptor)
        .with_context(|| format!("reading descriptor {}", descriptor.display()))?;
    let section = document.select(host)?;

    let source = attributes
        .iter()
        .fold(AttributeSource::new(section, &ctx.defaults), |source, (key, value)| {
            source.with_override(key.as_str(), value.as_str())
        });

    let plan = DeployPlan::prepare(vm_id, &source)?;

    let provider = utils::connect(&binding).await;
    let instance_id = LifecycleExecutor::new(&provider).deploy(&plan).await?;

    println!("{}", instance_id);
    Ok(())
}
