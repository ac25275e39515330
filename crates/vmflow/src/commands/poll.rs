use crate::utils::{self, DriverContext};
use vmflow_cloud::LifecycleExecutor;

pub async fn handle(
    ctx: &DriverContext,
    vm_id: &str,
    deploy_id: &str,
    host: &str,
) -> anyhow::Result<()> {
    let binding = ctx.binding_for(host)?;
    let provider = utils::connect(&binding).await;

    tracing::debug!("Polling VM {} ({})", vm_id, deploy_id);
    let report = LifecycleExecutor::new(&provider).poll(deploy_id).await?;

    println!("{}", report);
    Ok(())
}
