use crate::utils::{self, DriverContext};
use vmflow_cloud::LifecycleExecutor;

/// Print the host capacity block and one record per instance
pub async fn handle(ctx: &DriverContext, host: &str) -> anyhow::Result<()> {
    let binding = ctx.binding_for(host)?;
    let provider = utils::connect(&binding).await;

    let report = LifecycleExecutor::new(&provider)
        .monitor_all(host, &binding, ctx.store.instance_types())
        .await?;

    print!("{}", report);
    Ok(())
}
