use crate::utils::{self, DriverContext};
use vmflow_cloud::LifecycleExecutor;

/// Control verbs acting on an existing instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Shutdown,
    Cancel,
    Reboot,
    Save,
    Restore,
}

pub async fn handle(
    ctx: &DriverContext,
    control: Control,
    deploy_id: &str,
    host: &str,
) -> anyhow::Result<()> {
    let binding = ctx.binding_for(host)?;
    let provider = utils::connect(&binding).await;
    let executor = LifecycleExecutor::new(&provider);

    match control {
        Control::Shutdown => executor.shutdown(deploy_id).await?,
        Control::Cancel => executor.cancel(deploy_id).await?,
        Control::Reboot => executor.reboot(deploy_id).await?,
        Control::Save => executor.save(deploy_id).await?,
        Control::Restore => executor.restore(deploy_id).await?,
    }

    Ok(())
}
