//! Main command - build, update and publish

use crate::action::ActionContext;
use crate::config::Config;
use crate::error::FlatterResult;
use crate::orchestration::{create_services, Flatter, RunReport};
use tracing::info;

/// Execute the main command
pub async fn execute(ctx: &dyn ActionContext, config: &Config) -> FlatterResult<()> {
    let services = create_services(config)?;
    phase(&services.driver(config, ctx), ctx).await;
    Ok(())
}

/// Target failures mark the step failed without aborting it
pub(crate) async fn phase(flatter: &Flatter<'_>, ctx: &dyn ActionContext) {
    match flatter.main().await.and_then(RunReport::into_result) {
        Ok(report) => info!("Built {} manifest(s)", report.targets.len()),
        Err(e) => ctx.set_failed(&e.to_string()),
    }
}
