//! Pre command - restore the repository from cache

use crate::action::ActionContext;
use crate::config::Config;
use crate::error::FlatterResult;
use crate::orchestration::{create_services, Flatter};

/// Execute the pre command
pub async fn execute(ctx: &dyn ActionContext, config: &Config) -> FlatterResult<()> {
    let services = create_services(config)?;
    phase(&services.driver(config, ctx), ctx).await;
    Ok(())
}

/// Restore failures never fail the step
pub(crate) async fn phase(flatter: &Flatter<'_>, ctx: &dyn ActionContext) {
    if let Err(e) = flatter.pre().await {
        ctx.warning(&format!("Failed to restore repository from cache: {}", e));
    }
}
