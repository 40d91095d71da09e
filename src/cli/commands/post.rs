//! Post command - save the repository to cache

use crate::action::ActionContext;
use crate::config::Config;
use crate::error::FlatterResult;
use crate::orchestration::{create_services, Flatter};

/// Execute the post command
pub async fn execute(ctx: &dyn ActionContext, config: &Config) -> FlatterResult<()> {
    let services = create_services(config)?;
    phase(&services.driver(config, ctx), ctx).await;
    Ok(())
}

pub(crate) async fn phase(flatter: &Flatter<'_>, ctx: &dyn ActionContext) {
    if let Err(e) = flatter.post().await {
        ctx.warning(&format!("Failed to save repository to cache: {}", e));
    }
}
