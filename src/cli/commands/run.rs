//! Run command - all phases in one process

use crate::action::ActionContext;
use crate::cli::commands::{build, post, pre};
use crate::config::Config;
use crate::error::FlatterResult;
use crate::orchestration::create_services;

/// Execute the run command
///
/// `post` runs even when `main` failed, so partial progress is cached.
pub async fn execute(ctx: &dyn ActionContext, config: &Config) -> FlatterResult<()> {
    let services = create_services(config)?;
    let flatter = services.driver(config, ctx);

    pre::phase(&flatter, ctx).await;
    build::phase(&flatter, ctx).await;
    post::phase(&flatter, ctx).await;
    Ok(())
}
