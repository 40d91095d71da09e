//! Service factory for the production collaborators
//!
//! Picks the cache, artifact and tool implementations for a configuration.

use crate::action::{ActionContext, GithubContext};
use crate::artifact::{ArtifactService, LocalArtifactService};
use crate::cache::{CacheService, FsCacheService};
use crate::config::Config;
use crate::error::{FlatterError, FlatterResult};
use crate::flatpak::{SystemRunner, ToolRunner};
use crate::orchestration::Flatter;
use std::path::PathBuf;
use tracing::debug;

/// Collaborators the phase driver runs against
pub struct Services {
    pub cache: Box<dyn CacheService>,
    pub artifacts: Box<dyn ArtifactService>,
    pub tools: Box<dyn ToolRunner>,
    /// GitHub event payload, when running under GitHub Actions
    pub event_path: Option<PathBuf>,
}

impl Services {
    /// Phase driver over these services
    pub fn driver<'a>(&'a self, config: &'a Config, ctx: &'a dyn ActionContext) -> Flatter<'a> {
        Flatter::new(
            config,
            ctx,
            self.cache.as_ref(),
            self.artifacts.as_ref(),
            self.tools.as_ref(),
        )
        .with_event_path(self.event_path.clone())
    }
}

/// Create the services for `config`, rooted at the current directory
pub fn create_services(config: &Config) -> FlatterResult<Services> {
    let workdir = std::env::current_dir()
        .map_err(|e| FlatterError::io("getting current directory", e))?;

    let event_path = if GithubContext::is_github_actions() {
        std::env::var_os("GITHUB_EVENT_PATH").map(PathBuf::from)
    } else {
        debug!("Not running under GitHub Actions, no event payload");
        None
    };

    debug!(
        "Cache at {}, artifacts at {}",
        config.cache_dir.display(),
        config.artifact_dir.display()
    );

    Ok(Services {
        cache: Box::new(FsCacheService::new(&config.cache_dir, &workdir)),
        artifacts: Box::new(LocalArtifactService::new(&config.artifact_dir)),
        tools: Box::new(SystemRunner::with_workdir(workdir)),
        event_path,
    })
}
