//! The three action phases
//!
//! - `pre` restores the repository and records the keys it used
//! - `main` builds every manifest, updates the repository and publishes
//! - `post` saves the repository unless `pre` restored it exactly

use crate::action::{ActionContext, CacheRecord};
use crate::artifact::{archive_repository, ArtifactService, PAGES_ARTIFACT};
use crate::cache::{
    build_restore_prefix, derive_key, repository_key, repository_restore_prefix, BuildTarget,
    CacheService, Continuity,
};
use crate::config::Config;
use crate::error::{FlatterError, FlatterResult};
use crate::flatpak::repo::{export_public_key, update_repository};
use crate::flatpak::{
    builder, bundle, BundleSpec, FlatpakRepoFile, Manifest, ManifestFormat, ToolRunner,
};
use crate::orchestration::report::{RunReport, TargetReport};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Phase driver bound to one configuration and its collaborators
pub struct Flatter<'a> {
    config: &'a Config,
    ctx: &'a dyn ActionContext,
    cache: &'a dyn CacheService,
    artifacts: &'a dyn ArtifactService,
    tools: &'a dyn ToolRunner,
    event_path: Option<PathBuf>,
}

impl<'a> Flatter<'a> {
    pub fn new(
        config: &'a Config,
        ctx: &'a dyn ActionContext,
        cache: &'a dyn CacheService,
        artifacts: &'a dyn ArtifactService,
        tools: &'a dyn ToolRunner,
    ) -> Self {
        Self {
            config,
            ctx,
            cache,
            artifacts,
            tools,
            event_path: None,
        }
    }

    /// Read `.flatpakrepo` defaults from a GitHub event payload
    pub fn with_event_path(mut self, path: Option<PathBuf>) -> Self {
        self.event_path = path;
        self
    }

    fn continuity(&self) -> Continuity<'a> {
        Continuity::new(self.cache, self.ctx, &self.config.cache_key)
    }

    fn repository_paths(&self) -> Vec<PathBuf> {
        vec![self.config.repo.clone()]
    }

    /// Restore the repository and persist the record for `post`
    pub async fn pre(&self) -> FlatterResult<()> {
        self.ctx.start_group("Restoring repository from cache");
        let result = self.restore_repository().await;
        self.ctx.end_group();
        result
    }

    async fn restore_repository(&self) -> FlatterResult<()> {
        let continuity = self.continuity();
        if !continuity.is_enabled() {
            info!("Cache disabled");
            return Ok(());
        }

        let gpg_key = self.config.gpg_key();
        let key = repository_key(
            &self.config.cache_key,
            gpg_key,
            Utc::now().timestamp_millis(),
        );
        let prefix = repository_restore_prefix(&self.config.cache_key, gpg_key);

        let outcome = continuity
            .restore(&self.repository_paths(), &key, &[prefix])
            .await;

        CacheRecord::new(&key, &outcome).persist(self.ctx)
    }

    /// Build, update and publish. Target failures are collected in the
    /// report; an error means the repository itself could not be updated.
    pub async fn main(&self) -> FlatterResult<RunReport> {
        let continuity = self.continuity();
        let mut report = RunReport::default();

        for manifest in &self.config.manifests {
            let target = BuildTarget::new(manifest, &self.config.arch);

            self.ctx.start_group(&format!("Building {}", target));
            let result = self.build_target(&continuity, &target).await;
            self.ctx.end_group();

            if let Err(e) = &result.build {
                self.ctx
                    .error(&format!("Failed to build {}: {}", manifest.display(), e));
            }
            report.targets.push(result);
        }

        self.ctx.start_group("Updating repository");
        let updated = self.update_repository().await;
        self.ctx.end_group();
        updated?;

        if self.config.upload_pages_artifact {
            if report.all_built() {
                report.pages = self.publish_pages().await;
            } else {
                self.ctx.warning(&format!(
                    "Skipping GitHub Pages artifact, {} of {} manifests failed to build",
                    report.targets.iter().filter(|t| t.build.is_err()).count(),
                    report.targets.len()
                ));
            }
        }

        if self.config.upload_bundles {
            for target in report.targets.iter_mut().filter(|t| t.build.is_ok()) {
                self.ctx
                    .start_group(&format!("Bundling {}", target.manifest.display()));
                let bundle = self.publish_bundle(&target.manifest).await;
                self.ctx.end_group();

                if let Err(e) = &bundle {
                    self.ctx.error(&format!(
                        "Failed to bundle {}: {}",
                        target.manifest.display(),
                        e
                    ));
                }
                target.bundle = Some(bundle);
            }
        }

        self.ctx
            .set_output("repository", &self.config.repo.display().to_string())?;
        let bundles: Vec<String> = report
            .bundles()
            .iter()
            .map(|b| b.display().to_string())
            .collect();
        self.ctx.set_output("bundles", &bundles.join("\n"))?;

        Ok(report)
    }

    /// Restore build state, build, then save build state regardless of the
    /// build result
    async fn build_target(&self, continuity: &Continuity<'_>, target: &BuildTarget) -> TargetReport {
        let mut report = TargetReport::new(target.manifest.clone());

        if let Err(e) = ManifestFormat::from_path(&target.manifest) {
            report.build = Err(e);
            return report;
        }

        let state_dir = target.state_dir(&self.config.state_dir);
        let paths = vec![state_dir.clone()];
        let key = if continuity.is_enabled() {
            match derive_key(&self.config.cache_key, target).await {
                Ok(key) => key,
                Err(e) => {
                    report.build = Err(e);
                    return report;
                }
            }
        } else {
            None
        };

        if let Some(key) = &key {
            let prefix = build_restore_prefix(&self.config.cache_key, &target.arch);
            report.restore = continuity.restore(&paths, key, &[prefix]).await;
        }

        report.build =
            builder::build(self.tools, self.config, &target.manifest, &state_dir).await;

        if let Some(key) = &key {
            report.save = continuity.save(&paths, key, &report.restore).await;
        }
        report.cache_key = key;

        debug!(
            "{}: restore {:?}, save {:?}",
            target, report.restore, report.save
        );
        report
    }

    async fn update_repository(&self) -> FlatterResult<()> {
        update_repository(self.tools, self.config).await?;

        if let Err(e) = self.write_flatpakrepo().await {
            self.ctx
                .warning(&format!("Failed to generate .flatpakrepo: {}", e));
        }
        Ok(())
    }

    async fn write_flatpakrepo(&self) -> FlatterResult<PathBuf> {
        let event = match &self.event_path {
            Some(path) => FlatpakRepoFile::from_github_event(path).await?,
            None => FlatpakRepoFile::default(),
        };

        let mut descriptor = FlatpakRepoFile::resolve(&self.config.metadata, event);
        if let Some(key) = self.config.gpg_key() {
            descriptor.gpg_key = Some(
                export_public_key(self.tools, key, self.config.gpg_homedir.as_deref()).await?,
            );
        }
        descriptor.write(&self.config.repo).await
    }

    /// Archive and upload the repository; failures are warnings
    async fn publish_pages(&self) -> Option<PathBuf> {
        self.ctx.start_group("Uploading GitHub Pages artifact");
        let result = async {
            let archive = archive_repository(self.tools, self.config).await?;
            let upload = self
                .artifacts
                .upload(PAGES_ARTIFACT, &[archive.clone()], Path::new("."))
                .await?;
            debug!("Uploaded {} ({} bytes) as {}", upload.name, upload.size, upload.id);
            Ok::<_, FlatterError>(archive)
        }
        .await;
        self.ctx.end_group();

        match result {
            Ok(archive) => Some(archive),
            Err(e) => {
                self.ctx.warning(&format!("GitHub Pages failed: {}", e));
                None
            }
        }
    }

    /// Build the bundle for `manifest`. A failed build is an error, a
    /// failed upload only a warning.
    async fn publish_bundle(&self, manifest: &Path) -> FlatterResult<PathBuf> {
        let manifest = Manifest::load(manifest).await?;
        let spec = BundleSpec::from_manifest(&manifest, self.config)?;
        let file = bundle::build_bundle(self.tools, self.config, &spec).await?;

        let name = spec.artifact_name(&self.config.arch);
        match self
            .artifacts
            .upload(&name, &[file.clone()], Path::new("."))
            .await
        {
            Ok(upload) => debug!("Uploaded bundle {} as {}", upload.name, upload.id),
            Err(e) => self
                .ctx
                .warning(&format!("Failed to upload bundle {}: {}", name, e)),
        }
        Ok(file)
    }

    /// Save the repository under the key recorded by `pre`
    pub async fn post(&self) -> FlatterResult<()> {
        self.ctx.start_group("Saving repository to cache");
        let result = self.save_repository().await;
        self.ctx.end_group();
        result
    }

    async fn save_repository(&self) -> FlatterResult<()> {
        let Some(record) = CacheRecord::load(self.ctx)? else {
            info!("Cache disabled");
            return Ok(());
        };

        self.continuity()
            .save(
                &self.repository_paths(),
                &record.primary_key(),
                &record.outcome(),
            )
            .await;
        Ok(())
    }
}
