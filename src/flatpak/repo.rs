//! Repository maintenance: summary update, signing key export and the
//! `.flatpakrepo` descriptor

use crate::config::schema::MetadataConfig;
use crate::config::Config;
use crate::error::{FlatterError, FlatterResult};
use crate::flatpak::runner::ToolRunner;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Descriptor file written into the repository root
pub const FLATPAKREPO_FILE: &str = "index.flatpakrepo";

const DEFAULT_ICON: &str = "https://raw.githubusercontent.com/flatpak/flatpak/main/flatpak.png";

/// Regenerate the repository summary, signing it when a key is configured
pub async fn update_repository(tools: &dyn ToolRunner, config: &Config) -> FlatterResult<()> {
    info!("Updating repository {}", config.repo.display());

    let mut args = vec!["build-update-repo".to_string()];
    args.extend(config.gpg_args());
    args.push(config.repo.display().to_string());

    tools.run("flatpak", &args).await
}

/// Export the armored public key for `key` as a single line
pub async fn export_public_key(
    tools: &dyn ToolRunner,
    key: &str,
    homedir: Option<&Path>,
) -> FlatterResult<String> {
    let mut args = Vec::new();
    if let Some(homedir) = homedir {
        args.push("--homedir".to_string());
        args.push(homedir.display().to_string());
    }
    args.extend(["--armor".to_string(), "--export".to_string(), key.to_string()]);

    let stdout = tools.output("gpg2", &args).await?;
    let public_key = strip_armor(&stdout);

    if public_key.is_empty() {
        return Err(FlatterError::KeyExport {
            key: key.to_string(),
            reason: "gpg2 exported no key material".to_string(),
        });
    }

    Ok(public_key)
}

/// Drop the armor framing from exported key text
///
/// The first two lines (header and blank line) and the last two (footer and
/// the empty string after the final newline) are removed, and the remaining
/// lines are concatenated.
pub fn strip_armor(armored: &str) -> String {
    let lines: Vec<&str> = armored.split('\n').collect();
    if lines.len() <= 4 {
        return String::new();
    }

    lines[2..lines.len() - 2]
        .iter()
        .map(|line| line.trim_end_matches('\r'))
        .collect()
}

/// Repository fields from the GitHub event payload
#[derive(Debug, Default, Deserialize)]
struct EventRepository {
    name: Option<String>,
    description: Option<String>,
    homepage: Option<String>,
    html_url: Option<String>,
    owner: Option<EventOwner>,
}

#[derive(Debug, Default, Deserialize)]
struct EventOwner {
    login: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventPayload {
    #[serde(default)]
    repository: Option<EventRepository>,
}

/// Contents of a `.flatpakrepo` file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatpakRepoFile {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub homepage: Option<String>,
    pub icon: Option<String>,
    pub gpg_key: Option<String>,
}

impl FlatpakRepoFile {
    /// Fill fields from a GitHub event payload file
    pub async fn from_github_event(path: &Path) -> FlatterResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| FlatterError::io(format!("reading event payload {}", path.display()), e))?;
        let payload: EventPayload = serde_json::from_str(&content)?;
        let repo = payload.repository.unwrap_or_default();

        let owner = repo.owner.and_then(|o| o.login);
        let url = match (&owner, &repo.name) {
            (Some(owner), Some(name)) => Some(format!("https://{}.github.io/{}", owner, name)),
            _ => None,
        };

        Ok(Self {
            title: repo.name,
            description: repo.description,
            url,
            homepage: repo.homepage.filter(|h| !h.is_empty()).or(repo.html_url),
            icon: None,
            gpg_key: None,
        })
    }

    /// Resolve the descriptor: configured values win over `event` values,
    /// the icon falls back to the Flatpak logo.
    pub fn resolve(metadata: &MetadataConfig, event: Self) -> Self {
        let pick = |configured: &Option<String>, fallback: Option<String>| {
            configured.clone().filter(|v| !v.is_empty()).or(fallback)
        };

        Self {
            title: pick(&metadata.title, event.title),
            description: pick(&metadata.description, event.description),
            url: pick(&metadata.url, event.url),
            homepage: pick(&metadata.homepage, event.homepage),
            icon: pick(&metadata.icon, event.icon).or_else(|| Some(DEFAULT_ICON.to_string())),
            gpg_key: event.gpg_key,
        }
    }

    /// Render as `Key=Value` lines under the `[Flatpak Repo]` header
    pub fn render(&self) -> String {
        let fields = [
            ("Title", &self.title),
            ("Description", &self.description),
            ("Url", &self.url),
            ("Homepage", &self.homepage),
            ("Icon", &self.icon),
            ("GPGKey", &self.gpg_key),
        ];

        let mut out = String::from("[Flatpak Repo]\n");
        for (key, value) in fields {
            if let Some(value) = value {
                out.push_str(&format!("{}={}\n", key, value.replace('\n', " ")));
            }
        }
        out
    }

    /// Write into `repo_dir`, returning the file path
    pub async fn write(&self, repo_dir: &Path) -> FlatterResult<PathBuf> {
        let path = repo_dir.join(FLATPAKREPO_FILE);
        tokio::fs::write(&path, self.render())
            .await
            .map_err(|e| FlatterError::io(format!("writing {}", path.display()), e))?;
        debug!("Wrote {}", path.display());
        Ok(path)
    }
}
