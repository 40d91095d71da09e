//! Cache key derivation
//!
//! Build state is keyed by the manifest contents: the same manifest built for
//! the same architecture always produces the same key, and any byte change in
//! the manifest produces a different one. The repository is keyed by time,
//! so every run saves a fresh entry and restores the newest one by prefix.

use crate::error::{FlatterError, FlatterResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Read buffer for checksumming; manifests are never loaded whole
const CHECKSUM_BUFFER_SIZE: usize = 64 * 1024;

/// Manifest path digest bytes in a state directory name
const STATE_DIR_DIGEST_BYTES: usize = 8;

/// One manifest built for one architecture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    /// Path to the Flatpak manifest
    pub manifest: PathBuf,
    /// Flatpak architecture (e.g. `x86_64`, `aarch64`)
    pub arch: String,
}

impl BuildTarget {
    /// Create a build target
    pub fn new(manifest: impl Into<PathBuf>, arch: impl Into<String>) -> Self {
        Self {
            manifest: manifest.into(),
            arch: arch.into(),
        }
    }

    /// flatpak-builder state directory of this target under `root`
    ///
    /// Named after the manifest path rather than its contents, so an edited
    /// manifest keeps restoring into the same directory.
    pub fn state_dir(&self, root: &Path) -> PathBuf {
        let digest = Sha256::digest(self.manifest.to_string_lossy().as_bytes());
        let id = hex::encode(&digest[..STATE_DIR_DIGEST_BYTES]);
        root.join(format!("{}-{}", self.arch, id))
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.manifest.display(), self.arch)
    }
}

/// Composite cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// SHA-256 hex digest of a file, read in fixed-size chunks
pub async fn checksum_file(path: &Path) -> FlatterResult<String> {
    let mut file = File::open(path)
        .await
        .map_err(|e| FlatterError::io(format!("opening {}", path.display()), e))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHECKSUM_BUFFER_SIZE];

    loop {
        let read = file
            .read(&mut buffer)
            .await
            .map_err(|e| FlatterError::io(format!("reading {}", path.display()), e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Derive the build-state key `{base_key}-{arch}-{checksum}`
///
/// An empty `base_key` disables caching and yields `None`.
pub async fn derive_key(base_key: &str, target: &BuildTarget) -> FlatterResult<Option<CacheKey>> {
    if base_key.is_empty() {
        debug!("No base cache key, caching disabled for {}", target);
        return Ok(None);
    }

    let checksum = checksum_file(&target.manifest).await?;
    Ok(Some(CacheKey(format!(
        "{}-{}-{}",
        base_key, target.arch, checksum
    ))))
}

/// Fallback prefix for build state of `arch`
pub fn build_restore_prefix(base_key: &str, arch: &str) -> String {
    format!("{}-{}-", base_key, arch)
}

/// Repository key `{base_key}-{gpg_key}-{timestamp}` (signer omitted when unsigned)
pub fn repository_key(base_key: &str, gpg_key: Option<&str>, timestamp_ms: i64) -> CacheKey {
    CacheKey(format!(
        "{}{}",
        repository_restore_prefix(base_key, gpg_key),
        timestamp_ms
    ))
}

/// Prefix matching every repository key of this configuration
///
/// Signed and unsigned repositories never restore each other.
pub fn repository_restore_prefix(base_key: &str, gpg_key: Option<&str>) -> String {
    match gpg_key {
        Some(gpg_key) => format!("{}-{}-", base_key, gpg_key),
        None => format!("{}-", base_key),
    }
}

/// Version digest of a cached path set
///
/// Entries saved for one set of paths never satisfy a restore for another.
pub fn cache_version(paths: &[PathBuf]) -> String {
    let mut hasher = Sha256::new();
    for path in paths {
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(b"|");
    }
    hasher.update(b"tar");
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[tokio::test]
    async fn checksum_known_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.json");
        fs::write(&path, b"").unwrap();

        assert_eq!(checksum_file(&path).await.unwrap(), EMPTY_SHA256);
    }

    #[tokio::test]
    async fn checksum_spans_buffer_boundary() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("large.json");
        let data = vec![b'x'; CHECKSUM_BUFFER_SIZE * 2 + 17];
        fs::write(&path, &data).unwrap();

        let expected = hex::encode(Sha256::digest(&data));
        assert_eq!(checksum_file(&path).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn derive_key_deterministic() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("a.json");
        let second = dir.path().join("b.json");
        fs::write(&first, br#"{"app-id": "org.example.App"}"#).unwrap();
        fs::write(&second, br#"{"app-id": "org.example.App"}"#).unwrap();

        let key1 = derive_key("flatter", &BuildTarget::new(&first, "x86_64"))
            .await
            .unwrap()
            .unwrap();
        let key2 = derive_key("flatter", &BuildTarget::new(&second, "x86_64"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(key1, key2);
        assert!(key1.as_str().starts_with("flatter-x86_64-"));
        assert_eq!(key1.as_str().len(), "flatter-x86_64-".len() + 64);
    }

    #[tokio::test]
    async fn derive_key_single_bit_flip() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("a.json");
        let second = dir.path().join("b.json");
        fs::write(&first, b"{\"branch\": \"stable\"}").unwrap();
        // 's' (0x73) -> 'r' (0x72)
        fs::write(&second, b"{\"branch\": \"rtable\"}").unwrap();

        let key1 = derive_key("flatter", &BuildTarget::new(&first, "x86_64")).await.unwrap();
        let key2 = derive_key("flatter", &BuildTarget::new(&second, "x86_64")).await.unwrap();

        assert_ne!(key1, key2);
    }

    #[tokio::test]
    async fn derive_key_depends_on_arch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.yml");
        fs::write(&path, b"app-id: org.example.App\n").unwrap();

        let x86 = derive_key("flatter", &BuildTarget::new(&path, "x86_64")).await.unwrap();
        let arm = derive_key("flatter", &BuildTarget::new(&path, "aarch64")).await.unwrap();

        assert_ne!(x86, arm);
    }

    #[tokio::test]
    async fn empty_base_key_disables() {
        // The manifest is never opened when caching is disabled
        let target = BuildTarget::new("/nonexistent/app.json", "x86_64");
        assert_eq!(derive_key("", &target).await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_manifest_is_io_error() {
        let target = BuildTarget::new("/nonexistent/app.json", "x86_64");
        assert!(matches!(
            derive_key("flatter", &target).await,
            Err(FlatterError::Io { .. })
        ));
    }

    #[test]
    fn repository_keys() {
        assert_eq!(
            repository_key("flatter", None, 1700000000000).as_str(),
            "flatter-1700000000000"
        );
        assert_eq!(
            repository_key("flatter", Some("ABCD1234"), 1700000000000).as_str(),
            "flatter-ABCD1234-1700000000000"
        );
        assert_eq!(repository_restore_prefix("flatter", Some("ABCD1234")), "flatter-ABCD1234-");
        assert_eq!(build_restore_prefix("flatter", "aarch64"), "flatter-aarch64-");
    }

    #[test]
    fn state_dir_per_manifest_and_arch() {
        let root = Path::new(".flatpak-builder");
        let app = BuildTarget::new("org.example.App.yml", "x86_64");
        let tool = BuildTarget::new("org.example.Tool.yml", "x86_64");
        let app_arm = BuildTarget::new("org.example.App.yml", "aarch64");

        let dir = app.state_dir(root);
        assert!(dir.starts_with(root));
        assert!(dir
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("x86_64-"));
        assert_eq!(dir, app.state_dir(root));
        assert_ne!(dir, tool.state_dir(root));
        assert_ne!(dir, app_arm.state_dir(root));
    }

    #[test]
    fn cache_version_depends_on_paths() {
        let repo = cache_version(&[PathBuf::from("repo")]);
        let state = cache_version(&[PathBuf::from(".flatpak-builder")]);

        assert_ne!(repo, state);
        assert_eq!(repo, cache_version(&[PathBuf::from("repo")]));
    }
}
