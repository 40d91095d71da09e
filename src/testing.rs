//! In-memory doubles for the runner, cache, artifact and tool seams

use crate::action::ActionContext;
use crate::artifact::{ArtifactService, ArtifactUpload};
use crate::cache::{CacheId, CacheService};
use crate::error::{FlatterError, FlatterResult};
use crate::flatpak::ToolRunner;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

/// Action context keeping everything in memory
#[derive(Default)]
pub struct MemoryContext {
    inputs: HashMap<String, String>,
    state: Mutex<HashMap<String, String>>,
    outputs: Mutex<HashMap<String, String>>,
    warnings: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    groups: Mutex<Vec<String>>,
    failed: AtomicBool,
}

impl MemoryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, name: &str, value: &str) -> Self {
        self.inputs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn output(&self, name: &str) -> Option<String> {
        self.outputs.lock().unwrap().get(name).cloned()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn groups(&self) -> Vec<String> {
        self.groups.lock().unwrap().clone()
    }
}

impl ActionContext for MemoryContext {
    fn input(&self, name: &str) -> Option<String> {
        self.inputs.get(name).cloned()
    }

    fn set_output(&self, name: &str, value: &str) -> FlatterResult<()> {
        self.outputs
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn state(&self, name: &str) -> Option<String> {
        self.state.lock().unwrap().get(name).cloned()
    }

    fn set_state(&self, name: &str, value: &str) -> FlatterResult<()> {
        self.state
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn start_group(&self, title: &str) {
        self.groups.lock().unwrap().push(title.to_string());
    }

    fn end_group(&self) {}

    fn warning(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    fn set_failed(&self, message: &str) {
        self.error(message);
        self.failed.store(true, Ordering::SeqCst);
    }

    fn is_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }
}

/// Tool runner that records command lines instead of executing them
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<String>>,
    stdout: HashMap<String, String>,
    failing: Vec<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `stdout` from `output` calls to `program`
    pub fn with_stdout(mut self, program: &str, stdout: &str) -> Self {
        self.stdout.insert(program.to_string(), stdout.to_string());
        self
    }

    /// Fail every command line containing `pattern`
    pub fn failing_on(mut self, pattern: &str) -> Self {
        self.failing.push(pattern.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, program: &str, args: &[String]) -> FlatterResult<()> {
        let line = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().unwrap().push(line.clone());

        if self.failing.iter().any(|pattern| line.contains(pattern)) {
            return Err(FlatterError::tool_failed(line, Some(1), "simulated failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl ToolRunner for RecordingRunner {
    async fn run(&self, program: &str, args: &[String]) -> FlatterResult<()> {
        self.record(program, args)
    }

    async fn output(&self, program: &str, args: &[String]) -> FlatterResult<String> {
        self.record(program, args)?;
        Ok(self.stdout.get(program).cloned().unwrap_or_default())
    }
}

/// Cache service holding keys only, oldest first
pub struct MemoryCache {
    entries: Mutex<Vec<String>>,
    saved: Mutex<Vec<(String, Vec<PathBuf>)>>,
    restores: AtomicUsize,
    available: bool,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            saved: Mutex::new(Vec::new()),
            restores: AtomicUsize::new(0),
            available: true,
        }
    }

    pub fn with_entry(self, key: &str) -> Self {
        self.entries.lock().unwrap().push(key.to_string());
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn saved_keys(&self) -> Vec<String> {
        self.saved
            .lock()
            .unwrap()
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn saved_paths(&self, key: &str) -> Option<Vec<PathBuf>> {
        self.saved
            .lock()
            .unwrap()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, paths)| paths.clone())
    }

    pub fn restore_calls(&self) -> usize {
        self.restores.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheService for MemoryCache {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn restore(
        &self,
        _paths: &[PathBuf],
        key: &str,
        restore_keys: &[String],
    ) -> FlatterResult<Option<String>> {
        self.restores.fetch_add(1, Ordering::SeqCst);
        let entries = self.entries.lock().unwrap();

        if entries.iter().any(|e| e == key) {
            return Ok(Some(key.to_string()));
        }

        let mut prefixes: Vec<&String> = restore_keys.iter().collect();
        prefixes.sort_by_key(|prefix| std::cmp::Reverse(prefix.len()));

        Ok(prefixes.into_iter().find_map(|prefix| {
            entries
                .iter()
                .rev()
                .find(|e| e.starts_with(prefix.as_str()))
                .cloned()
        }))
    }

    async fn save(&self, paths: &[PathBuf], key: &str) -> FlatterResult<Option<CacheId>> {
        let mut entries = self.entries.lock().unwrap();
        if entries.iter().any(|e| e == key) {
            return Ok(None);
        }
        entries.push(key.to_string());
        self.saved
            .lock()
            .unwrap()
            .push((key.to_string(), paths.to_vec()));
        Ok(Some(entries.len() as CacheId))
    }
}

/// Cache service that is reachable but fails every request
pub struct FailingCache;

#[async_trait]
impl CacheService for FailingCache {
    fn is_available(&self) -> bool {
        true
    }

    async fn restore(
        &self,
        _paths: &[PathBuf],
        _key: &str,
        _restore_keys: &[String],
    ) -> FlatterResult<Option<String>> {
        Err(FlatterError::CacheService("connection refused".to_string()))
    }

    async fn save(&self, _paths: &[PathBuf], _key: &str) -> FlatterResult<Option<CacheId>> {
        Err(FlatterError::CacheService("connection refused".to_string()))
    }
}

/// Artifact service recording uploads by name
#[derive(Default)]
pub struct MemoryArtifacts {
    uploads: Mutex<Vec<(String, Vec<PathBuf>)>>,
}

impl MemoryArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<String> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn files(&self, name: &str) -> Option<Vec<PathBuf>> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, files)| files.clone())
    }
}

#[async_trait]
impl ArtifactService for MemoryArtifacts {
    async fn upload(
        &self,
        name: &str,
        files: &[PathBuf],
        _root_dir: &Path,
    ) -> FlatterResult<ArtifactUpload> {
        let mut uploads = self.uploads.lock().unwrap();
        if uploads.iter().any(|(n, _)| n == name) {
            return Err(FlatterError::ArtifactExists(name.to_string()));
        }
        uploads.push((name.to_string(), files.to_vec()));

        Ok(ArtifactUpload {
            id: Uuid::new_v4(),
            name: name.to_string(),
            size: 0,
        })
    }
}
