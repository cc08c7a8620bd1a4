//! Testing utilities for Folio workspace
//!
//! Shared test helpers, fixtures, and an in-memory storage backend.

#![allow(missing_docs)]

use folio_model::{FolderPath, ProjectWorkspaceIdentity};
use folio_storage::{DeleteOutcome, FolderOutcome, StorageBackend, StorageError};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Injected failure for a specific path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// HTTP 500 style server error
    Server,
    /// Rejected bearer token
    Unauthorized,
}

impl Failure {
    fn to_error(self, path: &FolderPath) -> StorageError {
        match self {
            Self::Server => StorageError::Http {
                status: 500,
                path: path.clone(),
                body: "injected failure".into(),
            },
            Self::Unauthorized => StorageError::Unauthorized { path: path.clone() },
        }
    }
}

#[derive(Debug, Default)]
struct State {
    folders: BTreeSet<FolderPath>,
    files: BTreeMap<FolderPath, Vec<u8>>,
}

/// Storage backend kept in memory
///
/// Behaves like the Graph drive: a folder can only be created once its
/// parent exists, and an existing folder reports
/// [`FolderOutcome::AlreadyExisted`]. Counts mutations and peak in-flight
/// creations so tests can assert on side effects and concurrency bounds.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
    failures: Mutex<HashMap<FolderPath, Failure>>,
    latency: Option<Duration>,
    mutations: AtomicUsize,
    create_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every folder creation by `latency`
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every operation on exactly `path` fail
    pub fn fail_on(&self, path: &str, failure: Failure) {
        self.failures.lock().insert(parse(path), failure);
    }

    /// Insert a folder and its ancestors without counting mutations
    pub fn insert_folder(&self, path: &str) {
        let path = parse(path);
        let mut state = self.state.lock();
        for prefix in path.ancestors_inclusive() {
            state.folders.insert(prefix);
        }
    }

    /// Insert a file without counting mutations
    pub fn insert_file(&self, path: &str, contents: &[u8]) {
        self.state.lock().files.insert(parse(path), contents.to_vec());
    }

    pub fn has_folder(&self, path: &str) -> bool {
        self.state.lock().folders.contains(&parse(path))
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().files.get(&parse(path)).cloned()
    }

    pub fn folders(&self) -> Vec<FolderPath> {
        self.state.lock().folders.iter().cloned().collect()
    }

    pub fn files(&self) -> Vec<FolderPath> {
        self.state.lock().files.keys().cloned().collect()
    }

    /// Folders strictly below `prefix`
    pub fn folders_under(&self, prefix: &str) -> Vec<FolderPath> {
        let prefix = parse(prefix);
        self.state
            .lock()
            .folders
            .iter()
            .filter(|f| prefix.is_prefix_of(f) && **f != prefix)
            .cloned()
            .collect()
    }

    /// Number of files anywhere below `prefix`
    pub fn file_count_under(&self, prefix: &str) -> usize {
        let prefix = parse(prefix);
        self.state
            .lock()
            .files
            .keys()
            .filter(|f| prefix.is_prefix_of(f))
            .count()
    }

    /// Folders and files changed so far (creates, uploads, moves, deletes)
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Calls to `create_folder`, including ones that found the folder
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous `create_folder` calls observed
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn injected(&self, path: &FolderPath) -> Result<(), StorageError> {
        match self.failures.lock().get(path) {
            Some(failure) => Err(failure.to_error(path)),
            None => Ok(()),
        }
    }

    fn mutated(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl StorageBackend for MemoryBackend {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn create_folder(&self, path: &FolderPath) -> Result<FolderOutcome, StorageError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.injected(path)?;
        let mut state = self.state.lock();
        if state.folders.contains(path) {
            return Ok(FolderOutcome::AlreadyExisted);
        }
        if let Some(parent) = path.parent().filter(|p| !p.is_empty()) {
            if !state.folders.contains(&parent) {
                return Err(StorageError::Http {
                    status: 404,
                    path: path.clone(),
                    body: format!("parent '{parent}' does not exist"),
                });
            }
        }
        state.folders.insert(path.clone());
        drop(state);
        self.mutated();
        Ok(FolderOutcome::Created)
    }

    async fn upload_file(&self, path: &FolderPath, contents: Vec<u8>) -> Result<(), StorageError> {
        self.injected(path)?;
        self.state.lock().files.insert(path.clone(), contents);
        self.mutated();
        Ok(())
    }

    async fn move_folder(&self, source: &FolderPath, destination: &FolderPath) -> Result<(), StorageError> {
        self.injected(source)?;
        let mut state = self.state.lock();
        if !state.folders.contains(source) {
            return Err(StorageError::NotFound(source.clone()));
        }
        if state.folders.contains(destination) {
            return Err(StorageError::AlreadyExists(destination.clone()));
        }

        for prefix in destination.parent().iter().flat_map(FolderPath::ancestors_inclusive) {
            if state.folders.insert(prefix) {
                self.mutated();
            }
        }

        let rebase = |p: &FolderPath| p.relative_to(source).map(|rel| destination.join(&rel)).ok();
        let moved_folders: Vec<_> = state.folders.iter().filter(|f| source.is_prefix_of(f)).cloned().collect();
        for old in moved_folders {
            state.folders.remove(&old);
            if let Some(new) = rebase(&old) {
                state.folders.insert(new);
            }
        }
        let moved_files: Vec<_> = state.files.keys().filter(|f| source.is_prefix_of(f)).cloned().collect();
        for old in moved_files {
            if let (Some(contents), Some(new)) = (state.files.remove(&old), rebase(&old)) {
                state.files.insert(new, contents);
            }
        }
        drop(state);
        self.mutated();
        Ok(())
    }

    async fn delete_folder(&self, path: &FolderPath) -> Result<DeleteOutcome, StorageError> {
        self.injected(path)?;
        let mut state = self.state.lock();
        if !state.folders.contains(path) {
            return Ok(DeleteOutcome::NotFound);
        }
        state.folders.retain(|f| !path.is_prefix_of(f));
        state.files.retain(|f, _| !path.is_prefix_of(f));
        drop(state);
        self.mutated();
        Ok(DeleteOutcome::Deleted)
    }

    async fn folder_exists(&self, path: &FolderPath) -> Result<bool, StorageError> {
        self.injected(path)?;
        Ok(self.state.lock().folders.contains(path))
    }
}

fn parse(path: &str) -> FolderPath {
    path.parse().unwrap()
}

/// Identity used across scenario tests
pub fn sample_identity() -> ProjectWorkspaceIdentity {
    ProjectWorkspaceIdentity::new("TC2602001", "Projeto Teste", "EMP").unwrap()
}

pub fn identity(number: &str, name: &str, client: &str) -> ProjectWorkspaceIdentity {
    ProjectWorkspaceIdentity::new(number, name, client).unwrap()
}

/// Template file names of a complete library
pub const TEMPLATE_FILES: &[&str] = &[
    "TCxxxxxx-0.docx",
    "TCxxxxxx-0_Simplificada.docx",
    "Relatorio de Visita_V0.docx",
    "TCxxxxxx-0.xlsm",
];

/// Temporary template library holding `files`, each containing its own name
pub fn template_library(files: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in files {
        write_template(dir.path(), name);
    }
    dir
}

/// Temporary template library with every known template
pub fn full_template_library() -> TempDir {
    template_library(TEMPLATE_FILES)
}

fn write_template(dir: &Path, name: &str) {
    std::fs::write(dir.join(name), name.as_bytes()).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> FolderPath {
        parse(s)
    }

    #[tokio::test]
    async fn create_requires_parent() {
        let backend = MemoryBackend::new();
        assert!(backend.create_folder(&p("a/b")).await.is_err());
        assert_eq!(backend.create_folder(&p("a")).await.unwrap(), FolderOutcome::Created);
        assert_eq!(backend.create_folder(&p("a/b")).await.unwrap(), FolderOutcome::Created);
        assert_eq!(backend.create_folder(&p("a/b")).await.unwrap(), FolderOutcome::AlreadyExisted);
        assert_eq!(backend.mutation_count(), 2);
        assert_eq!(backend.create_calls(), 4);
    }

    #[tokio::test]
    async fn move_rebases_subtree() {
        let backend = MemoryBackend::new();
        backend.insert_folder("s/x/child");
        backend.insert_file("s/x/child/f.txt", b"1");

        backend.move_folder(&p("s/x"), &p("d/y/x")).await.unwrap();

        assert!(!backend.has_folder("s/x"));
        assert!(backend.has_folder("s"));
        assert!(backend.has_folder("d/y/x/child"));
        assert_eq!(backend.file("d/y/x/child/f.txt").unwrap(), b"1");
    }

    #[tokio::test]
    async fn injected_failure_applies_to_exact_path() {
        let backend = MemoryBackend::new();
        backend.fail_on("a/b", Failure::Unauthorized);
        backend.insert_folder("a");

        let err = backend.create_folder(&p("a/b")).await.unwrap_err();
        assert!(err.is_auth_failure());
        assert!(backend.create_folder(&p("a/c")).await.is_ok());
    }

    #[tokio::test]
    async fn delete_reports_missing() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.delete_folder(&p("x")).await.unwrap(), DeleteOutcome::NotFound);
        backend.insert_folder("x/y");
        backend.insert_file("x/y/z", b"");
        assert_eq!(backend.delete_folder(&p("x")).await.unwrap(), DeleteOutcome::Deleted);
        assert!(backend.folders().is_empty());
        assert!(backend.files().is_empty());
    }

    #[test]
    fn template_library_contains_requested_files() {
        let dir = template_library(&["TCxxxxxx-0.docx"]);
        assert!(dir.path().join("TCxxxxxx-0.docx").is_file());
        assert!(!dir.path().join("TCxxxxxx-0.xlsm").exists());
    }
}
