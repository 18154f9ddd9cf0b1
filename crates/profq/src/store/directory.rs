use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::StorageError;
use crate::job::ArtifactKind;
use crate::store::principal::Principal;

/// Principal directories are shared with the worker process, which may run
/// under a different account.
pub const DIRECTORY_MODE: u32 = 0o777;
/// Input files: readable by everyone, writable by the owner.
pub const FILE_MODE: u32 = 0o644;

/// Attempts made by `create_unique_file` before giving up.
const UNIQUE_ATTEMPTS: usize = 16;
/// Highest `_N` suffix tried by `create_named_file`.
const NAMED_ATTEMPTS: usize = 1000;

/// Every file a job named `S` may own.
const JOB_FILE_KINDS: [ArtifactKind; 8] = [
    ArtifactKind::Input,
    ArtifactKind::JobCopy,
    ArtifactKind::Csv,
    ArtifactKind::Log,
    ArtifactKind::Progress,
    ArtifactKind::Busy,
    ArtifactKind::Lock,
    ArtifactKind::Mx,
];

/// One file found in a principal directory.
#[derive(Debug, Clone)]
pub struct StoreEntry {
    pub stem: String,
    pub extension: Option<String>,
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
}

impl StoreEntry {
    pub fn file_name(&self) -> String {
        match &self.extension {
            Some(ext) => format!("{}.{}", self.stem, ext),
            None => self.stem.clone(),
        }
    }
}

/// Splits a file name on its last dot. Names without a dot, or whose only
/// dot is the first character, have no extension.
pub fn split_file_name(name: &str) -> (String, Option<String>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), Some(ext.to_string())),
        _ => (name.to_string(), None),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalFailure {
    pub file_name: String,
    pub reason: String,
}

/// Outcome of a best-effort multi-file removal.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalReport {
    pub removed: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<RemovalFailure>,
}

impl RemovalReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn merge(&mut self, other: RemovalReport) {
        self.removed.extend(other.removed);
        self.failures.extend(other.failures);
    }
}

/// Durable job artifact storage, one directory per principal.
pub struct JobDirectoryStore {
    job_root: PathBuf,
}

impl JobDirectoryStore {
    pub fn new<P: AsRef<Path>>(job_root: P) -> Self {
        Self {
            job_root: job_root.as_ref().to_path_buf(),
        }
    }

    pub fn job_root(&self) -> &Path {
        &self.job_root
    }

    /// Where `principal`'s artifacts live, whether or not it exists yet.
    pub fn principal_dir(&self, principal: &Principal) -> PathBuf {
        self.job_root.join(principal.as_str())
    }

    /// Creates the principal's directory if absent. Idempotent.
    pub fn ensure_root(&self, principal: &Principal) -> Result<PathBuf, StorageError> {
        let dir = self.principal_dir(principal);
        if dir.is_dir() {
            return Ok(dir);
        }

        let root_existed = self.job_root.is_dir();
        std::fs::create_dir_all(&dir).map_err(|e| StorageError::CreateDirectory {
            path: dir.clone(),
            source: e,
        })?;

        set_mode(&dir, DIRECTORY_MODE)?;
        if !root_existed {
            set_mode(&self.job_root, DIRECTORY_MODE)?;
        }

        info!("Created job directory for principal {}", principal);
        Ok(dir)
    }

    /// Atomically creates a new, empty file named `<prefix><timestamp>_<token>`
    /// inside `dir`. The name never collides with an existing file.
    pub fn create_unique_file(&self, dir: &Path, prefix: &str) -> Result<PathBuf, StorageError> {
        for _ in 0..UNIQUE_ATTEMPTS {
            let token = uuid::Uuid::new_v4().simple().to_string();
            let name = format!(
                "{}{}_{}",
                prefix,
                Utc::now().format("%Y%m%d%H%M%S"),
                &token[..8]
            );
            let path = dir.join(&name);

            match create_new(&path) {
                Ok(_) => return Ok(path),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("Unique name {} already taken, retrying", name);
                    continue;
                }
                Err(e) => return Err(StorageError::CreateFile { path, source: e }),
            }
        }

        Err(StorageError::NamesExhausted {
            dir: dir.to_path_buf(),
            prefix: prefix.to_string(),
        })
    }

    /// Atomically creates `base`, or `base_2`, `base_3`, ... when taken.
    ///
    /// A candidate counts as taken when any file in `dir` already uses it as
    /// its stem, so a new input never adopts the results of an older job. It
    /// is also skipped when one of the files the job would own is named in
    /// `reserved`.
    pub fn create_named_file(
        &self,
        dir: &Path,
        base: &str,
        reserved: &[&str],
    ) -> Result<PathBuf, StorageError> {
        let taken: HashSet<String> = self.list(dir)?.into_iter().map(|e| e.stem).collect();

        for counter in 1..=NAMED_ATTEMPTS {
            let name = if counter == 1 {
                base.to_string()
            } else {
                format!("{}_{}", base, counter)
            };
            if taken.contains(&name) || claims_reserved(&name, reserved) {
                continue;
            }
            let path = dir.join(&name);

            match create_new(&path) {
                Ok(_) => return Ok(path),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(StorageError::CreateFile { path, source: e }),
            }
        }

        Err(StorageError::NamesExhausted {
            dir: dir.to_path_buf(),
            prefix: base.to_string(),
        })
    }

    /// Writes `content` into an already allocated file and applies `FILE_MODE`.
    pub fn write_input(&self, path: &Path, content: &[u8]) -> Result<(), StorageError> {
        std::fs::write(path, content).map_err(|e| StorageError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        set_mode(path, FILE_MODE)
    }

    /// Copies `source` over an already allocated file and applies `FILE_MODE`.
    pub fn copy_input(&self, source: &Path, path: &Path) -> Result<(), StorageError> {
        std::fs::copy(source, path).map_err(|e| StorageError::CopyFile {
            from: source.to_path_buf(),
            to: path.to_path_buf(),
            source: e,
        })?;
        set_mode(path, FILE_MODE)
    }

    /// Enumerates the regular files directly inside `dir`. Order is whatever
    /// the filesystem returns.
    pub fn list(&self, dir: &Path) -> Result<Vec<StoreEntry>, StorageError> {
        let mut entries = Vec::new();

        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(StorageError::ReadDirectory {
                        path: dir.to_path_buf(),
                        source: e,
                    });
                }
                Err(e) => {
                    // Files can vanish while a worker is finishing.
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(name) = entry.file_name().to_str() else {
                warn!("Skipping non UTF-8 file name in job directory");
                continue;
            };
            if name.starts_with('.') {
                continue;
            }

            let (stem, extension) = split_file_name(name);
            let modified = entry.metadata().ok().and_then(|m| m.modified().ok());

            entries.push(StoreEntry {
                stem,
                extension,
                path: entry.path().to_path_buf(),
                modified,
            });
        }

        Ok(entries)
    }

    /// Removes one file. Returns `Ok(false)` when it was already gone.
    pub fn remove(&self, path: &Path) -> Result<bool, StorageError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::RemoveFile {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Removes every file in `dir` whose stem is exactly `stem`.
    ///
    /// Each removal is independent; failures are collected in the report.
    pub fn remove_all_with_stem(
        &self,
        dir: &Path,
        stem: &str,
    ) -> Result<RemovalReport, StorageError> {
        let entries = self.list(dir)?;
        Ok(self.remove_entries(entries.iter().filter(|e| e.stem == stem)))
    }

    /// Best-effort removal of the given entries.
    pub fn remove_entries<'a, I>(&self, entries: I) -> RemovalReport
    where
        I: IntoIterator<Item = &'a StoreEntry>,
    {
        let mut report = RemovalReport::default();

        for entry in entries {
            match self.remove(&entry.path) {
                Ok(true) => report.removed.push(entry.file_name()),
                Ok(false) => {}
                Err(e) => {
                    warn!("Failed to remove {}: {}", entry.file_name(), e);
                    let reason = match &e {
                        StorageError::RemoveFile { source, .. } => source.to_string(),
                        other => other.to_string(),
                    };
                    report.failures.push(RemovalFailure {
                        file_name: entry.file_name(),
                        reason,
                    });
                }
            }
        }

        report
    }
}

fn claims_reserved(stem: &str, reserved: &[&str]) -> bool {
    JOB_FILE_KINDS
        .iter()
        .any(|kind| reserved.contains(&kind.file_name(stem).as_str()))
}

fn create_new(path: &Path) -> std::io::Result<File> {
    // O_CREAT | O_EXCL
    OpenOptions::new().write(true).create_new(true).open(path)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), StorageError> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(|e| {
        StorageError::SetPermissions {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), StorageError> {
    Ok(())
}
