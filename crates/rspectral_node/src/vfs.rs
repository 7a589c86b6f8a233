//! Virtual filesystems consulted before the real one.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;
use walkdir::WalkDir;

use crate::error::ShimError;
use crate::posix;

/// Metadata reported by a virtual filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualMetadata {
    pub is_dir: bool,
    pub len: u64,
}

/// A read-only, slash addressed filesystem.
///
/// Paths are relative to the filesystem root: unrooted, slash separated and
/// without `.` or `..` elements. `.` alone names the root.
pub trait VirtualFs: Send + Sync + fmt::Debug {
    /// Reads the whole file at `path`.
    fn read(&self, path: &str) -> io::Result<Vec<u8>>;

    /// Returns metadata for the file or directory at `path`.
    fn metadata(&self, path: &str) -> io::Result<VirtualMetadata>;
}

fn validate_path(path: &str) -> Result<(), ShimError> {
    if path == "." {
        return Ok(());
    }
    let valid = !path.is_empty()
        && !posix::is_absolute(path)
        && path
            .split('/')
            .all(|part| !part.is_empty() && part != "." && part != "..");
    if valid {
        Ok(())
    } else {
        Err(ShimError::invalid_path(path))
    }
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such file in virtual filesystem: {path}"),
    )
}

/// An in-memory filesystem, typically holding bundled documents and
/// rulesets.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    files: BTreeMap<String, Arc<[u8]>>,
}

impl MemoryFs {
    /// Creates an empty filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file, replacing any previous content.
    pub fn with_file(mut self, path: &str, content: impl Into<Vec<u8>>) -> Result<Self, ShimError> {
        self.insert(path, content)?;
        Ok(self)
    }

    /// Adds a file, replacing any previous content.
    pub fn insert(&mut self, path: &str, content: impl Into<Vec<u8>>) -> Result<(), ShimError> {
        let path = posix::clean(path);
        validate_path(&path)?;
        self.files.insert(path, Arc::from(content.into()));
        Ok(())
    }

    /// Snapshots every regular file below `root`, keyed by its path
    /// relative to `root`.
    pub fn load_dir(root: impl AsRef<Path>) -> Result<Self, ShimError> {
        let root = root.as_ref();
        let mut memory = Self::new();

        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry.map_err(|e| ShimError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|_| ShimError::invalid_path(entry.path().display().to_string()))?;
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            memory.insert(&key, fs::read(entry.path())?)?;
        }

        debug!(root = %root.display(), files = memory.files.len(), "loaded virtual filesystem");
        Ok(memory)
    }

    /// Number of files held.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` when no file is held.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn is_dir(&self, path: &str) -> bool {
        if path == "." {
            return true;
        }
        let prefix = format!("{path}/");
        self.files
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(key, _)| key.starts_with(&prefix))
    }
}

impl VirtualFs for MemoryFs {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        validate_path(path).map_err(ShimError::into_io)?;
        self.files
            .get(path)
            .map(|content| content.to_vec())
            .ok_or_else(|| not_found(path))
    }

    fn metadata(&self, path: &str) -> io::Result<VirtualMetadata> {
        validate_path(path).map_err(ShimError::into_io)?;
        if let Some(content) = self.files.get(path) {
            return Ok(VirtualMetadata {
                is_dir: false,
                len: content.len() as u64,
            });
        }
        if self.is_dir(path) {
            return Ok(VirtualMetadata {
                is_dir: true,
                len: 0,
            });
        }
        Err(not_found(path))
    }
}

/// A filesystem rooted at a host directory.
#[derive(Debug, Clone)]
pub struct DirFs {
    root: PathBuf,
}

impl DirFs {
    /// Creates a filesystem serving files below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The host directory backing this filesystem.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn host_path(&self, path: &str) -> io::Result<PathBuf> {
        validate_path(path).map_err(ShimError::into_io)?;
        Ok(path
            .split('/')
            .filter(|part| *part != ".")
            .fold(self.root.clone(), |acc, part| acc.join(part)))
    }
}

impl VirtualFs for DirFs {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.host_path(path)?)
    }

    fn metadata(&self, path: &str) -> io::Result<VirtualMetadata> {
        let metadata = fs::metadata(self.host_path(path)?)?;
        Ok(VirtualMetadata {
            is_dir: metadata.is_dir(),
            len: metadata.len(),
        })
    }
}
