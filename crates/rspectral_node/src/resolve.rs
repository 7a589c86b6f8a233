//! Routing of guest file access between a virtual and the real filesystem.

use std::fs;
use std::io;
use std::sync::Arc;
use std::time::SystemTime;

use tracing::warn;

use crate::posix;
use crate::vfs::VirtualFs;

/// Classification of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
    Symlink,
    BlockDevice,
    CharDevice,
    Fifo,
    Socket,
    Other,
}

impl FileKind {
    fn from_file_type(file_type: fs::FileType) -> Self {
        if file_type.is_symlink() {
            return Self::Symlink;
        }
        if file_type.is_dir() {
            return Self::Directory;
        }
        if file_type.is_file() {
            return Self::File;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            if file_type.is_block_device() {
                return Self::BlockDevice;
            }
            if file_type.is_char_device() {
                return Self::CharDevice;
            }
            if file_type.is_fifo() {
                return Self::Fifo;
            }
            if file_type.is_socket() {
                return Self::Socket;
            }
        }

        Self::Other
    }
}

/// Result of a stat-like inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub kind: FileKind,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

/// Where guest paths are looked up.
///
/// With a virtual filesystem present, a requested path is first made
/// relative to the working directory and looked up there. Any failure
/// falls back to the real filesystem with the path unchanged.
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    working_directory: String,
    fs: Option<Arc<dyn VirtualFs>>,
}

impl ResolutionContext {
    /// Creates a context for `working_directory`, optionally backed by a
    /// virtual filesystem.
    pub fn new(working_directory: impl Into<String>, fs: Option<Arc<dyn VirtualFs>>) -> Self {
        Self {
            working_directory: working_directory.into(),
            fs,
        }
    }

    /// The configured working directory.
    pub fn working_directory(&self) -> &str {
        &self.working_directory
    }

    /// Returns `true` when a virtual filesystem is configured.
    pub fn has_virtual_fs(&self) -> bool {
        self.fs.is_some()
    }

    /// Reads the whole file at `path`.
    pub fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        if let Some(result) = self.try_virtual(path, |fs, rel| fs.read(rel)) {
            return Ok(result);
        }
        fs::read(path)
    }

    /// Inspects `path`, following symlinks.
    pub fn stat(&self, path: &str) -> io::Result<FileStat> {
        if let Some(stat) = self.try_virtual(path, virtual_stat) {
            return Ok(stat);
        }
        fs::metadata(path).map(Into::into)
    }

    /// Inspects `path` without following a final symlink.
    pub fn lstat(&self, path: &str) -> io::Result<FileStat> {
        if let Some(stat) = self.try_virtual(path, virtual_stat) {
            return Ok(stat);
        }
        fs::symlink_metadata(path).map(Into::into)
    }

    fn try_virtual<T>(
        &self,
        path: &str,
        lookup: impl FnOnce(&dyn VirtualFs, &str) -> io::Result<T>,
    ) -> Option<T> {
        let fs = self.fs.as_deref()?;

        let rel = match posix::relative(&self.working_directory, path) {
            Ok(rel) => rel,
            Err(e) => {
                warn!("failed to resolve '{}' in virtual filesystem: {}", path, e);
                return None;
            }
        };

        match lookup(fs, &rel) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("failed to open '{}' from virtual filesystem: {}", rel, e);
                None
            }
        }
    }
}

fn virtual_stat(fs: &dyn VirtualFs, rel: &str) -> io::Result<FileStat> {
    let metadata = fs.metadata(rel)?;
    Ok(FileStat {
        kind: if metadata.is_dir {
            FileKind::Directory
        } else {
            FileKind::File
        },
        size: metadata.len,
        modified: None,
    })
}

impl From<fs::Metadata> for FileStat {
    fn from(metadata: fs::Metadata) -> Self {
        Self {
            kind: FileKind::from_file_type(metadata.file_type()),
            size: metadata.len(),
            modified: metadata.modified().ok(),
        }
    }
}
