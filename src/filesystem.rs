//! Filesystem abstraction consumed by the loader
//!
//! The build pipeline never touches the host filesystem directly. It reads
//! through the `FileSystem` trait, which has two implementations:
//!
//! - `DiskFS` reads from the host filesystem.
//! - `MemoryFS` keeps files in memory and is what the tests build roots in.
//!
//! Implementations must be safe for concurrent reads, since independent
//! builds may share one instance.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Read-only access to a tree of files
pub trait FileSystem: Send + Sync {
    /// Read the entire content of a file.
    fn read_file(&self, path: &Path) -> Result<Vec<u8>>;

    /// Check whether `path` is an existing regular file.
    fn is_file(&self, path: &Path) -> bool;

    /// Check whether `path` is an existing directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Make `path` absolute and lexically normalized.
    fn canonical(&self, path: &Path) -> PathBuf {
        normalize(path)
    }
}

/// Represents a file with content
#[derive(Debug, Clone)]
pub struct File {
    /// File content as bytes
    pub content: Vec<u8>,
}

impl File {
    /// Create a new file with content
    pub fn new(content: Vec<u8>) -> Self {
        Self { content }
    }

    /// Create a new file from string content
    pub fn from_string(content: &str) -> Self {
        Self::new(content.as_bytes().to_vec())
    }
}

/// In-memory filesystem rooted at `/`
///
/// Relative paths are resolved against `/`. Directories exist implicitly as
/// the parents of stored files; `add_dir` records an empty one explicitly.
#[derive(Debug, Clone, Default)]
pub struct MemoryFS {
    files: BTreeMap<PathBuf, File>,
    dirs: BTreeMap<PathBuf, ()>,
}

impl MemoryFS {
    /// Create a new empty filesystem
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a file
    pub fn add_file<P: AsRef<Path>>(&mut self, path: P, file: File) -> Result<()> {
        let path = normalize(path.as_ref());
        if self.dirs.contains_key(&path) {
            return Err(Error::Loader {
                path,
                message: "a directory already exists at this path".to_string(),
            });
        }
        let mut parent = path.parent();
        while let Some(dir) = parent {
            self.dirs.insert(dir.to_path_buf(), ());
            parent = dir.parent();
        }
        self.files.insert(path, file);
        Ok(())
    }

    /// Add a file with string content
    pub fn add_file_string<P: AsRef<Path>>(&mut self, path: P, content: &str) -> Result<()> {
        self.add_file(path, File::from_string(content))
    }

    /// Record an empty directory
    pub fn add_dir<P: AsRef<Path>>(&mut self, path: P) {
        let mut current = Some(normalize(path.as_ref()));
        while let Some(dir) = current {
            current = dir.parent().map(Path::to_path_buf);
            self.dirs.insert(dir, ());
        }
    }

    /// Check if a file exists
    pub fn exists<P: AsRef<Path>>(&self, path: P) -> bool {
        self.files.contains_key(&normalize(path.as_ref()))
    }

    /// Get the number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if filesystem is empty
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileSystem for MemoryFS {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        let path = normalize(path);
        self.files
            .get(&path)
            .map(|f| f.content.clone())
            .ok_or_else(|| Error::Loader {
                path,
                message: "file not found".to_string(),
            })
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(&normalize(path))
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.contains_key(&normalize(path))
    }
}

/// The host filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFS;

impl FileSystem for DiskFS {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|e| Error::Loader {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn canonical(&self, path: &Path) -> PathBuf {
        // Symlinked roots must compare equal for cycle detection.
        std::fs::canonicalize(path).unwrap_or_else(|_| {
            let absolute = if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            };
            normalize(&absolute)
        })
    }
}

/// Lexically normalize a path, resolving `.` and `..` and anchoring it at `/`.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}
