//! # Root-relative Loading
//!
//! A `FileLoader` is bound to one kustomization root. It reads files
//! relative to that root and creates child loaders for bases and
//! components, which may live on the same filesystem or in a cloned remote
//! repository.
//!
//! Each loader remembers the chain of roots that led to it. Creating a child
//! loader for a root that is already part of that chain is a cycle and
//! fails with `Error::CycleDetected`.

use crate::error::{Error, Result};
use crate::filesystem::{DiskFS, FileSystem};
use crate::repository::{RemoteSpec, RepositoryManager};
use log::debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Loader bound to a single root directory
#[derive(Clone)]
pub struct FileLoader {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    /// Roots of the enclosing accumulation chain, outermost first.
    ancestry: Vec<PathBuf>,
    repos: Option<Arc<RepositoryManager>>,
}

impl std::fmt::Debug for FileLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLoader")
            .field("root", &self.root)
            .field("ancestry", &self.ancestry)
            .finish()
    }
}

impl FileLoader {
    /// Create a loader for the directory `root` on `fs`.
    pub fn new(fs: Arc<dyn FileSystem>, root: impl AsRef<Path>) -> Result<Self> {
        let root = fs.canonical(root.as_ref());
        if !fs.is_dir(&root) {
            return Err(Error::Loader {
                path: root,
                message: "not a directory".to_string(),
            });
        }
        Ok(Self {
            fs,
            root,
            ancestry: Vec::new(),
            repos: None,
        })
    }

    /// Allow remote bases, fetched through `repos`.
    pub fn with_repositories(mut self, repos: Arc<RepositoryManager>) -> Self {
        self.repos = Some(repos);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    /// Resolve `location` against the root.
    pub fn resolve(&self, location: &str) -> PathBuf {
        self.fs.canonical(&self.root.join(location))
    }

    /// Whether `location` names a directory (or a remote repository) that
    /// should be accumulated as a base rather than read as a file.
    pub fn is_base(&self, location: &str) -> bool {
        RemoteSpec::is_remote(location) || self.fs.is_dir(&self.resolve(location))
    }

    /// Read a file that must live inside the root.
    pub fn load(&self, location: &str) -> Result<Vec<u8>> {
        if RemoteSpec::is_remote(location) {
            return Err(Error::Loader {
                path: PathBuf::from(location),
                message: "remote files cannot be loaded directly; reference a repository directory"
                    .to_string(),
            });
        }
        let path = self.resolve(location);
        if !path.starts_with(&self.root) {
            return Err(Error::Loader {
                path,
                message: format!("security; file is not in or below '{}'", self.root.display()),
            });
        }
        self.fs.read_file(&path)
    }

    /// Read a file as UTF-8 text.
    pub fn load_string(&self, location: &str) -> Result<String> {
        let bytes = self.load(location)?;
        String::from_utf8(bytes).map_err(|e| Error::Loader {
            path: self.resolve(location),
            message: format!("not valid UTF-8: {}", e),
        })
    }

    /// Create a loader for a base or component referenced from this root.
    pub fn new_loader(&self, location: &str) -> Result<FileLoader> {
        let (fs, root): (Arc<dyn FileSystem>, PathBuf) = if RemoteSpec::is_remote(location) {
            let spec = RemoteSpec::parse(location)?;
            let repos = self.repos.as_ref().ok_or_else(|| Error::Loader {
                path: PathBuf::from(location),
                message: "remote bases are not enabled for this build".to_string(),
            })?;
            let dir = repos.fetch(&spec)?;
            let disk: Arc<dyn FileSystem> = Arc::new(DiskFS);
            let root = disk.canonical(&dir);
            (disk, root)
        } else {
            (self.fs.clone(), self.resolve(location))
        };

        self.check_cycle(&root)?;
        if !fs.is_dir(&root) {
            return Err(Error::Loader {
                path: root,
                message: "base is not a directory".to_string(),
            });
        }
        debug!("new loader for {} (from {})", root.display(), self.root.display());

        let mut ancestry = self.ancestry.clone();
        ancestry.push(self.root.clone());
        Ok(FileLoader {
            fs,
            root,
            ancestry,
            repos: self.repos.clone(),
        })
    }

    fn check_cycle(&self, candidate: &Path) -> Result<()> {
        let chain: Vec<&PathBuf> = self.ancestry.iter().chain(std::iter::once(&self.root)).collect();
        if let Some(start) = chain.iter().position(|p| p.as_path() == candidate) {
            let mut cycle: Vec<String> = chain[start..]
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            cycle.push(candidate.display().to_string());
            return Err(Error::CycleDetected {
                cycle: cycle.join(" -> "),
            });
        }
        Ok(())
    }
}
