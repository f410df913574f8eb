//! # Remote Bases
//!
//! This module resolves `resources` and `components` entries that point at a
//! Git repository instead of a local directory, for example
//! `https://github.com/org/repo//deploy/base?ref=v1.2.0`.
//!
//! ## Design
//!
//! - **`RemoteSpec`**: the parsed form of a remote reference (clone URL,
//!   optional ref, optional sub-directory).
//! - **`GitOperations`**: the interface for cloning. `DefaultGitOperations`
//!   shells out to `git`; tests substitute a fake that writes files instead.
//! - **`RepositoryManager`**: owns the on-disk clone cache. A remote is cloned
//!   once per (URL, ref) and the clone directory is reused afterwards.

use crate::error::{Error, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};
use url::Url;

/// Trait for git operations - allows mocking in tests
pub trait GitOperations: Send + Sync {
    /// Clones a repository at a specific Git reference into `target_dir`.
    ///
    /// This is expected to be a shallow clone to optimize for speed and disk
    /// space.
    fn clone_shallow(&self, url: &str, ref_name: Option<&str>, target_dir: &Path) -> Result<()>;
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command to perform real Git operations.
pub struct DefaultGitOperations;

impl GitOperations for DefaultGitOperations {
    fn clone_shallow(&self, url: &str, ref_name: Option<&str>, target_dir: &Path) -> Result<()> {
        crate::git::clone_shallow(url, ref_name, target_dir)
    }
}

/// A parsed remote base reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSpec {
    /// URL handed to `git clone`
    pub clone_url: String,
    /// Branch or tag to check out
    pub r#ref: Option<String>,
    /// Directory inside the repository that holds the kustomization
    pub sub_path: String,
}

impl RemoteSpec {
    /// Check whether a `resources` entry names a remote repository.
    pub fn is_remote(location: &str) -> bool {
        let location = location.trim();
        ["https://", "http://", "ssh://", "git::", "git@", "github.com/"]
            .iter()
            .any(|prefix| location.starts_with(prefix))
    }

    /// Parse a remote reference.
    pub fn parse(location: &str) -> Result<Self> {
        let raw = location.trim();
        let raw = raw.strip_prefix("git::").unwrap_or(raw);

        let (body, query) = match raw.split_once('?') {
            Some((b, q)) => (b, Some(q)),
            None => (raw, None),
        };
        let r#ref = query.and_then(|q| {
            q.split('&').find_map(|pair| {
                let (key, value) = pair.split_once('=')?;
                match key {
                    "ref" | "version" if !value.is_empty() => Some(value.to_string()),
                    _ => None,
                }
            })
        });

        if let Some(rest) = body.strip_prefix("git@") {
            // scp-like syntax: git@host:org/repo//sub
            let (host, path) = rest.split_once(':').ok_or_else(|| Error::Loader {
                path: PathBuf::from(location),
                message: "ssh remote must look like git@host:org/repo".to_string(),
            })?;
            let (repo, sub_path) = split_repo_path(host, path);
            return Ok(Self {
                clone_url: format!("git@{}:{}", host, repo),
                r#ref,
                sub_path,
            });
        }

        let with_scheme = if body.starts_with("github.com/") {
            format!("https://{}", body)
        } else {
            body.to_string()
        };
        let url = Url::parse(&with_scheme)?;
        let host = url.host_str().unwrap_or_default().to_string();
        // Url collapses nothing, so an explicit `//` separator survives in the path.
        let path = url.path().trim_start_matches('/');
        let (repo, sub_path) = split_repo_path(&host, path);

        let mut clone_url = format!("{}://", url.scheme());
        if !url.username().is_empty() {
            clone_url.push_str(url.username());
            clone_url.push('@');
        }
        clone_url.push_str(&host);
        if let Some(port) = url.port() {
            clone_url.push_str(&format!(":{}", port));
        }
        clone_url.push('/');
        clone_url.push_str(&repo);

        Ok(Self {
            clone_url,
            r#ref,
            sub_path,
        })
    }
}

/// Split a repository path into (repo, sub-directory).
///
/// An explicit `//` or a `.git` suffix ends the repository part. Otherwise
/// GitHub paths use their first two segments and other hosts the whole path.
fn split_repo_path(host: &str, path: &str) -> (String, String) {
    if let Some((repo, sub)) = path.split_once("//") {
        return (repo.to_string(), sub.trim_matches('/').to_string());
    }
    if let Some(idx) = path.find(".git/") {
        let (repo, sub) = path.split_at(idx + 4);
        return (repo.to_string(), sub.trim_matches('/').to_string());
    }
    if host == "github.com" || host.ends_with(".github.com") {
        let mut parts = path.splitn(3, '/');
        let org = parts.next().unwrap_or_default();
        let name = parts.next().unwrap_or_default();
        let sub = parts.next().unwrap_or_default();
        let repo = if name.ends_with(".git") {
            format!("{}/{}", org, name)
        } else {
            format!("{}/{}.git", org, name)
        };
        return (repo, sub.trim_matches('/').to_string());
    }
    (path.trim_end_matches('/').to_string(), String::new())
}

/// The main entry point for fetching remote bases.
pub struct RepositoryManager {
    git_ops: Box<dyn GitOperations>,
    cache_root: PathBuf,
}

impl std::fmt::Debug for RepositoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryManager")
            .field("cache_root", &self.cache_root)
            .finish()
    }
}

impl RepositoryManager {
    /// Creates a new `RepositoryManager` using the system `git` and the
    /// given cache directory.
    pub fn new(cache_root: PathBuf) -> Self {
        Self {
            git_ops: Box::new(DefaultGitOperations),
            cache_root,
        }
    }

    /// Creates a `RepositoryManager` with a custom `GitOperations`
    /// implementation.
    pub fn with_operations(git_ops: Box<dyn GitOperations>, cache_root: PathBuf) -> Self {
        Self {
            git_ops,
            cache_root,
        }
    }

    /// Root directory of the clone cache
    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Fetch a remote base, cloning it on first use, and return the
    /// directory holding its kustomization.
    pub fn fetch(&self, spec: &RemoteSpec) -> Result<PathBuf> {
        let clone_dir =
            crate::git::url_to_cache_path(&self.cache_root, &spec.clone_url, spec.r#ref.as_deref());

        if clone_dir.is_dir() {
            debug!("using cached clone of {} at {}", spec.clone_url, clone_dir.display());
        } else {
            info!(
                "cloning {} ({})",
                spec.clone_url,
                spec.r#ref.as_deref().unwrap_or("default branch")
            );
            self.git_ops
                .clone_shallow(&spec.clone_url, spec.r#ref.as_deref(), &clone_dir)?;
        }

        let root = if spec.sub_path.is_empty() {
            clone_dir
        } else {
            clone_dir.join(&spec.sub_path)
        };
        if !root.is_dir() {
            return Err(Error::Loader {
                path: root,
                message: format!("'{}' is not a directory in {}", spec.sub_path, spec.clone_url),
            });
        }
        Ok(root)
    }
}
