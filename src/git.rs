//! Thin wrappers around the system `git` command used for remote bases.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;
use sha2::{Digest, Sha256};

use crate::error::Error;
use crate::path::encode_url_path;

/// Clone a repository at a specific ref using shallow clone
///
/// This uses the system git command, which automatically handles:
/// - SSH keys from ~/.ssh/
/// - Git credential helpers
/// - Personal access tokens
/// - Any authentication configured in ~/.gitconfig
///
/// When `ref_name` is `None` the remote's default branch is cloned.
pub fn clone_shallow(url: &str, ref_name: Option<&str>, target_dir: &Path) -> Result<(), Error> {
    // git won't clone into an existing non-empty dir
    if target_dir.exists() {
        fs::remove_dir_all(target_dir)?;
    }

    if let Some(parent) = target_dir.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut command = Command::new("git");
    command.args(["clone", "--depth=1"]);
    if let Some(r) = ref_name {
        command.args(["--branch", r]);
    }
    command.arg(url).arg(target_dir);
    debug!("running git clone for {} into {}", url, target_dir.display());

    let output = command.output().map_err(|e| Error::GitClone {
        url: url.to_string(),
        r#ref: ref_name.unwrap_or("HEAD").to_string(),
        message: e.to_string(),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);

        let message = if stderr.contains("Authentication failed")
            || stderr.contains("Permission denied")
            || stderr.contains("Could not read from remote repository")
        {
            format!(
                "Authentication failed. Make sure you have access to the repository.\n\
                For private repos, ensure you have:\n\
                - SSH key added to ssh-agent\n\
                - Git credentials configured\n\
                - Personal access token set up\n\
                Error: {}",
                stderr
            )
        } else {
            stderr.to_string()
        };

        return Err(Error::GitClone {
            url: url.to_string(),
            r#ref: ref_name.unwrap_or("HEAD").to_string(),
            message,
        });
    }

    Ok(())
}

/// Convert URL and ref to cache path
///
/// The directory name is a short content hash of the URL followed by the
/// filesystem-safe ref, so the same remote at two refs gets two clones.
pub fn url_to_cache_path(cache_root: &Path, url: &str, ref_name: Option<&str>) -> PathBuf {
    let digest = Sha256::digest(url.as_bytes());
    let url_hash: String = format!("{:x}", digest).chars().take(16).collect();
    let safe_ref = encode_url_path(ref_name.unwrap_or("HEAD"));

    cache_root.join(format!("{}-{}", url_hash, safe_ref))
}
