//! Default values for kustomize builds.
//!
//! This module provides centralized default values used by the library and
//! the CLI, ensuring consistency and avoiding duplication.

use std::path::PathBuf;
use std::time::Duration;

/// How long an external plugin may run before it is killed.
pub const DEFAULT_PLUGIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Binary used to run container plugins.
pub const DEFAULT_CONTAINER_RUNTIME: &str = "docker";

/// Returns the default cache root directory for remote bases.
///
/// Uses the platform-appropriate cache directory:
/// - Linux: `~/.cache/kustomize` (XDG Base Directory)
/// - macOS: `~/Library/Caches/kustomize`
/// - Windows: `{FOLDERID_LocalAppData}\kustomize`
///
/// Falls back to `.kustomize-cache` in the current directory if the
/// platform cache directory cannot be determined.
///
/// This can be overridden by the `--cache-root` CLI flag or the
/// `KUSTOMIZE_CACHE` environment variable.
pub fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".kustomize-cache"))
        .join("kustomize")
}
