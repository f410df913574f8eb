//! Per-build settings supplied by the caller

use crate::defaults::{default_cache_root, DEFAULT_CONTAINER_RUNTIME, DEFAULT_PLUGIN_TIMEOUT};
use std::path::PathBuf;
use std::time::Duration;

/// Settings that apply to a whole build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Maximum run time of one external plugin invocation
    pub plugin_timeout: Duration,
    /// Whether exec and container plugins may run at all
    pub enable_external_plugins: bool,
    /// Binary used to run container plugins
    pub container_runtime: String,
    /// Where remote bases are cloned; `None` disables remote bases
    pub cache_root: Option<PathBuf>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            plugin_timeout: DEFAULT_PLUGIN_TIMEOUT,
            enable_external_plugins: false,
            container_runtime: DEFAULT_CONTAINER_RUNTIME.to_string(),
            cache_root: Some(default_cache_root()),
        }
    }
}

impl BuildOptions {
    pub fn with_external_plugins(mut self, enabled: bool) -> Self {
        self.enable_external_plugins = enabled;
        self
    }

    pub fn with_plugin_timeout(mut self, timeout: Duration) -> Self {
        self.plugin_timeout = timeout;
        self
    }

    pub fn with_cache_root(mut self, cache_root: Option<PathBuf>) -> Self {
        self.cache_root = cache_root;
        self
    }
}
