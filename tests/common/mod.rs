//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new()
//!         .with_kustomization("", "resources:\n- cm.yaml\n")
//!         .with_file("cm.yaml", manifests::CONFIG_MAP);
//!     // ... test code
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::manifests;
    pub use super::TestFixture;
}

/// Manifest snippets shared by several tests.
#[allow(dead_code)]
pub mod manifests {
    pub const CONFIG_MAP: &str = "apiVersion: v1
kind: ConfigMap
metadata:
  name: settings
data:
  MODE: dev
";

    pub const DEPLOYMENT: &str = "apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
spec:
  replicas: 1
  template:
    spec:
      containers:
      - name: web
        image: nginx
";

    pub const SERVICE: &str = "apiVersion: v1
kind: Service
metadata:
  name: web
spec:
  selector:
    app: web
";
}

/// A temporary directory holding one or more kustomization roots.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write `kustomization.yaml` into the directory `dir` (relative to the
    /// fixture; `""` for the top).
    pub fn with_kustomization(self, dir: &str, content: &str) -> Self {
        let path = if dir.is_empty() {
            "kustomization.yaml".to_string()
        } else {
            format!("{}/kustomization.yaml", dir)
        };
        self.with_file(&path, content)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Add an executable shell script.
    #[cfg(unix)]
    pub fn with_script(self, path: &str, body: &str) -> Self {
        use std::os::unix::fs::PermissionsExt;

        let fixture = self.with_file(path, &format!("#!/bin/sh\n{}", body));
        let full = fixture.path().join(path);
        let mut perms = std::fs::metadata(&full)
            .expect("Failed to stat script")
            .permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&full, perms).expect("Failed to make script executable");
        fixture
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// A path inside the fixture.
    pub fn join(&self, path: &str) -> PathBuf {
        self.temp_dir.path().join(path)
    }

    /// Create a command for the `kustomize` binary, run in this fixture.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("kustomize");
        cmd.current_dir(self.path())
            .env_remove("KUSTOMIZE_ENABLE_EXEC")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_writes_kustomization() {
        let fixture = TestFixture::new()
            .with_kustomization("", "resources: []\n")
            .with_kustomization("base", "resources: []\n");
        assert!(fixture.join("kustomization.yaml").exists());
        assert!(fixture.join("base/kustomization.yaml").exists());
    }

    #[test]
    fn test_manifests_are_valid_yaml() {
        for manifest in [manifests::CONFIG_MAP, manifests::DEPLOYMENT, manifests::SERVICE] {
            let parsed: Result<serde_yaml::Value, _> = serde_yaml::from_str(manifest);
            assert!(parsed.is_ok());
        }
    }
}
