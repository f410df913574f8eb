//! # Error Handling
//!
//! This module defines the centralized error type for the `kustomize`
//! library. It uses `thiserror` to build a single `Error` enum covering every
//! failure the build pipeline can report, each variant carrying enough context
//! (paths, resource ids, plugin ids) to reconstruct the failure chain.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Configuration lookup and parsing failures,
//!   identity conflicts, plugin failures, patch targeting failures and
//!   wrapped I/O or serialization errors all live here.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Failures inside a base are wrapped in `Error::BaseResolution`, which keeps
//! the child error reachable through `std::error::Error::source`. Walking the
//! source chain from the top-level error yields the path of every base that
//! was being accumulated when the failure happened.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for kustomize operations
#[derive(Error, Debug)]
pub enum Error {
    /// No recognized configuration file exists in the directory.
    #[error("unable to find one of 'kustomization.yaml', 'kustomization.yml' or 'Kustomization' in directory '{dir}'")]
    NotFound { dir: String },

    /// More than one recognized configuration file exists in the directory.
    #[error("Found multiple kustomization files under: {dir}\n{}", files.join(", "))]
    AmbiguousConfig { dir: String, files: Vec<String> },

    /// The configuration file has no content besides whitespace and comments.
    #[error("{file} is empty")]
    EmptyConfig { file: String },

    /// The configuration could not be parsed.
    ///
    /// Includes the underlying structural error and optionally a hint
    /// about how to fix it.
    #[error("Configuration parsing error in {file}: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        file: String,
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A resource with the same identity is already present in the collection.
    #[error("may not add resource with an already registered id: {id}")]
    IdentityConflict { id: String },

    /// Two generators or transformers were declared with the same identity.
    #[error("duplicate plugin declaration: may not add resource with an already registered id: {id}")]
    DuplicatePluginIdentity { id: String },

    /// Accumulating a base or component failed.
    #[error("accumulating base '{path}': {source}")]
    BaseResolution {
        path: String,
        #[source]
        source: Box<Error>,
    },

    /// A resource file could not be parsed or added to the collection.
    #[error("in resource file '{path}': {source}")]
    ResourceFile {
        path: String,
        #[source]
        source: Box<Error>,
    },

    /// A base refers back to a root that is already being accumulated.
    #[error("Cycle detected in base references: {cycle}")]
    CycleDetected { cycle: String },

    /// An external plugin exited unsuccessfully or produced bad output.
    #[error("plugin {plugin} failed: {message}{}", if stderr.is_empty() { String::new() } else { format!("\n  stderr: {}", stderr) })]
    PluginExecution {
        plugin: String,
        message: String,
        stderr: String,
    },

    /// An external plugin did not finish within the configured timeout.
    #[error("plugin {plugin} timed out after {timeout:?}")]
    PluginTimeout { plugin: String, timeout: Duration },

    /// A patch selected no resource, or selected several where one was required.
    #[error("patch target not found for {target}: {message}")]
    PatchTargetNotFound { target: String, message: String },

    /// A patch operation could not be applied to its target.
    #[error("Patch error on {target}: {message}")]
    Patch { target: String, message: String },

    /// A document could not be turned into a resource.
    #[error("Invalid resource: {message}")]
    InvalidResource { message: String },

    /// Generator arguments were malformed.
    #[error("Generator error: {generator} - {message}")]
    Generator { generator: String, message: String },

    /// A path or URL could not be loaded.
    #[error("Loader error for {path}: {message}")]
    Loader { path: PathBuf, message: String },

    /// An error occurred while cloning a remote base.
    #[error("Git clone error for {url}@{r#ref}: {message}")]
    GitClone {
        url: String,
        r#ref: String,
        message: String,
    },

    /// An error occurred while executing a Git command.
    #[error("Git command failed for {url}: {command} - {stderr}")]
    GitCommand {
        command: String,
        url: String,
        stderr: String,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// Wraps an error raised while accumulating the base at `path`.
    pub fn in_base(path: impl Into<String>, source: Error) -> Self {
        Error::BaseResolution {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Wraps an error raised while reading the resource file at `path`.
    pub fn in_file(path: impl Into<String>, source: Error) -> Self {
        Error::ResourceFile {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Returns the innermost error below any `BaseResolution` and
    /// `ResourceFile` wrappers.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::BaseResolution { source, .. } | Error::ResourceFile { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
