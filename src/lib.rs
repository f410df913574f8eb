//! # Kustomize Library
//!
//! This library builds customized collections of Kubernetes-style manifests
//! from a kustomization root: a directory whose `kustomization.yaml` names
//! resources, bases, components, generators and transformers. It is used by
//! the `kustomize` command-line tool but can be embedded in any program that
//! needs to render such roots.
//!
//! ## Quick Example
//!
//! ```
//! use kustomize::filesystem::{FileSystem, MemoryFS};
//! use kustomize::loader::FileLoader;
//! use kustomize::options::BuildOptions;
//! use kustomize::target::KustTarget;
//! use std::sync::Arc;
//!
//! // Stage a root in memory
//! let mut fs = MemoryFS::new();
//! fs.add_file_string(
//!     "/app/kustomization.yaml",
//!     "namespace: prod\ncommonLabels:\n  team: web\nresources:\n- deployment.yaml\n",
//! )
//! .unwrap();
//! fs.add_file_string(
//!     "/app/deployment.yaml",
//!     "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n",
//! )
//! .unwrap();
//! let fs: Arc<dyn FileSystem> = Arc::new(fs);
//!
//! // Build it
//! let loader = FileLoader::new(fs, "/app").unwrap();
//! let mut map = KustTarget::new(loader, BuildOptions::default())
//!     .make_customized_res_map()
//!     .unwrap();
//! map.remove_build_annotations();
//!
//! let deployment = map.iter().next().unwrap();
//! assert_eq!(deployment.namespace(), "prod");
//! assert_eq!(deployment.labels().get("team").map(String::as_str), Some("web"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Resources (`resource`, `resmap`)**: A manifest is identified by its
//!   group, version, kind, name and namespace. A `ResMap` keeps resources in
//!   insertion order and refuses duplicate identities.
//! - **Configuration (`config`, `tconfig`)**: The kustomization file schema,
//!   and the field-path rules that decide where names, namespaces, labels
//!   and annotations are written.
//! - **Loading (`loader`, `filesystem`, `repository`, `git`)**: Files are
//!   read relative to a root, through a real or in-memory filesystem; remote
//!   bases are cloned into a cache.
//! - **Plugins (`plugins`)**: Generators and transformers, built-in or run
//!   as external processes.
//! - **Pipeline (`phases`, `target`)**: Recursive accumulation of bases,
//!   transformation in a fixed order, and final hashing of generated names.
//!
//! ## Execution Flow
//!
//! [`target::KustTarget`] drives the pipeline:
//!
//! 1.  **Accumulation**: Load resources and bases (each base built at its own
//!     level), apply components, run generators, resolve field-path rules.
//! 2.  **Transformation**: Namespace, prefix, suffix, labels, annotations,
//!     patches, then declared transformers.
//! 3.  **Finalization**: Append content hashes to generated names and
//!     rewrite references to them.

pub mod config;
pub mod defaults;
pub mod error;
pub mod filesystem;
pub mod git;
pub mod loader;
pub mod merge;
pub mod options;
pub mod output;
pub mod path;
pub mod phases;
pub mod plugins;
pub mod repository;
pub mod resmap;
pub mod resource;
pub mod suggestions;
pub mod target;
pub mod tconfig;

#[cfg(test)]
mod proptest_invariants;
