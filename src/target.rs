//! Building one kustomization root
//!
//! [`KustTarget`] is the entry point of the library. It owns the loader for
//! the top-level root and the caller's [`BuildOptions`], and drives the
//! stages in [`crate::phases`]:
//!
//! - [`KustTarget::load`] reads and validates the root's configuration only.
//! - [`KustTarget::accumulate_target`] gathers resources and generator
//!   output; the root's own transformers have not run yet.
//! - [`KustTarget::make_customized_res_map`] runs the whole pipeline.
//!
//! ```
//! use kustomize::filesystem::{FileSystem, MemoryFS};
//! use kustomize::loader::FileLoader;
//! use kustomize::options::BuildOptions;
//! use kustomize::target::KustTarget;
//! use std::sync::Arc;
//!
//! let mut fs = MemoryFS::new();
//! fs.add_file_string("/app/kustomization.yaml", "namePrefix: dev-\nresources:\n- cm.yaml\n").unwrap();
//! fs.add_file_string("/app/cm.yaml", "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: settings\n").unwrap();
//! let fs: Arc<dyn FileSystem> = Arc::new(fs);
//!
//! let loader = FileLoader::new(fs, "/app").unwrap();
//! let mut target = KustTarget::new(loader, BuildOptions::default());
//! let map = target.make_customized_res_map().unwrap();
//! assert_eq!(map.iter().next().unwrap().name(), "dev-settings");
//! ```

use crate::config::{self, Kustomization};
use crate::error::Result;
use crate::filesystem::{DiskFS, FileSystem};
use crate::loader::FileLoader;
use crate::options::BuildOptions;
use crate::phases::{accumulate, finalize, transform, ResAccumulator};
use crate::plugins::PluginLoader;
use crate::repository::RepositoryManager;
use crate::resmap::ResMap;
use log::{debug, info};
use std::path::Path;
use std::sync::Arc;

/// A kustomization root ready to be built
#[derive(Debug)]
pub struct KustTarget {
    loader: FileLoader,
    options: BuildOptions,
    kustomization: Option<Kustomization>,
    file_name: Option<String>,
}

impl KustTarget {
    pub fn new(loader: FileLoader, options: BuildOptions) -> Self {
        Self {
            loader,
            options,
            kustomization: None,
            file_name: None,
        }
    }

    /// A target for a directory on the host filesystem.
    ///
    /// Remote bases are enabled when the options name a cache root.
    pub fn from_dir(dir: impl AsRef<Path>, options: BuildOptions) -> Result<Self> {
        let fs: Arc<dyn FileSystem> = Arc::new(DiskFS);
        let mut loader = FileLoader::new(fs, dir)?;
        if let Some(cache_root) = &options.cache_root {
            loader = loader.with_repositories(Arc::new(RepositoryManager::new(cache_root.clone())));
        }
        Ok(Self::new(loader, options))
    }

    pub fn loader(&self) -> &FileLoader {
        &self.loader
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Read and parse the root's kustomization file.
    pub fn load(&mut self) -> Result<&Kustomization> {
        if self.kustomization.is_none() {
            let (kust, file) = config::load(&self.loader)?;
            debug!("loaded {} from {}", file, self.loader.root().display());
            self.kustomization = Some(kust);
            self.file_name = Some(file);
        }
        self.kustomization()
    }

    fn kustomization(&self) -> Result<&Kustomization> {
        match &self.kustomization {
            Some(kust) => Ok(kust),
            None => Err(crate::error::Error::NotFound {
                dir: self.loader.root().display().to_string(),
            }),
        }
    }

    /// Name of the kustomization file, once loaded.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Accumulate the whole base graph below this root.
    ///
    /// Bases come back fully transformed; this root's own transformers, the
    /// hash suffixes and the name-reference fix-up have not run. The root's
    /// declared transformers are still loaded, so duplicate transformer
    /// identities fail here as they would in a full build.
    pub fn accumulate_target(&mut self) -> Result<ResAccumulator> {
        self.load()?;
        let kust = self.kustomization()?;
        let mut acc = ResAccumulator::new();
        accumulate::execute(&mut acc, &self.loader, &self.options, kust)?;
        PluginLoader::new(&self.loader, &self.options, kust.generator_options.clone())
            .load_configs(&kust.transformers)?;
        Ok(acc)
    }

    /// Run the full pipeline and return the customized collection.
    ///
    /// Build annotations are kept; see [`build`] for output-ready resources.
    pub fn make_customized_res_map(&mut self) -> Result<ResMap> {
        let mut acc = self.accumulate_target()?;
        let kust = self.kustomization()?;
        transform::execute(&mut acc, &self.loader, &self.options, kust)?;
        finalize::execute(&mut acc)?;
        info!(
            "built {} resources from {}",
            acc.resmap.len(),
            self.loader.root().display()
        );
        Ok(acc.resmap)
    }
}

/// Build the root in `dir` and strip the build annotations.
pub fn build(dir: impl AsRef<Path>, options: BuildOptions) -> Result<ResMap> {
    let mut target = KustTarget::from_dir(dir, options)?;
    let mut map = target.make_customized_res_map()?;
    map.remove_build_annotations();
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::filesystem::MemoryFS;

    fn target(files: &[(&str, &str)]) -> KustTarget {
        let mut fs = MemoryFS::new();
        fs.add_dir("/app");
        for (path, content) in files {
            fs.add_file_string(path, content).unwrap();
        }
        let fs: Arc<dyn FileSystem> = Arc::new(fs);
        KustTarget::new(FileLoader::new(fs, "/app").unwrap(), BuildOptions::default())
    }

    #[test]
    fn test_load_only_reads_configuration() {
        let mut t = target(&[("/app/kustomization.yaml", "resources:\n- missing.yaml\n")]);
        let kust = t.load().unwrap();
        assert_eq!(kust.resources, vec!["missing.yaml".to_string()]);
        assert_eq!(t.file_name(), Some("kustomization.yaml"));
        assert!(t.accumulate_target().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let mut t = target(&[]);
        assert!(matches!(t.load().unwrap_err(), Error::NotFound { .. }));
    }

    #[test]
    fn test_accumulate_is_untransformed_at_top() {
        let mut t = target(&[
            ("/app/kustomization.yaml", "namePrefix: p-\nresources:\n- cm.yaml\n"),
            ("/app/cm.yaml", "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\n"),
        ]);
        let acc = t.accumulate_target().unwrap();
        assert_eq!(acc.resmap.iter().next().unwrap().name(), "cm");
        let map = t.make_customized_res_map().unwrap();
        assert_eq!(map.iter().next().unwrap().name(), "p-cm");
    }
}
