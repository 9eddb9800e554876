use std::path::PathBuf;

use {async_trait::async_trait, marketplace_common::IoPathExt, tracing::debug};

use crate::{
    error::{Error, Result},
    loader::sorted_dirs,
};

/// Finds plugin folders.
#[async_trait]
pub trait PluginDiscoverer: Send + Sync {
    /// Return candidate plugin roots, sorted by path.
    async fn discover(&self) -> Result<Vec<PathBuf>>;
}

/// Treats every non-hidden subdirectory of `plugins_dir` as a plugin root.
///
/// Folders without a manifest are still returned so the loader can report
/// them as `MissingManifest`.
pub struct FsPluginDiscoverer {
    plugins_dir: PathBuf,
}

impl FsPluginDiscoverer {
    pub fn new(plugins_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugins_dir: plugins_dir.into(),
        }
    }
}

#[async_trait]
impl PluginDiscoverer for FsPluginDiscoverer {
    async fn discover(&self) -> Result<Vec<PathBuf>> {
        let metadata = std::fs::metadata(&self.plugins_dir).at_path(&self.plugins_dir)?;
        if !metadata.is_dir() {
            return Err(Error::message(format!(
                "{} is not a directory",
                self.plugins_dir.display()
            )));
        }
        let roots = sorted_dirs(&self.plugins_dir);
        debug!(dir = %self.plugins_dir.display(), count = roots.len(), "discovered plugin folders");
        Ok(roots)
    }
}
