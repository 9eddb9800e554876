//! Registry manifest aggregation and persistence.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use {
    chrono::{SecondsFormat, Utc},
    marketplace_common::IoPathExt,
    serde::{Deserialize, Serialize},
    tracing::{debug, info},
};

use crate::{
    error::{AggregationError, Context, Result},
    types::{LoadedPlugin, PluginDescriptor},
    validate::ValidationResult,
};

/// The aggregated `plugin-manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryManifest {
    /// Marketplace-level version, not any single plugin's.
    pub version: String,
    /// RFC 3339 UTC timestamp of the build that produced this content.
    pub generated_at: String,
    /// Descriptors of every plugin that passed validation, sorted by name.
    pub plugins: Vec<PluginDescriptor>,
}

impl RegistryManifest {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PluginDescriptor> {
        self.plugins.iter().find(|p| p.name == name)
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name.as_str()).collect()
    }
}

/// Current time formatted for `generatedAt`.
#[must_use]
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Merge the descriptors of passing plugins into a manifest.
///
/// Plugins whose result is not `ok` are skipped. Two passing plugins with
/// the same name abort the whole aggregation.
pub fn aggregate<'a>(
    entries: impl IntoIterator<Item = (&'a LoadedPlugin, &'a ValidationResult)>,
    version: impl Into<String>,
    generated_at: impl Into<String>,
) -> std::result::Result<RegistryManifest, AggregationError> {
    let mut by_name: BTreeMap<&str, &LoadedPlugin> = BTreeMap::new();
    for (plugin, result) in entries {
        if !result.ok {
            debug!(plugin = %plugin.name(), "skipping plugin that failed validation");
            continue;
        }
        if let Some(first) = by_name.insert(plugin.name(), plugin) {
            return Err(AggregationError::DuplicateName {
                name: plugin.name().to_string(),
                first: first.root.clone(),
                second: plugin.root.clone(),
            });
        }
    }

    Ok(RegistryManifest {
        version: version.into(),
        generated_at: generated_at.into(),
        plugins: by_name.into_values().map(|p| p.descriptor.clone()).collect(),
    })
}

/// Whether [`ManifestStore::save`] touched the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Written,
    Unchanged,
}

/// Manifest storage with atomic writes.
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the manifest back, `None` if it does not exist yet.
    pub fn load(&self) -> Result<Option<RegistryManifest>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&self.path).at_path(&self.path)?;
        let manifest = serde_json::from_str(&data)
            .with_context(|| format!("invalid manifest {}", self.path.display()))?;
        Ok(Some(manifest))
    }

    /// Save `manifest` via temp file + rename.
    ///
    /// When the file on disk already holds the same version and plugin list,
    /// its `generatedAt` is carried over so unchanged input produces a
    /// byte-identical file, and the write is skipped.
    pub fn save(
        &self,
        manifest: &mut RegistryManifest,
    ) -> std::result::Result<SaveOutcome, AggregationError> {
        let existing = std::fs::read_to_string(&self.path).ok();
        if let Some(previous) = existing
            .as_deref()
            .and_then(|raw| serde_json::from_str::<RegistryManifest>(raw).ok())
            && previous.version == manifest.version
            && previous.plugins == manifest.plugins
        {
            manifest.generated_at = previous.generated_at;
        }

        let mut data = serde_json::to_string_pretty(manifest)?;
        data.push('\n');
        if existing.as_deref() == Some(data.as_str()) {
            debug!(path = %self.path.display(), "manifest unchanged");
            return Ok(SaveOutcome::Unchanged);
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| AggregationError::write(parent, e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &data).map_err(|e| AggregationError::write(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(AggregationError::write(&self.path, e));
        }
        info!(
            path = %self.path.display(),
            plugins = manifest.plugins.len(),
            "wrote plugin manifest"
        );
        Ok(SaveOutcome::Written)
    }
}
