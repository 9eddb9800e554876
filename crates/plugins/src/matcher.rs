//! Auto-load trigger evaluation against a consuming project.
//!
//! A plugin is suggested when any dependency named in `autoLoad.when` is
//! declared by the project, or any of its file probes matches. Versions are
//! never compared.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use {
    marketplace_common::IoPathExt,
    serde::Serialize,
    tracing::debug,
};

use crate::{
    error::{Context, Result},
    manifest::RegistryManifest,
    probe::probe_files,
};

/// `package.json` sections whose keys count as project dependencies.
const DEPENDENCY_SECTIONS: &[&str] = &[
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
];

/// What is known about the consuming project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectContext {
    /// Dependency name to declared version range.
    pub dependencies: BTreeMap<String, String>,
    /// `autoLoad.when.files` patterns that matched at least one path.
    pub matched_files: BTreeSet<String>,
}

impl ProjectContext {
    #[must_use]
    pub fn new(dependencies: BTreeMap<String, String>, matched_files: BTreeSet<String>) -> Self {
        Self {
            dependencies,
            matched_files,
        }
    }

    /// Dependency map from a parsed `package.json`. Later sections win on
    /// conflicting versions; only names matter for matching.
    #[must_use]
    pub fn from_package_json(package: &serde_json::Value) -> Self {
        let mut dependencies = BTreeMap::new();
        for section in DEPENDENCY_SECTIONS {
            let Some(entries) = package.get(section).and_then(|v| v.as_object()) else {
                continue;
            };
            for (name, version) in entries {
                let version = version.as_str().unwrap_or_default().to_string();
                dependencies.insert(name.clone(), version);
            }
        }
        Self {
            dependencies,
            matched_files: BTreeSet::new(),
        }
    }

    /// Build the context for the project at `dir`, probing every file
    /// pattern that plugins in `manifest` declare.
    ///
    /// A missing `package.json` leaves the dependency map empty.
    pub fn from_project_dir(dir: &Path, manifest: &RegistryManifest) -> Result<Self> {
        let package_path = dir.join("package.json");
        let mut context = if package_path.is_file() {
            let raw = std::fs::read_to_string(&package_path).at_path(&package_path)?;
            let package: serde_json::Value = serde_json::from_str(&raw)
                .with_context(|| format!("invalid {}", package_path.display()))?;
            Self::from_package_json(&package)
        } else {
            debug!(dir = %dir.display(), "no package.json, matching on files only");
            Self::default()
        };

        let patterns = manifest
            .plugins
            .iter()
            .filter_map(|p| p.auto_load_when())
            .flat_map(|w| w.files.iter().map(String::as_str));
        context.matched_files = probe_files(dir, patterns);
        Ok(context)
    }
}

/// The condition that made a plugin match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Trigger {
    Dependency(String),
    File(String),
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dependency(name) => write!(f, "dependency `{name}`"),
            Self::File(pattern) => write!(f, "file `{pattern}`"),
        }
    }
}

/// A matched plugin and every trigger that fired for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub plugin: String,
    pub triggers: Vec<Trigger>,
}

/// Evaluate every plugin in `manifest`, keeping manifest order.
#[must_use]
pub fn explain(manifest: &RegistryManifest, context: &ProjectContext) -> Vec<Suggestion> {
    manifest
        .plugins
        .iter()
        .filter_map(|plugin| {
            let when = plugin.auto_load_when()?;
            let deps = when
                .dependencies
                .iter()
                .filter(|d| context.dependencies.contains_key(d.as_str()))
                .map(|d| Trigger::Dependency(d.clone()));
            let files = when
                .files
                .iter()
                .filter(|f| context.matched_files.contains(f.as_str()))
                .map(|f| Trigger::File(f.clone()));
            let triggers: Vec<Trigger> = deps.chain(files).collect();
            (!triggers.is_empty()).then(|| Suggestion {
                plugin: plugin.name.clone(),
                triggers,
            })
        })
        .collect()
}

/// Names of the plugins that should auto-load, in manifest order.
#[must_use]
pub fn match_plugins(manifest: &RegistryManifest, context: &ProjectContext) -> Vec<String> {
    explain(manifest, context)
        .into_iter()
        .map(|s| s.plugin)
        .collect()
}
