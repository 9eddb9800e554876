//! Reads one plugin folder into a [`LoadedPlugin`].

use std::path::{Path, PathBuf};

use {marketplace_common::paths::relative_display, tracing::debug};

use crate::{
    error::LoadError,
    types::{Components, LoadedPlugin, PLUGIN_MANIFEST, PluginDescriptor},
};

/// Fields `plugin.json` must carry for the plugin to load at all.
const REQUIRED_FIELDS: &[&str] = &["name", "version", "category"];

/// Load the descriptor of the plugin rooted at `root`.
///
/// Pure read: nothing on disk is touched. Cross-plugin checks such as name
/// uniqueness are left to the aggregator.
pub fn load_plugin(root: &Path) -> Result<LoadedPlugin, LoadError> {
    let manifest_path = root.join(PLUGIN_MANIFEST);
    if !manifest_path.is_file() {
        return Err(LoadError::MissingManifest {
            path: manifest_path,
        });
    }

    let raw = std::fs::read_to_string(&manifest_path).map_err(|source| LoadError::Unreadable {
        path: manifest_path.clone(),
        source,
    })?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| LoadError::malformed(&manifest_path, e))?;
    let Some(object) = value.as_object() else {
        return Err(LoadError::malformed(
            &manifest_path,
            "top-level value must be an object",
        ));
    };

    for &field in REQUIRED_FIELDS {
        let present = match object.get(field) {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        };
        if !present {
            return Err(LoadError::MissingRequiredField {
                path: manifest_path,
                field,
            });
        }
    }

    let mut descriptor: PluginDescriptor =
        serde_json::from_value(value).map_err(|e| LoadError::malformed(&manifest_path, e))?;
    descriptor.components = discover_components(root);
    debug!(plugin = %descriptor.name, root = %root.display(), "loaded plugin descriptor");

    Ok(LoadedPlugin {
        root: root.to_path_buf(),
        descriptor,
    })
}

/// Collect the artifacts present under a plugin root.
pub fn discover_components(root: &Path) -> Components {
    let rel = |p: &Path| relative_display(root, p);

    let agents = sorted_files(&root.join("agents"), "md")
        .iter()
        .map(|p| rel(p.as_path()))
        .collect();
    let commands = sorted_files(&root.join("commands"), "md")
        .iter()
        .map(|p| rel(p.as_path()))
        .collect();
    let skills = sorted_dirs(&root.join("skills"))
        .into_iter()
        .map(|dir| dir.join("SKILL.md"))
        .filter(|p| p.is_file())
        .map(|p| rel(p.as_path()))
        .collect();

    let hooks = root.join("hooks").join("hooks.json");
    let mcp = root.join(".mcp.json");

    Components {
        agents,
        skills,
        commands,
        hooks: hooks.is_file().then(|| rel(hooks.as_path())),
        mcp: mcp.is_file().then(|| rel(mcp.as_path())),
    }
}

/// Files directly inside `dir` with extension `ext`, sorted by path.
pub(crate) fn sorted_files(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some(ext))
        .collect();
    files.sort();
    files
}

/// Non-hidden subdirectories of `dir`, sorted by path.
pub(crate) fn sorted_dirs(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !n.starts_with('.'))
        })
        .collect();
    dirs.sort();
    dirs
}
