use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    schema::MarketplaceConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "marketplace.toml",
    "marketplace.yaml",
    "marketplace.yml",
    "marketplace.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<MarketplaceConfig> {
    let raw = read(path)?;
    parse_config(&raw, path)
}

/// Load a config file as a format-neutral JSON value.
pub fn load_config_value(path: &Path) -> Result<serde_json::Value> {
    let raw = read(path)?;
    parse_config_value(&raw, path)
}

/// Discover and load config for the repository at `root`.
///
/// Search order:
/// 1. `<root>/marketplace.{toml,yaml,yml,json}`
/// 2. `~/.config/marketplace/marketplace.{toml,yaml,yml,json}`
///
/// Returns `MarketplaceConfig::default()` if no config file is found or the
/// file fails to load.
pub fn discover_and_load(root: &Path) -> MarketplaceConfig {
    if let Some(path) = find_config_file(root) {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    MarketplaceConfig::default()
}

/// Find the first config file in standard locations.
pub fn find_config_file(root: &Path) -> Option<PathBuf> {
    let local = CONFIG_FILENAMES
        .iter()
        .map(|name| root.join(name))
        .find(|p| p.is_file());
    if local.is_some() {
        return local;
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// Returns the user-global config directory (`~/.config/marketplace/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "marketplace").map(|d| d.config_dir().to_path_buf())
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("toml")
}

fn parse_config(raw: &str, path: &Path) -> Result<MarketplaceConfig> {
    match extension(path) {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        ext => Err(Error::UnsupportedFormat(ext.to_string())),
    }
}

fn parse_config_value(raw: &str, path: &Path) -> Result<serde_json::Value> {
    match extension(path) {
        "toml" => {
            let v: toml::Value = toml::from_str(raw).map_err(|e| Error::parse(path, e))?;
            serde_json::to_value(v).map_err(|e| Error::parse(path, e))
        },
        "yaml" | "yml" => {
            let v: serde_yaml::Value =
                serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e))?;
            serde_json::to_value(v).map_err(|e| Error::parse(path, e))
        },
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        ext => Err(Error::UnsupportedFormat(ext.to_string())),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_toml_from_repo_root() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("marketplace.toml"),
            "plugins_dir = \"packages\"\njobs = 2\n\n[validation]\ncheck_hardcoded_paths = false\n",
        )
        .unwrap();

        let cfg = discover_and_load(tmp.path());
        assert_eq!(cfg.plugins_dir, PathBuf::from("packages"));
        assert_eq!(cfg.jobs, Some(2));
        assert!(!cfg.validation.check_hardcoded_paths);
    }

    #[test]
    fn loads_yaml_and_json() {
        let tmp = tempfile::tempdir().unwrap();
        let yaml = tmp.path().join("a.yaml");
        std::fs::write(&yaml, "marketplace_version: 3.0.0\n").unwrap();
        assert_eq!(load_config(&yaml).unwrap().marketplace_version, "3.0.0");

        let json = tmp.path().join("b.json");
        std::fs::write(&json, r#"{"manifest_path": "out/manifest.json"}"#).unwrap();
        assert_eq!(
            load_config(&json).unwrap().manifest_path,
            PathBuf::from("out/manifest.json")
        );
    }

    #[test]
    fn toml_preferred_over_yaml() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("marketplace.yaml"), "jobs: 9\n").unwrap();
        std::fs::write(tmp.path().join("marketplace.toml"), "jobs = 4\n").unwrap();
        assert_eq!(discover_and_load(tmp.path()).jobs, Some(4));
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("marketplace.toml"), "jobs = [unclosed").unwrap();
        assert_eq!(discover_and_load(tmp.path()), MarketplaceConfig::default());
    }

    #[test]
    fn unsupported_extension_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let ini = tmp.path().join("marketplace.ini");
        std::fs::write(&ini, "jobs=1").unwrap();
        assert!(matches!(
            load_config(&ini),
            Err(Error::UnsupportedFormat(ext)) if ext == "ini"
        ));
    }

    #[test]
    fn value_loader_normalizes_toml() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("marketplace.toml");
        std::fs::write(&path, "[validation]\nscan_ignore = [\"docs/**\"]\n").unwrap();
        let value = load_config_value(&path).unwrap();
        assert_eq!(value["validation"]["scan_ignore"][0], "docs/**");
    }
}
