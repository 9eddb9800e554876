//! Config schema for the plugin validation and manifest pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
///
/// Relative paths are resolved against the repository root passed on the
/// command line (or the current directory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    /// Directory holding one folder per plugin.
    pub plugins_dir: PathBuf,
    /// Where `build-manifest` writes the aggregated registry.
    pub manifest_path: PathBuf,
    /// Marketplace-level version stamped into the manifest.
    pub marketplace_version: String,
    /// Maximum number of plugins validated concurrently.
    /// `None` means the number of available CPUs.
    pub jobs: Option<usize>,
    pub validation: ValidationConfig,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            plugins_dir: PathBuf::from("plugins"),
            manifest_path: PathBuf::from("plugin-manifest.json"),
            marketplace_version: "1.0.0".into(),
            jobs: None,
            validation: ValidationConfig::default(),
        }
    }
}

impl MarketplaceConfig {
    /// Effective worker count, never zero.
    #[must_use]
    pub fn effective_jobs(&self) -> usize {
        self.jobs
            .filter(|j| *j > 0)
            .or_else(|| std::thread::available_parallelism().ok().map(usize::from))
            .unwrap_or(1)
    }
}

/// Knobs for the structural validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Scan tracked files for absolute filesystem paths.
    pub check_hardcoded_paths: bool,
    /// Glob patterns (relative to the plugin root) excluded from the path scan.
    pub scan_ignore: Vec<String>,
    /// File extensions treated as text by the path scan.
    pub text_extensions: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            check_hardcoded_paths: true,
            scan_ignore: Vec::new(),
            text_extensions: ["md", "json", "yaml", "yml", "toml", "sh", "txt"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_repo_layout() {
        let cfg = MarketplaceConfig::default();
        assert_eq!(cfg.plugins_dir, PathBuf::from("plugins"));
        assert_eq!(cfg.manifest_path, PathBuf::from("plugin-manifest.json"));
        assert!(cfg.validation.check_hardcoded_paths);
        assert!(cfg.validation.text_extensions.iter().any(|e| e == "md"));
    }

    #[test]
    fn zero_jobs_falls_back_to_cpu_count() {
        let cfg = MarketplaceConfig {
            jobs: Some(0),
            ..Default::default()
        };
        assert!(cfg.effective_jobs() >= 1);
    }

    #[test]
    fn explicit_jobs_respected() {
        let cfg = MarketplaceConfig {
            jobs: Some(3),
            ..Default::default()
        };
        assert_eq!(cfg.effective_jobs(), 3);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: MarketplaceConfig = toml::from_str("marketplace_version = \"2.1.0\"").unwrap();
        assert_eq!(cfg.marketplace_version, "2.1.0");
        assert_eq!(cfg.plugins_dir, PathBuf::from("plugins"));
    }
}
