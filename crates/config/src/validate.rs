//! Config file validation.
//!
//! Detects unknown or misspelled keys and values that would make the
//! pipeline misbehave, without failing the load itself.

use std::path::{Path, PathBuf};

use crate::{loader::load_config_value, schema::MarketplaceConfig};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single config diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// "syntax", "unknown-field", "type-error" or "semantic".
    pub category: &'static str,
    /// Dotted key path, e.g. "validation.scan_ignore".
    pub path: String,
    pub message: String,
}

/// Outcome of validating one config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigValidation {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ConfigValidation {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

const TOP_LEVEL_KEYS: &[&str] = &[
    "plugins_dir",
    "manifest_path",
    "marketplace_version",
    "jobs",
    "validation",
];

const VALIDATION_KEYS: &[&str] = &["check_hardcoded_paths", "scan_ignore", "text_extensions"];

/// Levenshtein edit distance.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

/// Closest candidate within `max_distance` edits.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (*c, levenshtein(needle, c)))
        .filter(|(_, d)| *d > 0 && *d <= max_distance)
        .min_by_key(|(_, d)| *d)
        .map(|(c, _)| c)
}

/// Validate the config file at `path`.
#[must_use]
pub fn validate_config_file(path: &Path) -> ConfigValidation {
    let mut result = match load_config_value(path) {
        Ok(value) => validate_value(&value),
        Err(e) => ConfigValidation {
            diagnostics: vec![Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: e.to_string(),
            }],
            config_path: None,
        },
    };
    result.config_path = Some(path.to_path_buf());
    result
}

/// Validate an already-parsed config value.
#[must_use]
pub fn validate_value(value: &serde_json::Value) -> ConfigValidation {
    let mut diagnostics = Vec::new();

    let Some(table) = value.as_object() else {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: "config root must be a table".into(),
        });
        return ConfigValidation {
            diagnostics,
            config_path: None,
        };
    };

    check_keys(table, TOP_LEVEL_KEYS, "", &mut diagnostics);
    if let Some(validation) = table.get("validation").and_then(|v| v.as_object()) {
        check_keys(validation, VALIDATION_KEYS, "validation", &mut diagnostics);
    }

    match serde_json::from_value::<MarketplaceConfig>(value.clone()) {
        Ok(config) => check_semantics(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: format!("type error: {e}"),
        }),
    }

    ConfigValidation {
        diagnostics,
        config_path: None,
    }
}

fn check_keys(
    table: &serde_json::Map<String, serde_json::Value>,
    known: &[&str],
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for key in table.keys() {
        if known.contains(&key.as_str()) {
            continue;
        }
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        let message = match suggest(key, known, 3) {
            Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
            None => "unknown field".to_string(),
        };
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "unknown-field",
            path,
            message,
        });
    }
}

fn check_semantics(config: &MarketplaceConfig, diagnostics: &mut Vec<Diagnostic>) {
    if config.jobs == Some(0) {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "semantic",
            path: "jobs".into(),
            message: "jobs = 0 is ignored; the CPU count is used instead".into(),
        });
    }

    let parts: Vec<&str> = config.marketplace_version.split('.').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.parse::<u64>().is_err()) {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "semantic",
            path: "marketplace_version".into(),
            message: format!(
                "\"{}\" is not a MAJOR.MINOR.PATCH version",
                config.marketplace_version
            ),
        });
    }

    if config.plugins_dir.is_absolute() {
        diagnostics.push(Diagnostic {
            severity: Severity::Info,
            category: "semantic",
            path: "plugins_dir".into(),
            message: "absolute plugins_dir ignores the --root argument".into(),
        });
    }

    if !config.validation.check_hardcoded_paths && !config.validation.scan_ignore.is_empty() {
        diagnostics.push(Diagnostic {
            severity: Severity::Info,
            category: "semantic",
            path: "validation.scan_ignore".into(),
            message: "scan_ignore has no effect while check_hardcoded_paths is false".into(),
        });
    }
}
