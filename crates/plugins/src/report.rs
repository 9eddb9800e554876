//! Human and machine readable run reports, and the process exit status.

use std::{fmt::Write, path::Path};

use {marketplace_common::paths::relative_display, serde::Serialize};

use crate::{
    manifest::SaveOutcome,
    pipeline::{BuildRun, PluginOutcome, ValidationRun},
    validate::Violation,
};

/// Process exit status of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success = 0,
    /// At least one plugin failed to load or validate.
    ValidationFailed = 1,
    /// The manifest could not be assembled or written.
    AggregationFailed = 2,
}

impl ExitStatus {
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl ValidationRun {
    #[must_use]
    pub fn exit_status(&self) -> ExitStatus {
        if self.all_passed() {
            ExitStatus::Success
        } else {
            ExitStatus::ValidationFailed
        }
    }
}

impl BuildRun {
    #[must_use]
    pub fn exit_status(&self) -> ExitStatus {
        match &self.manifest {
            Err(_) => ExitStatus::AggregationFailed,
            Ok(_) => self.validation.exit_status(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

// ── JSON document ───────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    Pass,
    Fail,
    Skip,
}

#[derive(Serialize)]
struct ErrorReport {
    kind: &'static str,
    message: String,
}

#[derive(Serialize)]
struct PluginReport<'a> {
    path: String,
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "no_violations")]
    violations: &'a [Violation],
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorReport>,
}

fn no_violations(violations: &&[Violation]) -> bool {
    violations.is_empty()
}

#[derive(Serialize)]
struct Summary {
    total: usize,
    passed: usize,
    failed: usize,
    skipped: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ManifestReport {
    path: String,
    written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    plugins: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorReport>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Document<'a> {
    plugins: Vec<PluginReport<'a>>,
    summary: Summary,
    #[serde(skip_serializing_if = "Option::is_none")]
    manifest: Option<ManifestReport>,
    exit_code: u8,
}

fn plugin_reports<'a>(run: &'a ValidationRun, root: &Path) -> Vec<PluginReport<'a>> {
    run.outcomes
        .iter()
        .map(|outcome| match outcome {
            PluginOutcome::LoadFailed { root: dir, error } => PluginReport {
                path: relative_display(root, dir),
                status: Status::Skip,
                name: None,
                violations: &[],
                error: Some(ErrorReport {
                    kind: error.kind(),
                    message: error.to_string(),
                }),
            },
            PluginOutcome::Validated { plugin, result } => PluginReport {
                path: relative_display(root, &plugin.root),
                status: if result.ok {
                    Status::Pass
                } else {
                    Status::Fail
                },
                name: Some(plugin.name()),
                violations: &result.violations,
                error: None,
            },
        })
        .collect()
}

fn summary(run: &ValidationRun) -> Summary {
    Summary {
        total: run.outcomes.len(),
        passed: run.passed(),
        failed: run.failed(),
        skipped: run.skipped(),
    }
}

fn manifest_report(run: &BuildRun, root: &Path) -> ManifestReport {
    match &run.manifest {
        Ok(built) => ManifestReport {
            path: relative_display(root, &built.path),
            written: built.outcome == SaveOutcome::Written,
            plugins: Some(built.manifest.plugins.len()),
            error: None,
        },
        Err(e) => ManifestReport {
            path: String::new(),
            written: false,
            plugins: None,
            error: Some(ErrorReport {
                kind: e.kind(),
                message: e.to_string(),
            }),
        },
    }
}

// ── Rendering ───────────────────────────────────────────────────────────────

/// Render a `validate-plugins` report. Paths are shown relative to `root`.
pub fn render_validation(run: &ValidationRun, root: &Path, format: ReportFormat) -> String {
    match format {
        ReportFormat::Text => {
            let mut out = String::new();
            write_outcomes(&mut out, run, root);
            out
        },
        ReportFormat::Json => to_json(&Document {
            plugins: plugin_reports(run, root),
            summary: summary(run),
            manifest: None,
            exit_code: run.exit_status().code(),
        }),
    }
}

/// Render a `build-manifest` report.
pub fn render_build(run: &BuildRun, root: &Path, format: ReportFormat) -> String {
    match format {
        ReportFormat::Text => {
            let mut out = String::new();
            write_outcomes(&mut out, &run.validation, root);
            let _ = match &run.manifest {
                Ok(built) => {
                    let path = relative_display(root, &built.path);
                    let count = built.manifest.plugins.len();
                    match built.outcome {
                        SaveOutcome::Written => {
                            writeln!(out, "manifest: wrote {path} ({count} plugins)")
                        },
                        SaveOutcome::Unchanged => {
                            writeln!(out, "manifest: {path} unchanged ({count} plugins)")
                        },
                    }
                },
                Err(e) => writeln!(out, "manifest: not written: {e}"),
            };
            out
        },
        ReportFormat::Json => to_json(&Document {
            plugins: plugin_reports(&run.validation, root),
            summary: summary(&run.validation),
            manifest: Some(manifest_report(run, root)),
            exit_code: run.exit_status().code(),
        }),
    }
}

fn write_outcomes(out: &mut String, run: &ValidationRun, root: &Path) {
    for outcome in &run.outcomes {
        let _ = match outcome {
            PluginOutcome::LoadFailed { root: dir, error } => writeln!(
                out,
                "SKIP {} [{}] {error}",
                relative_display(root, dir),
                error.kind()
            ),
            PluginOutcome::Validated { plugin, result } => {
                let status = if result.ok { "PASS" } else { "FAIL" };
                let line = writeln!(
                    out,
                    "{status} {} ({})",
                    plugin.name(),
                    relative_display(root, &plugin.root)
                );
                for v in &result.violations {
                    let _ = writeln!(out, "  - {} [{}] {}", v.path, v.rule, v.message);
                }
                line
            },
        };
    }
    let s = summary(run);
    let _ = writeln!(
        out,
        "{} plugins: {} passed, {} failed, {} skipped",
        s.total, s.passed, s.failed, s.skipped
    );
}

fn to_json<T: Serialize>(doc: &T) -> String {
    match serde_json::to_string_pretty(doc) {
        Ok(mut s) => {
            s.push('\n');
            s
        },
        Err(e) => format!("{{\"error\": \"{e}\"}}\n"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            error::{AggregationError, LoadError},
            manifest::RegistryManifest,
            pipeline::BuiltManifest,
            types::{LoadedPlugin, PLUGIN_MANIFEST},
            validate::{Rule, ValidationResult},
        },
        std::path::PathBuf,
    };

    fn loaded(name: &str, dir: &str) -> LoadedPlugin {
        LoadedPlugin {
            root: PathBuf::from("/repo/plugins").join(dir),
            descriptor: serde_json::from_value(serde_json::json!({
                "name": name, "version": "1.0.0", "category": "stack"
            }))
            .unwrap(),
        }
    }

    fn sample_run() -> ValidationRun {
        ValidationRun {
            outcomes: vec![
                PluginOutcome::Validated {
                    plugin: loaded("aai-core", "core"),
                    result: ValidationResult {
                        plugin_name: "aai-core".into(),
                        ok: true,
                        violations: vec![],
                    },
                },
                PluginOutcome::Validated {
                    plugin: loaded("aai-stack-react", "react"),
                    result: ValidationResult {
                        plugin_name: "aai-stack-react".into(),
                        ok: false,
                        violations: vec![Violation {
                            path: "skills/hooks/SKILL.md".into(),
                            rule: Rule::MissingFrontmatter,
                            message: "skill: no YAML frontmatter block".into(),
                        }],
                    },
                },
                PluginOutcome::LoadFailed {
                    root: PathBuf::from("/repo/plugins/stray"),
                    error: LoadError::MissingManifest {
                        path: PathBuf::from("/repo/plugins/stray").join(PLUGIN_MANIFEST),
                    },
                },
            ],
        }
    }

    #[test]
    fn text_report_lists_every_plugin() {
        let text = render_validation(&sample_run(), Path::new("/repo"), ReportFormat::Text);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "PASS aai-core (plugins/core)");
        assert_eq!(lines[1], "FAIL aai-stack-react (plugins/react)");
        assert_eq!(
            lines[2],
            "  - skills/hooks/SKILL.md [MissingFrontmatter] skill: no YAML frontmatter block"
        );
        assert!(lines[3].starts_with("SKIP plugins/stray [MissingManifest]"));
        assert_eq!(lines[4], "3 plugins: 1 passed, 1 failed, 1 skipped");
    }

    #[test]
    fn json_report_shape() {
        let json = render_validation(&sample_run(), Path::new("/repo"), ReportFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["exitCode"], 1);
        assert_eq!(value["summary"]["skipped"], 1);
        assert_eq!(value["plugins"][0]["status"], "pass");
        assert!(value["plugins"][0].get("violations").is_none());
        assert_eq!(value["plugins"][1]["violations"][0]["rule"], "MissingFrontmatter");
        assert_eq!(value["plugins"][2]["error"]["kind"], "MissingManifest");
        assert!(value.get("manifest").is_none());
    }

    #[test]
    fn exit_status_codes() {
        assert_eq!(sample_run().exit_status(), ExitStatus::ValidationFailed);
        assert_eq!(ValidationRun::default().exit_status(), ExitStatus::Success);

        let failed = BuildRun {
            validation: ValidationRun::default(),
            manifest: Err(AggregationError::DuplicateName {
                name: "aai-core".into(),
                first: "a".into(),
                second: "b".into(),
            }),
        };
        assert_eq!(failed.exit_status().code(), 2);
        let text = render_build(&failed, Path::new("/repo"), ReportFormat::Text);
        assert!(text.contains("manifest: not written: duplicate plugin name `aai-core`"));
    }

    #[test]
    fn build_report_names_manifest() {
        let run = BuildRun {
            validation: ValidationRun::default(),
            manifest: Ok(BuiltManifest {
                path: PathBuf::from("/repo/plugin-manifest.json"),
                manifest: RegistryManifest {
                    version: "1.0.0".into(),
                    generated_at: "2026-01-01T00:00:00Z".into(),
                    plugins: vec![],
                },
                outcome: SaveOutcome::Unchanged,
            }),
        };
        assert_eq!(run.exit_status(), ExitStatus::Success);
        let text = render_build(&run, Path::new("/repo"), ReportFormat::Text);
        assert!(text.ends_with("manifest: plugin-manifest.json unchanged (0 plugins)\n"));

        let value: serde_json::Value =
            serde_json::from_str(&render_build(&run, Path::new("/repo"), ReportFormat::Json)).unwrap();
        assert_eq!(value["manifest"]["written"], false);
        assert_eq!(value["manifest"]["plugins"], 0);
    }
}
