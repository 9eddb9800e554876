//! `suggest`: which plugins should auto-load for a project.

use std::path::Path;

use {
    anyhow::Context,
    marketplace_plugins::{ExitStatus, ManifestStore, ProjectContext, Suggestion, explain},
    tracing::info,
};

pub fn suggest(project: &Path, manifest_path: &Path, json: bool) -> anyhow::Result<ExitStatus> {
    print!("{}", suggestions_report(project, manifest_path, json)?);
    Ok(ExitStatus::Success)
}

/// Evaluate the manifest's auto-load triggers against `project` and render
/// the result.
fn suggestions_report(project: &Path, manifest_path: &Path, json: bool) -> anyhow::Result<String> {
    let manifest = ManifestStore::new(manifest_path)
        .load()?
        .with_context(|| {
            format!(
                "no manifest at {}; run `marketplace build-manifest` first",
                manifest_path.display()
            )
        })?;

    let context = ProjectContext::from_project_dir(project, &manifest)?;
    let suggestions = explain(&manifest, &context);
    info!(
        project = %project.display(),
        dependencies = context.dependencies.len(),
        suggestions = suggestions.len(),
        "evaluated auto-load triggers"
    );

    render(project, &suggestions, json)
}

fn render(project: &Path, suggestions: &[Suggestion], json: bool) -> anyhow::Result<String> {
    if json {
        return Ok(format!("{}\n", serde_json::to_string_pretty(suggestions)?));
    }
    if suggestions.is_empty() {
        return Ok(format!("No plugins match {}\n", project.display()));
    }

    let mut out = String::new();
    for suggestion in suggestions {
        let reasons = suggestion
            .triggers
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("{} ({reasons})\n", suggestion.plugin));
    }
    Ok(out)
}
