//! Plugin marketplace pipeline: loading, validation, auto-load matching and
//! manifest aggregation.
//!
//! Each plugin lives in its own folder with a `.claude-plugin/plugin.json`
//! descriptor plus optional `agents/`, `skills/`, `commands/`, `hooks/` and
//! `.mcp.json`. Passing plugins are merged into `plugin-manifest.json`, which
//! the matcher later reads to suggest plugins for a consuming project.

pub mod discover;
pub mod error;
pub mod frontmatter;
pub mod loader;
pub mod manifest;
pub mod matcher;
pub mod pipeline;
pub mod probe;
pub mod report;
pub mod scan;
pub mod types;
pub mod validate;

pub use {
    error::{AggregationError, Error, LoadError, Result},
    loader::load_plugin,
    manifest::{ManifestStore, RegistryManifest, SaveOutcome, aggregate},
    matcher::{ProjectContext, Suggestion, Trigger, explain, match_plugins},
    pipeline::{BuildRun, Pipeline, PluginOutcome, ValidationRun},
    report::{ExitStatus, ReportFormat, render_build, render_validation},
    types::{Category, LoadedPlugin, PLUGIN_MANIFEST, PluginDescriptor},
    validate::{Rule, ValidationResult, Validator, Violation},
};
