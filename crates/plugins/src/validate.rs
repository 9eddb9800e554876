//! Structural validation of a loaded plugin folder.
//!
//! Every rule runs on every plugin; nothing short-circuits. Violations are
//! sorted so that manifest issues come first and the rest follow in lexical
//! path order, which keeps repeated reports byte-identical.

use std::{
    collections::BTreeSet,
    fmt,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use {
    marketplace_common::paths::relative_display,
    marketplace_config::ValidationConfig,
    regex::Regex,
    serde::Serialize,
    tracing::{debug, warn},
};

use crate::{
    frontmatter::{self, ArtifactKind, FrontmatterError},
    loader::{sorted_dirs, sorted_files},
    scan::{ScanOptions, scan_plugin},
    types::{LoadedPlugin, PLUGIN_MANIFEST, PluginDescriptor},
};

static PLUGIN_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^aai-[a-z]+(?:-[a-z0-9-]+)?$").ok());

static SEMVER: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(?:-[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*)?(?:\+[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*)?$",
    )
    .ok()
});

/// Structural rules a plugin folder is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Rule {
    NamingConventionViolation,
    InvalidVersion,
    UnresolvedPluginDependency,
    InvalidAutoLoadPattern,
    MissingFrontmatter,
    MalformedFrontmatter,
    DanglingCommandReference,
    InvalidHooksConfig,
    InvalidMcpConfig,
    HardcodedPath,
}

impl Rule {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NamingConventionViolation => "NamingConventionViolation",
            Self::InvalidVersion => "InvalidVersion",
            Self::UnresolvedPluginDependency => "UnresolvedPluginDependency",
            Self::InvalidAutoLoadPattern => "InvalidAutoLoadPattern",
            Self::MissingFrontmatter => "MissingFrontmatter",
            Self::MalformedFrontmatter => "MalformedFrontmatter",
            Self::DanglingCommandReference => "DanglingCommandReference",
            Self::InvalidHooksConfig => "InvalidHooksConfig",
            Self::InvalidMcpConfig => "InvalidMcpConfig",
            Self::HardcodedPath => "HardcodedPath",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single rule failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Offending file, relative to the plugin root.
    pub path: String,
    pub rule: Rule,
    pub message: String,
}

impl Violation {
    fn new(path: impl Into<String>, rule: Rule, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            rule,
            message: message.into(),
        }
    }

    fn manifest(rule: Rule, message: impl Into<String>) -> Self {
        Self::new(PLUGIN_MANIFEST, rule, message)
    }
}

/// Outcome of validating one plugin. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub plugin_name: String,
    pub ok: bool,
    pub violations: Vec<Violation>,
}

impl ValidationResult {
    fn from_violations(plugin_name: &str, mut violations: Vec<Violation>) -> Self {
        // Stable: keeps discovery order within one file.
        violations.sort_by(|a, b| {
            (a.path != PLUGIN_MANIFEST, &a.path).cmp(&(b.path != PLUGIN_MANIFEST, &b.path))
        });
        Self {
            plugin_name: plugin_name.to_string(),
            ok: violations.is_empty(),
            violations,
        }
    }

    /// A new result with `extra` folded into this one's violations.
    #[must_use]
    pub fn with_violations(&self, extra: Vec<Violation>) -> Self {
        let mut violations = self.violations.clone();
        violations.extend(extra);
        Self::from_violations(&self.plugin_name, violations)
    }
}

/// Checks plugin folders against the structural rules.
///
/// Holds the set of plugin names known to the marketplace so dependency
/// edges can be resolved.
#[derive(Debug, Clone)]
pub struct Validator {
    known_plugins: BTreeSet<String>,
    check_hardcoded_paths: bool,
    scan: ScanOptions,
}

impl Validator {
    #[must_use]
    pub fn new(config: &ValidationConfig, known_plugins: BTreeSet<String>) -> Self {
        let ignore = config
            .scan_ignore
            .iter()
            .filter_map(|p| match glob::Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!(pattern = %p, %e, "ignoring invalid scan_ignore pattern");
                    None
                },
            })
            .collect();
        Self {
            known_plugins,
            check_hardcoded_paths: config.check_hardcoded_paths,
            scan: ScanOptions {
                text_extensions: config.text_extensions.clone(),
                ignore,
            },
        }
    }

    /// Run every rule against `plugin`.
    #[must_use]
    pub fn validate(&self, plugin: &LoadedPlugin) -> ValidationResult {
        let descriptor = &plugin.descriptor;
        let mut violations = Vec::new();

        check_name(descriptor, &mut violations);
        check_version(descriptor, &mut violations);
        self.check_dependencies(descriptor, &mut violations);
        check_auto_load(descriptor, &mut violations);
        check_artifacts(&plugin.root, &mut violations);
        check_json_configs(&plugin.root, &mut violations);
        if self.check_hardcoded_paths {
            for hit in scan_plugin(&plugin.root, &self.scan) {
                violations.push(Violation::new(
                    hit.file,
                    Rule::HardcodedPath,
                    format!("line {}: absolute path `{}`", hit.line, hit.literal),
                ));
            }
        }

        let result = ValidationResult::from_violations(&descriptor.name, violations);
        debug!(
            plugin = %descriptor.name,
            ok = result.ok,
            violations = result.violations.len(),
            "validated plugin"
        );
        result
    }

    fn check_dependencies(&self, descriptor: &PluginDescriptor, out: &mut Vec<Violation>) {
        for (edge, name) in descriptor.plugin_dependencies() {
            if !self.known_plugins.contains(name) {
                out.push(Violation::manifest(
                    Rule::UnresolvedPluginDependency,
                    format!("{edge}.plugins references unknown plugin `{name}`"),
                ));
            }
        }
    }
}

/// Dependency edges of `descriptor` that point at a plugin which loaded but
/// failed validation, and so will not be in the manifest.
#[must_use]
pub fn failed_dependency_violations(
    descriptor: &PluginDescriptor,
    failed: &BTreeSet<String>,
) -> Vec<Violation> {
    descriptor
        .plugin_dependencies()
        .filter(|(_, name)| failed.contains(*name))
        .map(|(edge, name)| {
            Violation::manifest(
                Rule::UnresolvedPluginDependency,
                format!("{edge}.plugins references `{name}`, which failed validation"),
            )
        })
        .collect()
}

fn check_name(descriptor: &PluginDescriptor, out: &mut Vec<Violation>) {
    let valid = PLUGIN_NAME
        .as_ref()
        .is_some_and(|re| re.is_match(&descriptor.name));
    if !valid {
        out.push(Violation::manifest(
            Rule::NamingConventionViolation,
            format!(
                "name `{}` does not follow aai-{{category}}-{{name}} (lowercase, digits, hyphens)",
                descriptor.name
            ),
        ));
    }
}

fn check_version(descriptor: &PluginDescriptor, out: &mut Vec<Violation>) {
    let valid = SEMVER
        .as_ref()
        .is_some_and(|re| re.is_match(&descriptor.version));
    if !valid {
        out.push(Violation::manifest(
            Rule::InvalidVersion,
            format!("version `{}` is not a semantic version", descriptor.version),
        ));
    }
}

fn check_auto_load(descriptor: &PluginDescriptor, out: &mut Vec<Violation>) {
    let Some(when) = descriptor.auto_load_when() else {
        return;
    };
    for pattern in &when.files {
        if Path::new(pattern).is_absolute() {
            out.push(Violation::manifest(
                Rule::InvalidAutoLoadPattern,
                format!("autoLoad.when.files entry `{pattern}` must be relative"),
            ));
        } else if let Err(e) = glob::Pattern::new(pattern) {
            out.push(Violation::manifest(
                Rule::InvalidAutoLoadPattern,
                format!("autoLoad.when.files entry `{pattern}` is not a valid glob: {e}"),
            ));
        }
    }
}

/// A markdown artifact that may reference commands.
struct Invocable {
    path: String,
    refs: Vec<String>,
}

fn check_artifacts(root: &Path, out: &mut Vec<Violation>) {
    let mut invocables = Vec::new();

    for skill_dir in sorted_dirs(&root.join("skills")) {
        let skill_md = skill_dir.join("SKILL.md");
        let rel = relative_display(root, &skill_md);
        if !skill_md.is_file() {
            out.push(Violation::new(
                rel,
                Rule::MissingFrontmatter,
                "skill directory has no SKILL.md",
            ));
            continue;
        }
        check_markdown(root, &skill_md, ArtifactKind::Skill, out, &mut invocables);
    }

    for agent in sorted_files(&root.join("agents"), "md") {
        check_markdown(root, &agent, ArtifactKind::Agent, out, &mut invocables);
    }

    let commands: Vec<PathBuf> = sorted_files(&root.join("commands"), "md");
    for command in &commands {
        check_markdown(root, command, ArtifactKind::Command, out, &mut invocables);
    }

    let available: BTreeSet<String> = commands
        .iter()
        .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(String::from))
        .collect();
    for invocable in invocables {
        for reference in &invocable.refs {
            let stem = frontmatter::command_stem(reference);
            if !available.contains(stem) {
                out.push(Violation::new(
                    invocable.path.clone(),
                    Rule::DanglingCommandReference,
                    format!("references command `{reference}` but commands/{stem}.md does not exist"),
                ));
            }
        }
    }
}

fn check_markdown(
    root: &Path,
    path: &Path,
    kind: ArtifactKind,
    out: &mut Vec<Violation>,
    invocables: &mut Vec<Invocable>,
) {
    let rel = relative_display(root, path);
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            let rule = if kind.requires_frontmatter() {
                Rule::MissingFrontmatter
            } else {
                Rule::MalformedFrontmatter
            };
            out.push(Violation::new(rel, rule, format!("unreadable {kind} file: {e}")));
            return;
        },
    };

    match frontmatter::parse(kind, &content) {
        Ok(fm) => {
            let refs = fm.command_refs();
            if !refs.is_empty() {
                invocables.push(Invocable {
                    path: rel,
                    refs: refs.to_vec(),
                });
            }
        },
        Err(e) => {
            let rule = match (&e, kind.requires_frontmatter()) {
                (FrontmatterError::Missing, false) => return,
                (FrontmatterError::InvalidField(_), _) | (_, false) => Rule::MalformedFrontmatter,
                (_, true) => Rule::MissingFrontmatter,
            };
            out.push(Violation::new(rel, rule, format!("{kind}: {e}")));
        },
    }
}

fn check_json_configs(root: &Path, out: &mut Vec<Violation>) {
    let hooks = root.join("hooks").join("hooks.json");
    if hooks.is_file() {
        let rel = relative_display(root, &hooks);
        match read_json(&hooks) {
            Ok(serde_json::Value::Object(_)) => {},
            Ok(_) => out.push(Violation::new(
                rel,
                Rule::InvalidHooksConfig,
                "hooks.json must contain a JSON object",
            )),
            Err(reason) => out.push(Violation::new(rel, Rule::InvalidHooksConfig, reason)),
        }
    }

    let mcp = root.join(".mcp.json");
    if mcp.is_file() {
        let rel = relative_display(root, &mcp);
        match read_json(&mcp) {
            Ok(serde_json::Value::Object(map)) => {
                if map.get("mcpServers").is_some_and(|s| !s.is_object()) {
                    out.push(Violation::new(
                        rel,
                        Rule::InvalidMcpConfig,
                        "`mcpServers` must be an object keyed by server name",
                    ));
                }
            },
            Ok(_) => out.push(Violation::new(
                rel,
                Rule::InvalidMcpConfig,
                ".mcp.json must contain a JSON object",
            )),
            Err(reason) => out.push(Violation::new(rel, Rule::InvalidMcpConfig, reason)),
        }
    }
}

fn read_json(path: &Path) -> Result<serde_json::Value, String> {
    let raw = std::fs::read_to_string(path).map_err(|e| format!("unreadable: {e}"))?;
    serde_json::from_str(&raw).map_err(|e| format!("invalid JSON: {e}"))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::loader::load_plugin, rstest::rstest};

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn manifest(name: &str, extra: &str) -> String {
        format!(r#"{{"name": "{name}", "version": "1.0.0", "category": "stack"{extra}}}"#)
    }

    fn validator(known: &[&str]) -> Validator {
        Validator::new(
            &ValidationConfig::default(),
            known.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn validate_dir(root: &Path, known: &[&str]) -> ValidationResult {
        validator(known).validate(&load_plugin(root).unwrap())
    }

    fn rules(result: &ValidationResult) -> Vec<Rule> {
        result.violations.iter().map(|v| v.rule).collect()
    }

    #[rstest]
    #[case("aai-stack-react", true)]
    #[case("aai-core", true)]
    #[case("aai-dev-rust-2", true)]
    #[case("aai-Stack-react", false)]
    #[case("stack-react", false)]
    #[case("aai-stack_react", false)]
    #[case("aai-", false)]
    fn plugin_name_convention(#[case] name: &str, #[case] ok: bool) {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), PLUGIN_MANIFEST, &manifest(name, ""));
        let result = validate_dir(tmp.path(), &[]);
        assert_eq!(
            !rules(&result).contains(&Rule::NamingConventionViolation),
            ok,
            "{name}"
        );
    }

    #[rstest]
    #[case("1.0.0", true)]
    #[case("0.3.1-beta.2+build.7", true)]
    #[case("1.0", false)]
    #[case("v1.0.0", false)]
    #[case("01.0.0", false)]
    fn versions(#[case] version: &str, #[case] ok: bool) {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            PLUGIN_MANIFEST,
            &format!(r#"{{"name": "aai-dev-x", "version": "{version}", "category": "dev"}}"#),
        );
        let result = validate_dir(tmp.path(), &[]);
        assert_eq!(result.ok, ok, "{version}");
    }

    #[test]
    fn clean_plugin_passes() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(
            root,
            PLUGIN_MANIFEST,
            &manifest(
                "aai-stack-react",
                r#", "requires": {"plugins": ["aai-core"]}, "autoLoad": {"when": {"files": ["vite.config.*"]}}"#,
            ),
        );
        write(
            root,
            "skills/components/SKILL.md",
            "---\nname: components\ndescription: Build components\ncommands: [/scaffold]\n---\nUse it.\n",
        );
        write(root, "agents/reviewer.md", "---\nname: reviewer\ndescription: Reviews\n---\n");
        write(root, "commands/scaffold.md", "Scaffold a component.\n");
        write(root, "hooks/hooks.json", r#"{"hooks": {}}"#);
        write(root, ".mcp.json", r#"{"mcpServers": {"ctx": {"command": "npx"}}}"#);

        let result = validate_dir(root, &["aai-core", "aai-stack-react"]);
        assert!(result.ok, "{:?}", result.violations);
        assert_eq!(result.plugin_name, "aai-stack-react");
    }

    #[test]
    fn all_rules_collected_in_stable_order() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(
            root,
            PLUGIN_MANIFEST,
            &manifest(
                "Bad_Name",
                r#", "recommends": {"plugins": ["aai-ghost"]}, "autoLoad": {"when": {"files": ["/etc/passwd", "src/[.ts"]}}"#,
            ),
        );
        write(root, "skills/zeta/SKILL.md", "No frontmatter at all.\n");
        write(root, "skills/alpha/notes.md", "orphan");
        write(
            root,
            "agents/helper.md",
            "---\nname: helper\ndescription: Helps\ncommands: [missing]\n---\nSee /Users/alice/work.\n",
        );
        write(root, "commands/broken.md", "---\n- not\n- a map\n---\n");
        write(root, "hooks/hooks.json", "[1]");
        write(root, ".mcp.json", "{not json");

        let result = validate_dir(root, &[]);
        assert!(!result.ok);

        let got: Vec<(&str, Rule)> = result
            .violations
            .iter()
            .map(|v| (v.path.as_str(), v.rule))
            .collect();
        assert_eq!(got, vec![
            (PLUGIN_MANIFEST, Rule::NamingConventionViolation),
            (PLUGIN_MANIFEST, Rule::UnresolvedPluginDependency),
            (PLUGIN_MANIFEST, Rule::InvalidAutoLoadPattern),
            (PLUGIN_MANIFEST, Rule::InvalidAutoLoadPattern),
            (PLUGIN_MANIFEST, Rule::HardcodedPath),
            (".mcp.json", Rule::InvalidMcpConfig),
            ("agents/helper.md", Rule::DanglingCommandReference),
            ("agents/helper.md", Rule::HardcodedPath),
            ("commands/broken.md", Rule::MalformedFrontmatter),
            ("hooks/hooks.json", Rule::InvalidHooksConfig),
            ("skills/alpha/SKILL.md", Rule::MissingFrontmatter),
            ("skills/zeta/SKILL.md", Rule::MissingFrontmatter),
        ]);
    }

    #[test]
    fn missing_frontmatter_names_file() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(root, PLUGIN_MANIFEST, &manifest("aai-stack-react", ""));
        write(root, "skills/hooks/SKILL.md", "# Hooks\n\nNo metadata.\n");

        let result = validate_dir(root, &[]);
        assert_eq!(result.violations.len(), 1);
        let v = &result.violations[0];
        assert_eq!(v.rule, Rule::MissingFrontmatter);
        assert_eq!(v.path, "skills/hooks/SKILL.md");
        assert_eq!(v.message, "skill: no YAML frontmatter block");
    }

    #[test]
    fn scalar_commands_are_checked_for_dangling_references() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(root, PLUGIN_MANIFEST, &manifest("aai-stack-react", ""));
        write(
            root,
            "skills/ship/SKILL.md",
            "---\nname: ship\ndescription: Ship it\ncommands: /deploy\n---\n",
        );

        let result = validate_dir(root, &[]);
        assert_eq!(rules(&result), vec![Rule::DanglingCommandReference]);
        assert!(result.violations[0].message.contains("commands/deploy.md"));

        write(root, "commands/deploy.md", "Deploy.\n");
        assert!(validate_dir(root, &[]).ok);
    }

    #[test]
    fn wrongly_typed_frontmatter_is_malformed() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(root, PLUGIN_MANIFEST, &manifest("aai-stack-react", ""));
        write(
            root,
            "agents/ops.md",
            "---\nname: ops\ndescription: Ops\ncommands: {deploy: true}\n---\n",
        );

        let result = validate_dir(root, &[]);
        assert_eq!(rules(&result), vec![Rule::MalformedFrontmatter]);
        assert_eq!(result.violations[0].path, "agents/ops.md");
    }

    #[test]
    fn validation_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(root, PLUGIN_MANIFEST, &manifest("aai-stack-vue", r#", "requires": {"plugins": ["x"]}"#));
        write(root, "agents/a.md", "---\nname: a\n---\n");

        let first = validate_dir(root, &[]);
        let second = validate_dir(root, &[]);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn hardcoded_path_check_can_be_disabled() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(root, PLUGIN_MANIFEST, &manifest("aai-stack-react", ""));
        write(root, "commands/run.md", "cd /home/ci/build\n");

        assert!(!validate_dir(root, &[]).ok);

        let config = ValidationConfig {
            check_hardcoded_paths: false,
            ..Default::default()
        };
        let result = Validator::new(&config, BTreeSet::new()).validate(&load_plugin(root).unwrap());
        assert!(result.ok);
    }

    #[test]
    fn result_serializes_camel_case() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), PLUGIN_MANIFEST, &manifest("aai-stack-react", ""));
        let value = serde_json::to_value(validate_dir(tmp.path(), &[])).unwrap();
        assert_eq!(value["pluginName"], "aai-stack-react");
        assert_eq!(value["ok"], true);
        assert!(value["violations"].as_array().unwrap().is_empty());
    }
}
