use std::{collections::BTreeMap, fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

/// Location of the plugin manifest inside a plugin folder.
pub const PLUGIN_MANIFEST: &str = ".claude-plugin/plugin.json";

// ── Category ────────────────────────────────────────────────────────────────

/// Marketplace category a plugin is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Workflow,
    Pm,
    Dev,
    Stack,
    Testing,
    Architecture,
    Docs,
    Blog,
    Devops,
    Quality,
}

impl Category {
    pub const ALL: [Self; 10] = [
        Self::Workflow,
        Self::Pm,
        Self::Dev,
        Self::Stack,
        Self::Testing,
        Self::Architecture,
        Self::Docs,
        Self::Blog,
        Self::Devops,
        Self::Quality,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Workflow => "workflow",
            Self::Pm => "pm",
            Self::Dev => "dev",
            Self::Stack => "stack",
            Self::Testing => "testing",
            Self::Architecture => "architecture",
            Self::Docs => "docs",
            Self::Blog => "blog",
            Self::Devops => "devops",
            Self::Quality => "quality",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Descriptor parts ────────────────────────────────────────────────────────

/// Plugin author. `plugin.json` may carry a bare string or an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AuthorRepr")]
pub struct Author {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AuthorRepr {
    Simple(String),
    Object {
        name: String,
        #[serde(default)]
        url: Option<String>,
    },
}

impl From<AuthorRepr> for Author {
    fn from(repr: AuthorRepr) -> Self {
        match repr {
            AuthorRepr::Simple(name) => Self { name, url: None },
            AuthorRepr::Object { name, url } => Self { name, url },
        }
    }
}

/// Dependency edges to MCP servers and other plugins, by name only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencySet {
    #[serde(default)]
    pub mcp_servers: Vec<String>,
    #[serde(default)]
    pub plugins: Vec<String>,
}

/// `autoLoad` block: the plugin is suggested when `when` matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoLoad {
    #[serde(default)]
    pub when: AutoLoadWhen,
}

/// Any-match trigger conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoLoadWhen {
    /// Dependency names looked up in the consuming project's manifest.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Glob probes relative to the consuming project's root.
    #[serde(default)]
    pub files: Vec<String>,
}

impl AutoLoadWhen {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty() && self.files.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Models {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configurable: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compatibility {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claude_code: Option<String>,
}

/// Artifacts discovered on disk, as paths relative to the plugin root.
///
/// Never taken from `plugin.json`: the loader always overwrites it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Components {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agents: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hooks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp: Option<String>,
}

impl Components {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
            && self.skills.is_empty()
            && self.commands.is_empty()
            && self.hooks.is_none()
            && self.mcp.is_none()
    }
}

// ── Descriptor ──────────────────────────────────────────────────────────────

/// Typed view of one plugin's `.claude-plugin/plugin.json`.
///
/// Keys this type does not know are kept in `extra` and written back out,
/// so new optional fields survive a manifest rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires: Option<DependencySet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommends: Option<DependencySet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_load: Option<AutoLoad>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models: Option<Models>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatibility: Option<Compatibility>,
    #[serde(default, skip_serializing_if = "Components::is_empty")]
    pub components: Components,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl PluginDescriptor {
    /// Plugin names this plugin depends on, hard edges first.
    pub fn plugin_dependencies(&self) -> impl Iterator<Item = (&'static str, &str)> {
        let requires = self
            .requires
            .iter()
            .flat_map(|r| r.plugins.iter().map(|p| ("requires", p.as_str())));
        let recommends = self
            .recommends
            .iter()
            .flat_map(|r| r.plugins.iter().map(|p| ("recommends", p.as_str())));
        requires.chain(recommends)
    }

    /// Declared auto-load conditions, if any.
    #[must_use]
    pub fn auto_load_when(&self) -> Option<&AutoLoadWhen> {
        self.auto_load.as_ref().map(|a| &a.when)
    }
}

/// A descriptor together with the folder it was read from.
#[derive(Debug, Clone)]
pub struct LoadedPlugin {
    pub root: PathBuf,
    pub descriptor: PluginDescriptor,
}

impl LoadedPlugin {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}
