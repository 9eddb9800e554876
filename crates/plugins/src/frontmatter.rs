//! YAML frontmatter for markdown artifacts (skills, agents, commands).
//!
//! Each artifact kind has its own minimal schema. Only the required keys
//! are checked, so new optional keys never break validation.

use serde::Deserialize;

/// Which kind of markdown artifact a file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Skill,
    Agent,
    Command,
}

impl ArtifactKind {
    /// Keys that must be present with a non-empty string value.
    #[must_use]
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            Self::Skill | Self::Agent => &["name", "description"],
            Self::Command => &[],
        }
    }

    /// Whether a file of this kind must open with a frontmatter block.
    #[must_use]
    pub fn requires_frontmatter(self) -> bool {
        !matches!(self, Self::Command)
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skill => write!(f, "skill"),
            Self::Agent => write!(f, "agent"),
            Self::Command => write!(f, "command"),
        }
    }
}

/// Why a file's frontmatter does not satisfy its artifact schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontmatterError {
    /// The file does not open with a `---` line.
    Missing,
    /// No closing `---` line.
    Unterminated,
    /// The block is not valid YAML.
    InvalidYaml(String),
    /// Valid YAML, but not a mapping.
    NotAMapping,
    /// Required keys absent or blank.
    MissingFields(Vec<&'static str>),
    /// A known key holds a value of the wrong shape.
    InvalidField(String),
}

impl std::fmt::Display for FrontmatterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "no YAML frontmatter block"),
            Self::Unterminated => write!(f, "frontmatter block is not closed with ---"),
            Self::InvalidYaml(reason) => write!(f, "frontmatter is not valid YAML: {reason}"),
            Self::NotAMapping => write!(f, "frontmatter is not a key/value mapping"),
            Self::MissingFields(fields) => {
                let list = fields
                    .iter()
                    .map(|f| format!("`{f}`"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "frontmatter is missing {list}")
            },
            Self::InvalidField(reason) => write!(f, "frontmatter field has the wrong type: {reason}"),
        }
    }
}

impl std::error::Error for FrontmatterError {}

/// Fields shared by skills and agents.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvocableFrontmatter {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Slash-commands this artifact tells the host it may invoke. A single
    /// string is split on commas and whitespace.
    #[serde(default, deserialize_with = "one_or_many")]
    pub commands: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(String::from)
            .collect(),
        Some(OneOrMany::Many(list)) => list,
    })
}

/// Optional metadata at the top of a command file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandFrontmatter {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "argument-hint")]
    pub argument_hint: Option<String>,
}

/// Frontmatter parsed and checked against its artifact kind.
#[derive(Debug, Clone)]
pub enum ArtifactFrontmatter {
    Skill(InvocableFrontmatter),
    Agent(InvocableFrontmatter),
    /// `None` when the command file has no frontmatter at all.
    Command(Option<CommandFrontmatter>),
}

impl ArtifactFrontmatter {
    /// Command references declared by a skill or agent.
    #[must_use]
    pub fn command_refs(&self) -> &[String] {
        match self {
            Self::Skill(fm) | Self::Agent(fm) => &fm.commands,
            Self::Command(_) => &[],
        }
    }
}

/// Split `content` into the raw frontmatter block and the body.
///
/// Returns `Ok(None)` when the file does not open with `---`.
pub fn split(content: &str) -> Result<Option<(&str, &str)>, FrontmatterError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let Some(first_end) = content.find('\n') else {
        return if content.trim_end() == "---" {
            Err(FrontmatterError::Unterminated)
        } else {
            Ok(None)
        };
    };
    if content[..first_end].trim_end() != "---" {
        return Ok(None);
    }

    let rest = &content[first_end + 1..];
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let block = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Ok(Some((block, body)));
        }
        offset += line.len();
    }
    Err(FrontmatterError::Unterminated)
}

/// Parse and check the frontmatter of an artifact of the given kind.
pub fn parse(kind: ArtifactKind, content: &str) -> Result<ArtifactFrontmatter, FrontmatterError> {
    let Some((block, _body)) = split(content)? else {
        return if kind.requires_frontmatter() {
            Err(FrontmatterError::Missing)
        } else {
            Ok(ArtifactFrontmatter::Command(None))
        };
    };

    let value: serde_yaml::Value =
        serde_yaml::from_str(block).map_err(|e| FrontmatterError::InvalidYaml(e.to_string()))?;
    let value = match value {
        serde_yaml::Value::Null => serde_yaml::Value::Mapping(serde_yaml::Mapping::new()),
        serde_yaml::Value::Mapping(_) => value,
        _ => return Err(FrontmatterError::NotAMapping),
    };

    let missing: Vec<&'static str> = kind
        .required_fields()
        .iter()
        .copied()
        .filter(|field| {
            !value
                .get(*field)
                .and_then(serde_yaml::Value::as_str)
                .is_some_and(|s| !s.trim().is_empty())
        })
        .collect();
    if !missing.is_empty() {
        return Err(FrontmatterError::MissingFields(missing));
    }

    let invalid = |e: serde_yaml::Error| FrontmatterError::InvalidField(e.to_string());
    Ok(match kind {
        ArtifactKind::Skill => ArtifactFrontmatter::Skill(
            serde_yaml::from_value(value).map_err(invalid)?,
        ),
        ArtifactKind::Agent => ArtifactFrontmatter::Agent(
            serde_yaml::from_value(value).map_err(invalid)?,
        ),
        ArtifactKind::Command => ArtifactFrontmatter::Command(Some(
            serde_yaml::from_value(value).map_err(invalid)?,
        )),
    })
}

/// Normalize a command reference (`/deploy`, `deploy.md`) to a file stem.
#[must_use]
pub fn command_stem(reference: &str) -> &str {
    let trimmed = reference.trim().trim_start_matches('/');
    trimmed.strip_suffix(".md").unwrap_or(trimmed)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[test]
    fn split_returns_block_and_body() {
        let (block, body) = split("---\nname: x\n---\n# Title\n").unwrap().unwrap();
        assert_eq!(block, "name: x\n");
        assert_eq!(body, "# Title\n");
    }

    #[test]
    fn split_handles_crlf_and_bom() {
        let content = "\u{feff}---\r\nname: x\r\n---\r\nbody";
        let (block, body) = split(content).unwrap().unwrap();
        assert_eq!(block, "name: x\r\n");
        assert_eq!(body, "body");
    }

    #[test]
    fn split_without_frontmatter_is_none() {
        assert!(split("# Just markdown\n").unwrap().is_none());
        assert!(split("").unwrap().is_none());
    }

    #[test]
    fn split_does_not_treat_horizontal_rules_inside_body_as_opening() {
        assert!(split("intro\n---\nmore\n").unwrap().is_none());
    }

    #[rstest]
    #[case("---\nname: x\n")]
    #[case("---")]
    fn split_unterminated(#[case] content: &str) {
        assert_eq!(split(content), Err(FrontmatterError::Unterminated));
    }

    #[test]
    fn skill_frontmatter_with_commands() {
        let content = "---\nname: plan\ndescription: Plan work\ncommands: [/deploy, review]\n---\nbody";
        let fm = parse(ArtifactKind::Skill, content).unwrap();
        assert_eq!(fm.command_refs(), ["/deploy", "review"]);
    }

    #[rstest]
    #[case("commands: /deploy", &["/deploy"])]
    #[case("commands: /deploy, review", &["/deploy", "review"])]
    #[case("commands: \"/deploy /review\"", &["/deploy", "/review"])]
    #[case("commands:", &[])]
    #[case("commands: []", &[])]
    fn scalar_commands_are_accepted(#[case] line: &str, #[case] expected: &[&str]) {
        let content = format!("---\nname: plan\ndescription: Plan work\n{line}\n---\n");
        let fm = parse(ArtifactKind::Skill, &content).unwrap();
        assert_eq!(fm.command_refs(), expected);
    }

    #[test]
    fn wrongly_typed_field_is_invalid_field() {
        let content = "---\nname: plan\ndescription: Plan work\ncommands: {deploy: true}\n---\n";
        let err = parse(ArtifactKind::Skill, content).unwrap_err();
        assert!(matches!(err, FrontmatterError::InvalidField(_)), "{err:?}");
        assert!(err.to_string().starts_with("frontmatter field has the wrong type"));
    }

    #[test]
    fn extra_keys_do_not_break_parsing() {
        let content = "---\nname: reviewer\ndescription: Reviews code\ntools: Read, Grep\nmodel: sonnet\n---\n";
        assert!(parse(ArtifactKind::Agent, content).is_ok());
    }

    #[test]
    fn missing_frontmatter_for_skill() {
        assert_eq!(
            parse(ArtifactKind::Skill, "# Skill\nNo metadata.").unwrap_err(),
            FrontmatterError::Missing
        );
    }

    #[test]
    fn missing_fields_are_all_listed() {
        let err = parse(ArtifactKind::Agent, "---\ntools: Read\n---\n").unwrap_err();
        assert_eq!(err, FrontmatterError::MissingFields(vec!["name", "description"]));
        assert_eq!(err.to_string(), "frontmatter is missing `name`, `description`");
    }

    #[test]
    fn blank_description_counts_as_missing() {
        let err = parse(ArtifactKind::Skill, "---\nname: x\ndescription: \"  \"\n---\n").unwrap_err();
        assert_eq!(err, FrontmatterError::MissingFields(vec!["description"]));
    }

    #[test]
    fn scalar_frontmatter_is_not_a_mapping() {
        assert_eq!(
            parse(ArtifactKind::Skill, "---\njust text\n---\n").unwrap_err(),
            FrontmatterError::NotAMapping
        );
    }

    #[test]
    fn invalid_yaml_reported() {
        let err = parse(ArtifactKind::Skill, "---\nname: [unclosed\n---\n").unwrap_err();
        assert!(matches!(err, FrontmatterError::InvalidYaml(_)));
    }

    #[test]
    fn command_frontmatter_is_optional() {
        let fm = parse(ArtifactKind::Command, "Run the deploy.\n").unwrap();
        assert!(matches!(fm, ArtifactFrontmatter::Command(None)));

        let fm = parse(
            ArtifactKind::Command,
            "---\ndescription: Deploy\nargument-hint: <env>\n---\nRun it.",
        )
        .unwrap();
        let ArtifactFrontmatter::Command(Some(cmd)) = fm else {
            panic!("expected command frontmatter");
        };
        assert_eq!(cmd.argument_hint.as_deref(), Some("<env>"));
    }

    #[rstest]
    #[case("/deploy", "deploy")]
    #[case("deploy.md", "deploy")]
    #[case(" review ", "review")]
    fn command_stems(#[case] reference: &str, #[case] expected: &str) {
        assert_eq!(command_stem(reference), expected);
    }
}
