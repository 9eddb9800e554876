//! Hardcoded absolute path detection.
//!
//! A plugin is copied onto other people's machines, so literal paths such as
//! `/Users/jane/...`, `/tmp/build` or `C:\Users\...` inside its files are
//! always wrong. Interpreter paths like `/usr/bin` and `/bin` are left alone
//! so shebang lines pass.

use std::{path::Path, sync::LazyLock};

use {
    marketplace_common::paths::relative_display,
    regex::Regex,
    tracing::debug,
    walkdir::WalkDir,
};

/// Directories never scanned.
const SKIPPED_DIRS: &[&str] = &[".git", "node_modules", "target"];

static ABSOLUTE_PATH: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r#"(?:^|[\s"'`(\[=,:])((?:/(?:Users|home|root|Volumes|mnt|media|private|opt|srv|var|tmp|etc|usr/local)/[^\s"'`)\]<>,]+)|(?:[A-Za-z]:\\{1,2}[^\s"'`)\]<>,]+))"#,
    )
    .ok()
});

/// One absolute path literal found in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathHit {
    /// File path relative to the plugin root, `/`-separated.
    pub file: String,
    /// 1-based line number.
    pub line: usize,
    pub literal: String,
}

/// Options for [`scan_plugin`].
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Extensions (without dot) of files to read.
    pub text_extensions: Vec<String>,
    /// Glob patterns, relative to the plugin root, to skip.
    pub ignore: Vec<glob::Pattern>,
}

impl ScanOptions {
    fn wants(&self, rel: &str, path: &Path) -> bool {
        let ext_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.text_extensions.iter().any(|t| t == ext));
        ext_ok && !self.ignore.iter().any(|p| p.matches(rel))
    }
}

/// First absolute path literal on `line`, if any.
#[must_use]
pub fn find_absolute_path(line: &str) -> Option<&str> {
    let re = ABSOLUTE_PATH.as_ref()?;
    re.captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_end_matches(['.', ';']))
}

/// Scan every text file under `root`, one hit per offending line.
///
/// Hits come back sorted by file, then line.
#[must_use]
pub fn scan_plugin(root: &Path, options: &ScanOptions) -> Vec<PathHit> {
    let mut hits = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            !(e.depth() > 0
                && e.file_type().is_dir()
                && e.file_name()
                    .to_str()
                    .is_some_and(|n| SKIPPED_DIRS.contains(&n)))
        });

    for entry in walker.flatten() {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let rel = relative_display(root, path);
        if !options.wants(&rel, path) {
            continue;
        }
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                debug!(file = %rel, %e, "skipping unreadable file in path scan");
                continue;
            },
        };
        for (idx, line) in content.lines().enumerate() {
            if let Some(literal) = find_absolute_path(line) {
                hits.push(PathHit {
                    file: rel.clone(),
                    line: idx + 1,
                    literal: literal.to_string(),
                });
            }
        }
    }

    hits.sort_by(|a, b| a.file.cmp(&b.file).then(a.line.cmp(&b.line)));
    hits
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("see /Users/jane/projects/app for details", "/Users/jane/projects/app")]
    #[case("cd \"/home/dev/repo\"", "/home/dev/repo")]
    #[case("path: /root/.config/tool.json", "/root/.config/tool.json")]
    #[case(r#"{"cwd": "C:\\Users\\dev\\app"}"#, r"C:\\Users\\dev\\app")]
    #[case("open `/Volumes/Data/x`.", "/Volumes/Data/x")]
    #[case("cp dist /tmp/build/x", "/tmp/build/x")]
    #[case("config=/etc/myapp/conf.toml", "/etc/myapp/conf.toml")]
    #[case("install into /usr/local/share/tool", "/usr/local/share/tool")]
    #[case("logs land in /var/log/app.log", "/var/log/app.log")]
    fn detects_absolute_paths(#[case] line: &str, #[case] expected: &str) {
        assert_eq!(find_absolute_path(line), Some(expected));
    }

    #[rstest]
    #[case("#!/usr/bin/env bash")]
    #[case("#!/bin/sh")]
    #[case("visit https://example.com/home/page")]
    #[case("relative ./scripts/run.sh and ~/notes.md")]
    #[case("the /home route renders the landing page")]
    #[case("${CLAUDE_PLUGIN_ROOT}/scripts/check.sh")]
    fn ignores_non_absolute_or_system_paths(#[case] line: &str) {
        assert_eq!(find_absolute_path(line), None);
    }

    fn options() -> ScanOptions {
        ScanOptions {
            text_extensions: vec!["md".into(), "json".into()],
            ignore: Vec::new(),
        }
    }

    #[test]
    fn scan_reports_file_and_line() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("skills/a")).unwrap();
        std::fs::write(
            root.join("skills/a/SKILL.md"),
            "---\nname: a\n---\nok line\nrun /home/bob/bin/tool\n",
        )
        .unwrap();
        std::fs::write(root.join("notes.txt"), "/home/bob/ignored-extension").unwrap();

        let hits = scan_plugin(root, &options());
        assert_eq!(hits, vec![PathHit {
            file: "skills/a/SKILL.md".into(),
            line: 5,
            literal: "/home/bob/bin/tool".into(),
        }]);
    }

    #[test]
    fn scan_honours_ignore_patterns_and_skipped_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("docs")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        std::fs::write(root.join("docs/setup.md"), "/Users/me/x").unwrap();
        std::fs::write(root.join("node_modules/pkg/README.md"), "/Users/me/y").unwrap();

        let mut opts = options();
        opts.ignore.push(glob::Pattern::new("docs/**").unwrap());
        assert!(scan_plugin(root, &opts).is_empty());
    }
}
