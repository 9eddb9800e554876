//! File-existence probes for `autoLoad.when.files`.

use std::{collections::BTreeSet, path::Path};

use tracing::{debug, warn};

/// Return the subset of `patterns` that match at least one path under `root`.
///
/// Absolute or unparsable patterns never match.
pub fn probe_files<'a>(root: &Path, patterns: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    let Some(root_str) = root.to_str() else {
        warn!(root = %root.display(), "project root is not valid UTF-8, skipping file probes");
        return BTreeSet::new();
    };
    let base = glob::Pattern::escape(root_str.trim_end_matches(['/', '\\']));

    let mut matched = BTreeSet::new();
    for pattern in patterns {
        if matched.contains(pattern) {
            continue;
        }
        if Path::new(pattern).is_absolute() {
            warn!(pattern, "ignoring absolute file probe");
            continue;
        }
        let full = format!("{base}/{pattern}");
        let hit = match glob::glob(&full) {
            Ok(mut paths) => paths.any(|p| p.is_ok()),
            Err(e) => {
                warn!(pattern, %e, "ignoring invalid file probe");
                continue;
            },
        };
        debug!(pattern, hit, "file probe");
        if hit {
            matched.insert(pattern.to_string());
        }
    }
    matched
}
