//! Path rendering shared by reports and the manifest.

use std::path::{Component, Path};

/// Render `path` relative to `root` with `/` separators.
///
/// Falls back to the full path when `path` is not under `root`. Reports and
/// the manifest use this so output is identical across platforms.
#[must_use]
pub fn relative_display(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::RootDir => Some(String::new()),
            Component::CurDir => None,
            Component::ParentDir => Some("..".into()),
            Component::Prefix(p) => Some(p.as_os_str().to_string_lossy().into_owned()),
        })
        .collect();
    parts.join("/")
}
