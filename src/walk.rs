//! Source tree traversal shared by all three passes.
//!
//! Every pass walks the same tree in the same order: depth-first, entries
//! sorted by file name. Two declaration files in one directory therefore
//! always resolve the same way ("last walked wins" means lexically last).
//!
//! Entries whose name starts with `.` are pruned together with their
//! subtree, and so is the target directory when it lives inside the source.

use std::path::Path;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::paths::SitePaths;

/// What a source file is, decided purely by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `.json`: directory-scoped metadata, no output of its own.
    Declaration,
    /// `.html`: rendered as a template.
    Html,
    /// `.md`: templated, converted to HTML, then wrapped in a page template.
    Markdown,
    /// `.source` / `.template`: only reachable through imports.
    Fragment,
    /// Anything else is copied verbatim.
    Asset,
}

impl FileKind {
    pub fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => FileKind::Declaration,
            Some("html") => FileKind::Html,
            Some("md") => FileKind::Markdown,
            Some("source" | "template") => FileKind::Fragment,
            _ => FileKind::Asset,
        }
    }

    /// Files that appear in the Site Index.
    pub fn is_publishable(self) -> bool {
        matches!(self, FileKind::Html | FileKind::Markdown)
    }
}

pub fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

/// Whether a walked entry is a file to process. Symlinks are followed, so a
/// linked page or declaration counts like the file it points at; every pass
/// uses this same test.
pub fn is_source_file(entry: &DirEntry) -> bool {
    !entry.file_type().is_dir() && entry.path().is_file()
}

/// Walk the source tree in deterministic order.
///
/// Yields directories as well as files; callers skip what they don't need.
pub fn source_entries(
    paths: &SitePaths,
) -> impl Iterator<Item = Result<DirEntry, walkdir::Error>> + use<> {
    let target = paths.target.clone();
    WalkDir::new(&paths.source)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            if is_hidden(entry) {
                debug!("skip hidden {}", entry.path().display());
                return false;
            }
            if entry.path() == target {
                debug!("skip target directory {}", entry.path().display());
                return false;
            }
            true
        })
}
