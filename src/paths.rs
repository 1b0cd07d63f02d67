//! Path arithmetic shared by every pass.
//!
//! Three mappings drive the whole build:
//!
//! ```text
//! source file   src/blog/notes.md
//!     │  target_file_for(.., "html")
//!     ▼
//! target file   tgt/blog/notes.html
//!     │  url_for
//!     ▼
//! public URL    /blog/notes.html
//! ```
//!
//! Everything except [`SitePaths::new`] is lexical: no function here reads the
//! filesystem, so the metadata stack and the gatherer can rely on identical
//! inputs always producing identical paths.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{path} is not inside {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },
}

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding component. Does not resolve symlinks.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Render a relative path as `/`-separated URL segments.
fn url_segments(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// The two roots of a build, both absolute and normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePaths {
    pub source: PathBuf,
    pub target: PathBuf,
}

impl SitePaths {
    /// Anchor `source` and `target` to the current directory and normalize them.
    pub fn new(source: &Path, target: &Path) -> Result<Self, PathError> {
        Ok(Self {
            source: normalize(&std::path::absolute(source)?),
            target: normalize(&std::path::absolute(target)?),
        })
    }

    /// Path of `path` relative to the source root.
    pub fn source_relative(&self, path: &Path) -> Result<PathBuf, PathError> {
        relative_to(&self.source, path)
    }

    /// Mirror a source path into the target tree, keeping its extension.
    pub fn mirror(&self, path: &Path) -> Result<PathBuf, PathError> {
        Ok(self.target.join(self.source_relative(path)?))
    }

    /// Mirror a source path into the target tree with a new extension
    /// (given without the leading dot).
    pub fn target_file_for(&self, path: &Path, extension: &str) -> Result<PathBuf, PathError> {
        Ok(self.mirror(path)?.with_extension(extension))
    }

    /// Public URL of a file inside the target tree: `/` + its relative path.
    pub fn url_for(&self, target_file: &Path) -> Result<String, PathError> {
        let rel = relative_to(&self.target, target_file)?;
        Ok(format!("/{}", url_segments(&rel)))
    }

    /// Inverse of [`SitePaths::url_for`]: where a site URL lands on disk.
    pub fn file_for_url(&self, url: &str) -> PathBuf {
        normalize(&self.target.join(url.trim_start_matches('/')))
    }
}

/// Strip `root` from `path` after normalizing both.
pub fn relative_to(root: &Path, path: &Path) -> Result<PathBuf, PathError> {
    let root = normalize(root);
    let path = normalize(path);
    path.strip_prefix(&root)
        .map(Path::to_path_buf)
        .map_err(|_| PathError::OutsideRoot { path, root })
}

/// The directory part of a URL path: `/blog/post.html` → `/blog`.
pub fn url_dir(url: &str) -> &str {
    match url.rfind('/') {
        Some(0) | None => "/",
        Some(pos) => &url[..pos],
    }
}

/// Compute `to` relative to the URL directory `from_dir`.
///
/// Only site-rooted URLs (leading `/`) are rewritten; anything else
/// (`https://…`, `#anchor`, an already relative path) is returned as is.
///
/// ```text
/// relative_url("/blog/2024", "/css/site.css")  → "../../css/site.css"
/// relative_url("/", "/index.html")             → "index.html"
/// relative_url("/blog", "/blog")               → "."
/// ```
pub fn relative_url(from_dir: &str, to: &str) -> String {
    if !to.starts_with('/') {
        return to.to_string();
    }
    let base: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty()).collect();
    let dest: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();

    let common = base
        .iter()
        .zip(dest.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = vec![".."; base.len() - common];
    parts.extend_from_slice(&dest[common..]);

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> SitePaths {
        SitePaths {
            source: PathBuf::from("/work/src"),
            target: PathBuf::from("/work/tgt"),
        }
    }

    // =========================================================================
    // normalize()
    // =========================================================================

    #[test]
    fn normalize_drops_cur_dir() {
        assert_eq!(normalize(Path::new("/a/./b/.")), PathBuf::from("/a/b"));
    }

    #[test]
    fn normalize_folds_parent_dir() {
        assert_eq!(normalize(Path::new("/a/b/../c")), PathBuf::from("/a/c"));
    }

    #[test]
    fn normalize_parent_at_root_stays_at_root() {
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
    }

    #[test]
    fn normalize_keeps_leading_parent_on_relative_paths() {
        assert_eq!(normalize(Path::new("../a/b")), PathBuf::from("../a/b"));
    }

    // =========================================================================
    // Source → target → URL
    // =========================================================================

    #[test]
    fn target_file_swaps_extension() {
        let target = site()
            .target_file_for(Path::new("/work/src/blog/notes.md"), "html")
            .unwrap();
        assert_eq!(target, PathBuf::from("/work/tgt/blog/notes.html"));
    }

    #[test]
    fn mirror_keeps_extension() {
        let target = site().mirror(Path::new("/work/src/img/logo.png")).unwrap();
        assert_eq!(target, PathBuf::from("/work/tgt/img/logo.png"));
    }

    #[test]
    fn url_is_rooted_and_slash_separated() {
        let url = site()
            .url_for(Path::new("/work/tgt/blog/2024/03/hello.html"))
            .unwrap();
        assert_eq!(url, "/blog/2024/03/hello.html");
    }

    #[test]
    fn url_for_file_outside_target_is_error() {
        let err = site().url_for(Path::new("/elsewhere/x.html")).unwrap_err();
        assert!(matches!(err, PathError::OutsideRoot { .. }));
    }

    #[test]
    fn file_for_url_round_trips() {
        let s = site();
        let file = s.file_for_url("/blog/old.html");
        assert_eq!(file, PathBuf::from("/work/tgt/blog/old.html"));
        assert_eq!(s.url_for(&file).unwrap(), "/blog/old.html");
    }

    // =========================================================================
    // URL helpers
    // =========================================================================

    #[test]
    fn url_dir_of_nested_and_root_urls() {
        assert_eq!(url_dir("/blog/post.html"), "/blog");
        assert_eq!(url_dir("/index.html"), "/");
        assert_eq!(url_dir("index.html"), "/");
    }

    #[test]
    fn relative_url_climbs_out_of_nested_dirs() {
        assert_eq!(
            relative_url("/blog/2024/03", "/css/site.css"),
            "../../../css/site.css"
        );
    }

    #[test]
    fn relative_url_from_root() {
        assert_eq!(relative_url("/", "/about.html"), "about.html");
    }

    #[test]
    fn relative_url_within_same_dir() {
        assert_eq!(relative_url("/blog", "/blog/post.html"), "post.html");
        assert_eq!(relative_url("/blog", "/blog"), ".");
    }

    #[test]
    fn relative_url_leaves_external_links_alone() {
        assert_eq!(
            relative_url("/blog", "https://example.com/x"),
            "https://example.com/x"
        );
        assert_eq!(relative_url("/blog", "#top"), "#top");
    }
}
