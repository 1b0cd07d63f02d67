//! The transform pass: turn every source file into its output.
//!
//! | Source | Output |
//! |--------|--------|
//! | `.json` | nothing (declarations only feed metadata) |
//! | `.source`, `.template` | nothing (reachable through imports) |
//! | `.html` | rendered against its metadata, written to its `target` |
//! | `.md` | rendered, converted, wrapped in its page template, written to its `target`, plus one redirect stub per entry in `redirects` |
//! | anything else | copied byte-for-byte to the mirrored path |
//!
//! The pass only borrows the [`Site`]; metadata is frozen by the time it
//! runs.
//!
//! Two sources can resolve to the same output, e.g. `notes.md` next to
//! `notes.html`, or a blog post's legacy redirect path next to a real page of
//! that name. The later write wins; every such target is logged and listed in
//! [`BuildReport::overwritten`].

use maud::{DOCTYPE, Markup, html};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::gather::Site;
use crate::metadata::{self, Metadata, MetadataError};
use crate::paths::{PathError, normalize};
use crate::render::{RenderError, Renderer};
use crate::walk::{FileKind, is_source_file, source_entries};

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} has no usable `target` in its metadata")]
    NoTarget(PathBuf),
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error(transparent)]
    Path(#[from] PathError),
}

/// What a build produced, in walk order. Paths are absolute.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BuildReport {
    /// Pages written from `.html` and `.md` sources (target paths).
    pub rendered: Vec<PathBuf>,
    /// Assets copied verbatim (target paths).
    pub copied: Vec<PathBuf>,
    /// Redirect stubs written for blog posts (target paths).
    pub redirects: Vec<PathBuf>,
    /// Declarations and fragments that produce no output (source paths).
    pub ignored: Vec<PathBuf>,
    /// Targets written more than once; the last source walked wins.
    pub overwritten: Vec<PathBuf>,
}

/// Target paths written so far in one pass.
#[derive(Debug, Default)]
struct Outputs {
    written: HashSet<PathBuf>,
}

impl Outputs {
    fn claim(&mut self, source: &Path, dst: &Path, report: &mut BuildReport) {
        if !self.written.insert(normalize(dst)) {
            warn!("{} overwrites {}, written earlier in this build", source.display(), dst.display());
            report.overwritten.push(dst.to_path_buf());
        }
    }
}

/// Run the transform pass over the whole source tree.
pub fn transform(site: &Site) -> Result<BuildReport, TransformError> {
    let paths = site.paths();
    debug!("transforming {} → {}", paths.source.display(), paths.target.display());
    let renderer = Renderer::new(&paths.source);
    let mut report = BuildReport::default();
    let mut outputs = Outputs::default();

    for entry in source_entries(paths) {
        let entry = entry?;
        if !is_source_file(&entry) {
            debug!("skipping {}", entry.path().display());
            continue;
        }
        let path = entry.path();

        match FileKind::of(path) {
            FileKind::Declaration | FileKind::Fragment => {
                debug!("{} ignored for transformation", path.display());
                report.ignored.push(path.to_path_buf());
            }
            FileKind::Html => {
                let (context, body) = page_input(site, path)?;
                let dst = target_of(path, &context)?;
                let output = renderer.render(path, &body, context)?;
                outputs.claim(path, &dst, &mut report);
                write_file(&dst, output.as_bytes())?;
                debug!("{} transformed to {}", path.display(), dst.display());
                report.rendered.push(dst);
            }
            FileKind::Markdown => {
                let (context, body) = page_input(site, path)?;
                let dst = target_of(path, &context)?;
                let redirects = redirects_of(site, path, &context);
                let output = renderer.render_markdown_page(path, &body, context)?;
                outputs.claim(path, &dst, &mut report);
                write_file(&dst, output.as_bytes())?;
                debug!("{} transformed to {}", path.display(), dst.display());
                report.rendered.push(dst);

                if let Some((canonical, files)) = redirects {
                    let stub = redirect_stub(&canonical).into_string();
                    for file in files {
                        outputs.claim(path, &file, &mut report);
                        write_file(&file, stub.as_bytes())?;
                        debug!("{} redirects to {}", file.display(), canonical);
                        report.redirects.push(file);
                    }
                }
            }
            FileKind::Asset => {
                let dst = paths.mirror(path)?;
                outputs.claim(path, &dst, &mut report);
                copy_file(path, &dst)?;
                debug!("{} transformed to {} verbatim", path.display(), dst.display());
                report.copied.push(dst);
            }
        }
    }

    info!(
        "transformed {} page(s), copied {} file(s), wrote {} redirect(s)",
        report.rendered.len(),
        report.copied.len(),
        report.redirects.len()
    );
    Ok(report)
}

/// Rendering context and front-matter-free body of a page.
fn page_input(site: &Site, path: &Path) -> Result<(Metadata, String), TransformError> {
    let content = fs::read_to_string(path).map_err(|source| TransformError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let (_, body) = metadata::front_matter(path, &content)?;
    Ok((site.context_for(path), body.to_string()))
}

fn target_of(path: &Path, context: &Metadata) -> Result<PathBuf, TransformError> {
    metadata::get_str(context, "target")
        .filter(|t| !t.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| TransformError::NoTarget(path.to_path_buf()))
}

/// The canonical `url` and one stub file per URL in `redirects`.
fn redirects_of(site: &Site, path: &Path, context: &Metadata) -> Option<(String, Vec<PathBuf>)> {
    let Some(Value::Array(redirects)) = context.get("redirects") else {
        return None;
    };
    let Some(canonical) = metadata::get_str(context, "url") else {
        warn!("{} has redirects but no url; skipping them", path.display());
        return None;
    };

    let files = redirects
        .iter()
        .filter_map(|redirect| {
            let from = redirect.as_str();
            if from.is_none() {
                warn!("{}: ignoring non-string redirect {}", path.display(), redirect);
            }
            from.map(|from| site.paths().file_for_url(from))
        })
        .collect();
    Some((canonical.to_string(), files))
}

/// Minimal page that sends browsers (and crawlers) to `url`.
pub fn redirect_stub(url: &str) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { "Redirecting…" }
                link rel="canonical" href=(url);
                meta http-equiv="refresh" content=(format!("0; url={url}"));
            }
            body {
                p { "Moved to " a href=(url) { (url) } "." }
            }
        }
    }
}

fn create_parent(path: &Path) -> Result<(), TransformError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| TransformError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), TransformError> {
    create_parent(path)?;
    fs::write(path, bytes).map_err(|source| TransformError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn copy_file(src: &Path, dst: &Path) -> Result<(), TransformError> {
    create_parent(dst)?;
    fs::copy(src, dst).map_err(|source| TransformError::Write {
        path: dst.to_path_buf(),
        source,
    })?;
    Ok(())
}
