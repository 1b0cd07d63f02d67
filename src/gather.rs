//! Metadata gathering: the first two passes over the source tree.
//!
//! ## Pass 1: directory declarations
//!
//! Every `.json` file is parsed and registered on the metadata stack at its
//! *containing directory*. Two declarations in one directory replace each
//! other; the lexically last one wins.
//!
//! ## Pass 2: per-file metadata
//!
//! Every `.html` and `.md` file gets its effective metadata computed as
//!
//! ```text
//! deep_merge(defaults, deep_merge(inherited, front_matter))
//! ```
//!
//! where `defaults` are generated from the path (see [`default_metadata`]),
//! `inherited` is the stack's cascade for that path and `front_matter` is the
//! file's own declaration block. The result is registered on the stack at the
//! file's own path and splatted into the Site Index.
//!
//! Within pass 2 only directory scopes are guaranteed visible: a file walked
//! earlier is not an ancestor of a file walked later, so file scopes never
//! leak sideways.
//!
//! ## Freezing
//!
//! [`gather_sources`] consumes the stack and returns a [`Site`], which has no
//! mutating methods. The transform pass only ever sees a `&Site`.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::metadata::{self, Metadata, MetadataError, deep_merge, splat_into};
use crate::naming::parse_blog_name;
use crate::paths::{PathError, SitePaths};
use crate::stack::MetadataStack;
use crate::walk::{FileKind, is_source_file, source_entries};

#[derive(Error, Debug)]
pub enum GatherError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error(transparent)]
    Path(#[from] PathError),
}

pub(crate) fn read_text(path: &Path) -> Result<String, GatherError> {
    fs::read_to_string(path).map_err(|source| GatherError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Fully gathered site: the cascade plus the Site Index. Read-only.
#[derive(Debug)]
pub struct Site {
    paths: SitePaths,
    stack: MetadataStack,
    index: Metadata,
    index_key: String,
    pages: Vec<PathBuf>,
}

impl Site {
    pub fn paths(&self) -> &SitePaths {
        &self.paths
    }

    /// Effective metadata of a file (its own scope included).
    pub fn metadata(&self, path: &Path) -> Metadata {
        self.stack.get(path)
    }

    /// Rendering context for a file: the Site Index under `index_key` as the
    /// lowest layer, the file's effective metadata on top.
    pub fn context_for(&self, path: &Path) -> Metadata {
        let mut base = Metadata::new();
        base.insert(self.index_key.clone(), Value::Object(self.index.clone()));
        deep_merge(base, self.metadata(path))
    }

    pub fn index(&self) -> &Metadata {
        &self.index
    }

    pub fn index_key(&self) -> &str {
        &self.index_key
    }

    /// Source paths of every publishable file, in walk order.
    pub fn pages(&self) -> &[PathBuf] {
        &self.pages
    }
}

/// Pass 1: register every directory declaration on a fresh stack.
pub fn gather_declarations(paths: &SitePaths) -> Result<MetadataStack, GatherError> {
    debug!("gathering declarations under {}", paths.source.display());
    let mut stack = MetadataStack::new();

    for entry in source_entries(paths) {
        let entry = entry?;
        if !is_source_file(&entry) || FileKind::of(entry.path()) != FileKind::Declaration {
            continue;
        }
        let path = entry.path();
        let declaration = metadata::parse_declaration(path, &read_text(path)?)?;
        let Some(dir) = path.parent() else {
            continue;
        };
        if stack.scope(dir).is_some() {
            warn!(
                "{} replaces an earlier declaration for {}",
                path.display(),
                dir.display()
            );
        }
        debug!("{} gathered ({} element(s))", path.display(), declaration.len());
        stack.add(dir, declaration);
    }

    info!("gathered {} directory declaration(s)", stack.len());
    Ok(stack)
}

/// Pass 2: compute per-file metadata and build the Site Index.
pub fn gather_sources(
    paths: &SitePaths,
    mut stack: MetadataStack,
    index_key: &str,
) -> Result<Site, GatherError> {
    debug!("gathering sources under {}", paths.source.display());
    let mut index = Metadata::new();
    let mut pages = Vec::new();

    for entry in source_entries(paths) {
        let entry = entry?;
        let kind = FileKind::of(entry.path());
        if !is_source_file(&entry) || !kind.is_publishable() {
            continue;
        }
        let path = entry.path();

        let defaults = default_metadata(paths, path, kind)?;
        let content = read_text(path)?;
        let (front, _body) = metadata::front_matter(path, &content)?;
        let inherited = stack.get(path);
        let effective = deep_merge(defaults, deep_merge(inherited, front));

        debug!("{} gathered ({} element(s))", path.display(), effective.len());
        splat_into(&mut index, &paths.source_relative(path)?, effective.clone());
        stack.add(path, effective);
        pages.push(path.to_path_buf());
    }

    info!("gathered {} page(s)", pages.len());
    Ok(Site {
        paths: paths.clone(),
        stack,
        index,
        index_key: index_key.to_string(),
        pages,
    })
}

/// Generated metadata for a publishable file, before any cascade.
///
/// | key | value |
/// |-----|-------|
/// | `source` | absolute source path |
/// | `target` | absolute output path (`.md` → `.html`) |
/// | `url` | `/` + target relative to the target root |
/// | `sortkey` | file name |
///
/// Blog-convention Markdown replaces `target` and `url` with the date-nested
/// layout and adds `title`, `date` and `redirects` (legacy URLs).
pub fn default_metadata(
    paths: &SitePaths,
    path: &Path,
    kind: FileKind,
) -> Result<Metadata, PathError> {
    let extension = match kind {
        FileKind::Markdown => "html".to_string(),
        _ => path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    let target = paths.target_file_for(path, &extension)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut defaults = Metadata::new();
    defaults.insert("source".into(), path.display().to_string().into());
    defaults.insert("target".into(), target.display().to_string().into());
    defaults.insert("url".into(), paths.url_for(&target)?.into());
    defaults.insert("sortkey".into(), file_name.into());

    if kind == FileKind::Markdown
        && let Some(post) = parse_blog_name(path, "html")
    {
        let source_dir = path.parent().unwrap_or(&paths.source);
        let base_dir = paths.mirror(source_dir)?;
        let target = post.target_file_for(&base_dir);
        let redirects = post
            .redirect_from_files(&base_dir)
            .iter()
            .map(|file| paths.url_for(file).map(Value::from))
            .collect::<Result<Vec<Value>, PathError>>()?;

        defaults.insert("title".into(), post.title.clone().into());
        defaults.insert("date".into(), post.date_string().into());
        defaults.insert("target".into(), target.display().to_string().into());
        defaults.insert("url".into(), paths.url_for(&target)?.into());
        defaults.insert("redirects".into(), Value::Array(redirects));
    }

    Ok(defaults)
}
