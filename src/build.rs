//! The build pipeline: three ordered passes over one source tree.
//!
//! ```text
//! 1. gather_declarations   *.json            → MetadataStack
//! 2. gather_sources        *.html, *.md      → Site (stack + Site Index)
//! 3. transform             everything        → target tree
//! ```
//!
//! Each pass completes before the next starts; the first error aborts the
//! build. Nothing is global, so independent builds can run in one process.
//!
//! The roots are compared after normalization and symlink resolution, so a
//! target spelled `other/../src` is still recognized as the source.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::config::BuildConfig;
use crate::gather::{GatherError, Site, gather_declarations, gather_sources};
use crate::paths::{PathError, SitePaths};
use crate::transform::{BuildReport, TransformError, transform};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("source directory {0} does not exist")]
    MissingSource(PathBuf),
    #[error("target directory {0} is the source directory")]
    TargetIsSource(PathBuf),
    #[error("source directory {0} lies inside target directory {1}")]
    SourceInsideTarget(PathBuf, PathBuf),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Gather(#[from] GatherError),
    #[error(transparent)]
    Transform(#[from] TransformError),
}

fn site_paths(config: &BuildConfig) -> Result<SitePaths, BuildError> {
    let paths = SitePaths::new(&config.source, &config.target)?;
    if !paths.source.is_dir() {
        return Err(BuildError::MissingSource(paths.source));
    }
    let roots = [
        (paths.source.clone(), paths.target.clone()),
        (resolved(&paths.source), resolved(&paths.target)),
    ];
    if roots.iter().any(|(source, target)| source == target) {
        return Err(BuildError::TargetIsSource(paths.target));
    }
    if roots.iter().any(|(source, target)| source.starts_with(target)) {
        return Err(BuildError::SourceInsideTarget(paths.source, paths.target));
    }
    Ok(paths)
}

/// Symlinks resolved when the directory exists, the lexical path otherwise.
fn resolved(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Passes 1 and 2 only: the gathered site, nothing written.
pub fn check(config: &BuildConfig) -> Result<Site, BuildError> {
    let paths = site_paths(config)?;
    let stack = gather_declarations(&paths)?;
    Ok(gather_sources(&paths, stack, &config.index_key)?)
}

/// Run all three passes.
pub fn build(config: &BuildConfig) -> Result<BuildReport, BuildError> {
    let site = check(config)?;
    info!(
        "building {} → {}",
        site.paths().source.display(),
        site.paths().target.display()
    );
    Ok(transform(&site)?)
}
