//! # Cascade
//!
//! A static site builder whose configuration is the directory tree itself.
//! JSON files declare metadata for the directory they live in, every page can
//! override it with a front-matter block, and every page sees the metadata of
//! every other page through the Site Index.
//!
//! # Architecture: Three Ordered Passes
//!
//! ```text
//! 1. Declarations   src/**/*.json        →  MetadataStack   (directory scopes)
//! 2. Sources        src/**/*.{html,md}   →  Site            (file scopes + Site Index)
//! 3. Transform      src/**               →  tgt/            (rendered pages, copies, redirects)
//! ```
//!
//! Pass 1 finishes before pass 2 starts, so every page inherits from every
//! directory declaration regardless of walk order. Pass 2 finishes before pass
//! 3 starts, so every page can list every other page. Pass 3 only borrows the
//! gathered [`gather::Site`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`paths`] | Source → target → URL mapping, relative URLs |
//! | [`metadata`] | Metadata values, deep merge, front-matter split |
//! | [`stack`] | Path-scoped metadata with ancestor cascade |
//! | [`naming`] | `YYYY-MM-DD-slug.md` blog convention |
//! | [`walk`] | Deterministic source walk shared by all passes |
//! | [`gather`] | Passes 1 and 2 |
//! | [`render`] | Tera rendering with imports, `sorted`, `relative` |
//! | [`markdown`] | Markdown → HTML with heading IDs, autolinks and TOC |
//! | [`transform`] | Pass 3 |
//! | [`build`] | The passes wired together |
//! | [`config`] | `cascade.toml` loading and validation |
//! | [`output`] | CLI output formatting |
//! | [`serve`] | Preview server for the built tree |
//!
//! # Precedence
//!
//! From lowest to highest, a page's rendering context is built from:
//!
//! ```text
//! Site Index (under `files`)
//!   < generated defaults (source, target, url, sortkey, blog fields)
//!     < directory declarations, outermost first
//!       < the page's own front matter
//! ```
//!
//! Mappings merge key by key at every depth; anything else is replaced.

pub mod build;
pub mod config;
pub mod gather;
pub mod markdown;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod paths;
pub mod render;
pub mod serve;
pub mod stack;
pub mod transform;
pub mod walk;

#[cfg(test)]
pub(crate) mod test_helpers;
