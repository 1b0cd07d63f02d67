//! Template rendering with Tera.
//!
//! Every `.html` page, every Markdown body and every page template is a Tera
//! template rendered against the page's metadata. On top of Tera's builtins,
//! templates get:
//!
//! | Name | Kind | Purpose |
//! |------|------|---------|
//! | `importhtml(path=…)` | function | render another file and embed it as HTML |
//! | `importcss(path=…)` | function | same, for a stylesheet fragment |
//! | `importjs(path=…)` | function | same, for a script fragment |
//! | `sorted` | filter | values of a mapping ordered by their `sortkey` |
//! | `relative(url=…)` | function | site URL rewritten relative to the current page |
//!
//! Import paths are relative to the directory of the template doing the
//! importing, and the imported file is rendered with the *same* metadata.
//! Imported output is trusted and never re-escaped.
//!
//! A top-level render builds one Tera context from the page's metadata, Site
//! Index included, and every import below it shares that context.
//!
//! ## Escaping
//!
//! Templates named `*.html`, `*.htm`, `*.xml` or `*.template` autoescape
//! interpolated values. Markdown bodies and CSS/JS fragments do not. Page
//! templates emit the converted Markdown with `{{ content | safe }}`; a bare
//! `{{ content }}` would escape the HTML a second time, so it is logged as a
//! warning.
//!
//! ## Undefined variables
//!
//! Referencing a key the page's metadata does not have is an error, not an
//! empty string. Shared templates that only some pages fill in should say so:
//!
//! ```text
//! <title>{{ title | default(value="") }}</title>
//! {% if subtitle %}<h2>{{ subtitle }}</h2>{% endif %}
//! ```
//!
//! ## Cycles
//!
//! The chain of files currently being rendered is carried into every import.
//! Importing a file that is already on the chain fails with
//! [`RenderError::Cycle`] instead of recursing forever.
//!
//! ## Markdown pages
//!
//! ```text
//! body ──render──▶ markdown ──convert──▶ html ──{content}──▶ page template ──render──▶ output
//! ```
//!
//! The page template comes from the `template` metadata key (relative to the
//! source root) or, failing that, the nearest `default.template` above the
//! page.

use serde_json::Value;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tera::{Context as TeraContext, Tera};
use thiserror::Error;
use tracing::{debug, warn};

use crate::markdown::{MarkdownOptions, render_markdown};
use crate::metadata::{self, Metadata};
use crate::paths::{normalize, relative_url, url_dir};

/// Fallback page template for Markdown, searched upwards from the page.
pub const DEFAULT_TEMPLATE: &str = "default.template";

/// Suffixes of template names that get HTML autoescaping.
const AUTOESCAPE_SUFFIXES: &[&str] = &[".html", ".htm", ".xml", ".template"];

/// `{{ content }}` with no filter at all.
static BARE_CONTENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{-?\s*content\s*-?\}\}").expect("valid regex"));

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("template {path}: {message}")]
    Template { path: PathBuf, message: String },
    #[error("import cycle: {}", format_chain(.0))]
    Cycle(Vec<PathBuf>),
    #[error("no page template for {0} (set `template` or add a {DEFAULT_TEMPLATE})")]
    NoTemplate(PathBuf),
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" → ")
}

impl RenderError {
    /// Rebuild an error found by reference inside a Tera error chain.
    fn duplicate(&self) -> RenderError {
        match self {
            RenderError::Read { path, source } => RenderError::Read {
                path: path.clone(),
                source: std::io::Error::new(source.kind(), source.to_string()),
            },
            RenderError::Template { path, message } => RenderError::Template {
                path: path.clone(),
                message: message.clone(),
            },
            RenderError::Cycle(chain) => RenderError::Cycle(chain.clone()),
            RenderError::NoTemplate(path) => RenderError::NoTemplate(path.clone()),
        }
    }

    /// Convert a Tera failure for `path`.
    ///
    /// Errors raised by a nested import travel through Tera as a source; the
    /// innermost cause is surfaced as-is so a missing file three imports deep
    /// is still reported as a read failure of that file.
    fn from_tera(path: &Path, error: &tera::Error) -> RenderError {
        use std::error::Error as _;

        let mut current: Option<&(dyn std::error::Error + 'static)> = error.source();
        while let Some(err) = current {
            if let Some(inner) = err.downcast_ref::<RenderError>() {
                return inner.duplicate();
            }
            current = err.source();
        }
        RenderError::Template {
            path: path.to_path_buf(),
            message: format_tera_error(error),
        }
    }
}

/// Flatten a Tera error chain into one line.
pub fn format_tera_error(error: &tera::Error) -> String {
    use std::error::Error as _;

    let mut messages = vec![error.to_string()];
    let mut current = error.source();
    while let Some(err) = current {
        messages.push(err.to_string());
        current = err.source();
    }
    messages.dedup();
    messages.join(": ")
}

/// The three import functions differ only in name; all embed trusted output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFlavor {
    Html,
    Css,
    Js,
}

impl ImportFlavor {
    pub const ALL: [ImportFlavor; 3] = [ImportFlavor::Html, ImportFlavor::Css, ImportFlavor::Js];

    pub fn function_name(self) -> &'static str {
        match self {
            ImportFlavor::Html => "importhtml",
            ImportFlavor::Css => "importcss",
            ImportFlavor::Js => "importjs",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    source_root: PathBuf,
}

impl Renderer {
    pub fn new(source_root: &Path) -> Self {
        Self {
            source_root: normalize(source_root),
        }
    }

    /// Render `body` as the template at `path` against `metadata`.
    pub fn render(&self, path: &Path, body: &str, metadata: Metadata) -> Result<String, RenderError> {
        let context = page_context(path, metadata)?;
        self.render_chain(path, body, &context, Vec::new())
    }

    fn render_chain(
        &self,
        path: &Path,
        body: &str,
        context: &Arc<TeraContext>,
        mut chain: Vec<PathBuf>,
    ) -> Result<String, RenderError> {
        let path = normalize(path);
        if chain.contains(&path) {
            chain.push(path);
            return Err(RenderError::Cycle(chain));
        }
        chain.push(path.clone());

        let name = self.template_name(&path);
        let base_dir = path.parent().unwrap_or(&self.source_root).to_path_buf();
        let page_url = context
            .get("url")
            .and_then(Value::as_str)
            .unwrap_or("/")
            .to_string();

        let mut tera = Tera::default();
        tera.autoescape_on(AUTOESCAPE_SUFFIXES.to_vec());
        for flavor in ImportFlavor::ALL {
            tera.register_function(
                flavor.function_name(),
                ImportFunction {
                    flavor,
                    renderer: self.clone(),
                    base_dir: base_dir.clone(),
                    context: Arc::clone(context),
                    chain: chain.clone(),
                },
            );
        }
        tera.register_function(
            "relative",
            RelativeFunction {
                from_dir: url_dir(&page_url).to_string(),
            },
        );
        tera.register_filter("sorted", sorted_filter);

        tera.add_raw_template(&name, body)
            .map_err(|e| RenderError::from_tera(&path, &e))?;
        let output = tera
            .render(&name, context)
            .map_err(|e| RenderError::from_tera(&path, &e))?;

        debug!("rendered {} ({} byte(s))", name, output.len());
        Ok(output)
    }

    /// Name used for error messages and autoescape decisions.
    fn template_name(&self, path: &Path) -> String {
        match path.strip_prefix(&self.source_root) {
            Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
            Err(_) => path.display().to_string(),
        }
    }

    /// Two-stage Markdown rendering, finished by the page template.
    pub fn render_markdown_page(
        &self,
        path: &Path,
        body: &str,
        metadata: Metadata,
    ) -> Result<String, RenderError> {
        let options = MarkdownOptions {
            toc: metadata::get_flag(&metadata, "toc"),
        };
        let template_path = self.resolve_template(path, &metadata)?;
        let mut context = page_context(path, metadata)?;

        let markdown = self.render_chain(path, body, &context, Vec::new())?;
        debug!("converting {} byte(s) of Markdown from {}", markdown.len(), path.display());
        let html = render_markdown(&markdown, options);
        // imports of the body render are dropped by now, so this does not copy
        Arc::make_mut(&mut context).insert("content", &html);

        let template_body = read_file(&template_path)?;
        if escapes_content(&template_path, &template_body) {
            warn!(
                "{} prints `{{{{ content }}}}` without `| safe`; the page HTML will be escaped",
                template_path.display()
            );
        }
        self.render_chain(&template_path, &template_body, &context, Vec::new())
    }

    /// The page template for a Markdown file.
    pub fn resolve_template(&self, page: &Path, metadata: &Metadata) -> Result<PathBuf, RenderError> {
        if let Some(name) = metadata::get_str(metadata, "template") {
            return Ok(normalize(&self.source_root.join(name)));
        }
        let page = normalize(page);
        for dir in page.ancestors().skip(1) {
            if !dir.starts_with(&self.source_root) {
                break;
            }
            let candidate = dir.join(DEFAULT_TEMPLATE);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        Err(RenderError::NoTemplate(page))
    }
}

fn page_context(path: &Path, metadata: Metadata) -> Result<Arc<TeraContext>, RenderError> {
    TeraContext::from_value(Value::Object(metadata))
        .map(Arc::new)
        .map_err(|e| RenderError::from_tera(path, &e))
}

/// Whether a page template would autoescape the converted Markdown.
pub fn escapes_content(template: &Path, body: &str) -> bool {
    let name = template.to_string_lossy();
    AUTOESCAPE_SUFFIXES.iter().any(|s| name.ends_with(s)) && BARE_CONTENT.is_match(body)
}

fn read_file(path: &Path) -> Result<String, RenderError> {
    fs::read_to_string(path).map_err(|source| RenderError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn string_arg<'a>(args: &'a HashMap<String, Value>, names: &[&str], function: &str) -> tera::Result<&'a str> {
    names
        .iter()
        .find_map(|n| args.get(*n))
        .and_then(Value::as_str)
        .ok_or_else(|| tera::Error::msg(format!("{function} requires a string `{}` argument", names[0])))
}

/// `importhtml` / `importcss` / `importjs`.
struct ImportFunction {
    flavor: ImportFlavor,
    renderer: Renderer,
    base_dir: PathBuf,
    context: Arc<TeraContext>,
    chain: Vec<PathBuf>,
}

impl ImportFunction {
    fn import(&self, relative: &str) -> Result<String, RenderError> {
        let file = normalize(&self.base_dir.join(relative));
        debug!("{} {}", self.flavor.function_name(), file.display());
        let body = read_file(&file)?;
        self.renderer
            .render_chain(&file, &body, &self.context, self.chain.clone())
    }
}

impl tera::Function for ImportFunction {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let name = self.flavor.function_name();
        let relative = string_arg(args, &["path", "file"], name)?;
        self.import(relative)
            .map(Value::String)
            .map_err(|e| tera::Error::chain(format!("{name}(\"{relative}\") failed"), e))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

/// `relative(url="/css/site.css")` → path relative to the page's URL directory.
struct RelativeFunction {
    from_dir: String,
}

impl tera::Function for RelativeFunction {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let url = string_arg(args, &["url", "path"], "relative")?;
        Ok(Value::String(relative_url(&self.from_dir, url)))
    }
}

fn compare_sortkeys(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => {
            let text = |v: &Value| v.as_str().map(String::from).unwrap_or_else(|| v.to_string());
            text(a).cmp(&text(b))
        }
    }
}

/// Values of a mapping that carry a `sortkey`, ascending, stable for ties.
///
/// Entries without a `sortkey` (sub-directory nodes of the Site Index) are
/// skipped.
pub fn sorted_values(map: &Metadata) -> Vec<Value> {
    let mut values: Vec<&Value> = map
        .values()
        .filter(|v| v.get("sortkey").is_some())
        .collect();
    values.sort_by(|a, b| compare_sortkeys(&a["sortkey"], &b["sortkey"]));
    values.into_iter().cloned().collect()
}

fn sorted_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let map = value
        .as_object()
        .ok_or_else(|| tera::Error::msg("sorted expects a mapping"))?;
    Ok(Value::Array(sorted_values(map)))
}
