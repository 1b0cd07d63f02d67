//! CLI output formatting.
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects. Paths are shown relative to
//! the source or target root.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Pages
//! 001 Hello World
//!     Source: blog/2024-03-01-hello-world.md
//!     URL: /blog/2024/03/hello-world.html
//!     Redirects: 2
//! 002 index.html
//!     Source: index.html
//!     URL: /index.html
//! ```
//!
//! ## Build
//!
//! ```text
//! Rendered
//!     blog/2024/03/hello-world.html
//!     index.html
//! Copied
//!     css/site.css
//! Redirects
//!     blog/2024-03-01-hello-world.html
//!     blog/2024/03/01/hello-world.html
//!
//! Built 2 pages, 1 file copied, 2 redirects (3 ignored)
//! ```

use serde_json::Value;
use std::path::Path;

use crate::gather::Site;
use crate::metadata;
use crate::paths::SitePaths;
use crate::transform::BuildReport;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `path` relative to `root` with `/` separators, or as-is when outside it.
fn display_relative(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
        Err(_) => path.display().to_string(),
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{} {}", n, if n == 1 { one } else { many })
}

// ============================================================================
// check
// ============================================================================

/// Inventory of every page the build would render.
///
/// Each page leads with its title (blog title, front-matter `title`, or the
/// file name) followed by its source path and public URL.
pub fn format_site_index(site: &Site) -> Vec<String> {
    let mut lines = Vec::new();
    if site.pages().is_empty() {
        lines.push("No pages found".to_string());
        return lines;
    }

    lines.push("Pages".to_string());
    for (i, page) in site.pages().iter().enumerate() {
        let meta = site.metadata(page);
        let file_name = page
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let title = metadata::get_str(&meta, "title").unwrap_or(&file_name);

        lines.push(format!("{} {}", format_index(i + 1), title));
        lines.push(format!(
            "{}Source: {}",
            indent(1),
            display_relative(page, &site.paths().source)
        ));
        if let Some(url) = metadata::get_str(&meta, "url") {
            lines.push(format!("{}URL: {}", indent(1), url));
        }
        if let Some(Value::Array(redirects)) = meta.get("redirects")
            && !redirects.is_empty()
        {
            lines.push(format!("{}Redirects: {}", indent(1), redirects.len()));
        }
    }
    lines
}

/// Print the site inventory to stdout.
pub fn print_site_index(site: &Site) {
    for line in format_site_index(site) {
        println!("{}", line);
    }
}

// ============================================================================
// build
// ============================================================================

/// Summary of a finished build.
pub fn format_build_report(report: &BuildReport, paths: &SitePaths) -> Vec<String> {
    let mut lines = Vec::new();

    let sections = [
        ("Rendered", &report.rendered),
        ("Copied", &report.copied),
        ("Redirects", &report.redirects),
        ("Overwritten", &report.overwritten),
    ];
    for (heading, files) in sections {
        if files.is_empty() {
            continue;
        }
        lines.push(heading.to_string());
        for file in files {
            lines.push(format!("{}{}", indent(1), display_relative(file, &paths.target)));
        }
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }
    let mut summary = format!(
        "Built {}, {} copied, {}",
        plural(report.rendered.len(), "page", "pages"),
        plural(report.copied.len(), "file", "files"),
        plural(report.redirects.len(), "redirect", "redirects"),
    );
    if !report.ignored.is_empty() {
        summary.push_str(&format!(" ({} ignored)", report.ignored.len()));
    }
    lines.push(summary);
    lines
}

/// Print the build summary to stdout.
pub fn print_build_report(report: &BuildReport, paths: &SitePaths) {
    for line in format_build_report(report, paths) {
        println!("{}", line);
    }
}
