//! Filename parsing for the `YYYY-MM-DD-slug` blog convention.
//!
//! A Markdown file whose stem starts with a calendar date followed by a dash is
//! a blog post. Everything after the date is the slug:
//!
//! - `2024-03-01-hello-world.md` → date 2024-03-01, slug `hello-world`,
//!   title "Hello World"
//! - `2023-12-31-year_in_review.md` → slug `year_in_review`, title "Year In Review"
//! - `notes.md`, `2024-13-01-bad-month.md`, `2024-03-01.md` → no match
//!
//! A non-match is an ordinary outcome: the caller falls back to generic
//! handling. It is never an error.
//!
//! ## Output layout
//!
//! Posts are nested by year and month under the directory that mirrors the
//! post's source directory, so `blog/2024-03-01-hello-world.md` is published
//! at `blog/2024/03/hello-world.html`.
//!
//! Two earlier layouts get redirect stubs pointing at the canonical page:
//!
//! ```text
//! blog/2024-03-01-hello-world.html     flat, the generic Markdown target
//! blog/2024/03/01/hello-world.html     nested down to the day
//! ```

use chrono::{Datelike, NaiveDate};
use std::path::{Path, PathBuf};

/// Result of parsing a blog-convention file name.
#[derive(Debug, Clone, PartialEq)]
pub struct BlogTuple {
    pub date: NaiveDate,
    /// Raw slug after the date, separators preserved.
    pub slug: String,
    /// Display title: slug words capitalized and joined with spaces.
    pub title: String,
    /// Output extension without the dot, e.g. `html`.
    pub extension: String,
}

/// Parse `path`'s file stem as `YYYY-MM-DD-slug`.
///
/// `extension` is the extension output files should carry. Returns `None`
/// when the name does not follow the convention or the date is not a real
/// calendar day.
pub fn parse_blog_name(path: &Path, extension: &str) -> Option<BlogTuple> {
    let stem = path.file_stem()?.to_str()?;
    let mut parts = stem.splitn(4, '-');
    let year = parts.next()?;
    let month = parts.next()?;
    let day = parts.next()?;
    let slug = parts.next()?;

    let digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(year, 4) || !digits(month, 2) || !digits(day, 2) || slug.is_empty() {
        return None;
    }
    let date = NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)?;

    Some(BlogTuple {
        date,
        slug: slug.to_string(),
        title: title_from_slug(slug),
        extension: extension.trim_start_matches('.').to_string(),
    })
}

/// `hello-world` → `Hello World`. Both `-` and `_` separate words.
pub fn title_from_slug(slug: &str) -> String {
    slug.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

impl BlogTuple {
    /// Canonical date string, ISO 8601 (`2024-03-01`).
    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    fn file_name(&self) -> String {
        format!("{}.{}", self.slug, self.extension)
    }

    /// Canonical output file: `<base>/YYYY/MM/<slug>.<ext>`.
    pub fn target_file_for(&self, base_dir: &Path) -> PathBuf {
        base_dir
            .join(format!("{:04}", self.date.year()))
            .join(format!("{:02}", self.date.month()))
            .join(self.file_name())
    }

    /// Output files of earlier layouts that should redirect to the canonical one.
    pub fn redirect_from_files(&self, base_dir: &Path) -> Vec<PathBuf> {
        vec![
            base_dir.join(format!("{}-{}", self.date_string(), self.file_name())),
            base_dir
                .join(format!("{:04}", self.date.year()))
                .join(format!("{:02}", self.date.month()))
                .join(format!("{:02}", self.date.day()))
                .join(self.file_name()),
        ]
    }
}
