//! Metadata values and the operations that combine them.
//!
//! Metadata is a JSON object: string keys mapping to strings, booleans,
//! numbers, nested objects or arrays. It arrives from three places:
//!
//! - **Directory declarations**: any `.json` file, scoped to its directory.
//! - **Front-matter**: a JSON object at the top of a content file, ended by a
//!   line containing only `---`.
//! - **Generated defaults**: `source`, `target`, `url`, `sortkey` and, for
//!   blog posts, `title`, `date` and `redirects`.
//!
//! ## Merge rules
//!
//! [`deep_merge`] overlays one mapping on another. Nested objects are merged
//! key by key; every other value (scalars and arrays) is replaced wholesale by
//! the overlay. Keys only present in the base survive.
//!
//! ```text
//! base     {"site": {"name": "x", "lang": "en"}, "tags": ["a"]}
//! overlay  {"site": {"name": "y"},               "tags": ["b"]}
//! result   {"site": {"name": "y", "lang": "en"}, "tags": ["b"]}
//! ```

use serde_json::Value;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// A metadata mapping. Key order is irrelevant.
pub type Metadata = serde_json::Map<String, Value>;

/// Line that ends a front-matter block.
pub const FRONT_SEPARATOR: &str = "---";

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("invalid declaration in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("declaration in {0} must be a JSON object")]
    NotAnObject(PathBuf),
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Objects are merged key-by-key (overlay keys override base keys).
/// - Non-object values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_value(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            Value::Object(deep_merge(base_map, overlay_map))
        }
        (_, overlay) => overlay,
    }
}

/// Merge two mappings, `overlay` taking precedence. See [`merge_value`].
pub fn deep_merge(mut base: Metadata, overlay: Metadata) -> Metadata {
    for (key, overlay_val) in overlay {
        let merged = match base.remove(&key) {
            Some(base_val) => merge_value(base_val, overlay_val),
            None => overlay_val,
        };
        base.insert(key, merged);
    }
    base
}

/// Parse declaration text into a mapping. Blank text is an empty mapping.
///
/// `path` only labels errors.
pub fn parse_declaration(path: &Path, text: &str) -> Result<Metadata, MetadataError> {
    if text.trim().is_empty() {
        return Ok(Metadata::new());
    }
    let value: Value = serde_json::from_str(text).map_err(|source| MetadataError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(MetadataError::NotAnObject(path.to_path_buf())),
    }
}

/// Split file content into `(front_matter, body)`.
///
/// The front-matter is everything before the first line that is exactly
/// `---`, provided that text is blank or opens a JSON object. Anything else
/// (no separator, or prose before a Markdown horizontal rule) means the
/// whole content is body.
///
/// ```text
/// {"title": "Hi"}        ← front-matter
/// ---
/// # Body                 ← body
/// ```
pub fn split_front_matter(content: &str) -> (Option<&str>, &str) {
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let bare = line.trim_end_matches('\n').trim_end_matches('\r');
        if bare == FRONT_SEPARATOR {
            let head = &content[..offset];
            let trimmed = head.trim_start();
            // `{{`, `{%` and `{#` open template tags, never a JSON object
            let json_object = trimmed.starts_with('{')
                && !matches!(trimmed.as_bytes().get(1), Some(b'{' | b'%' | b'#'));
            if trimmed.is_empty() || json_object {
                return (Some(head), &content[offset + line.len()..]);
            }
            break;
        }
        offset += line.len();
    }
    (None, content)
}

/// Read a content file's front-matter as a mapping, returning it with the body.
pub fn front_matter<'a>(
    path: &Path,
    content: &'a str,
) -> Result<(Metadata, &'a str), MetadataError> {
    match split_front_matter(content) {
        (Some(head), body) => Ok((parse_declaration(path, head)?, body)),
        (None, body) => Ok((Metadata::new(), body)),
    }
}

/// Insert `metadata` into `index` at the nested position named by the
/// segments of `relative`.
///
/// `blog/2024-03-01-hello.md` lands at `index["blog"]["2024-03-01-hello.md"]`.
/// Intermediate segments become objects, replacing any non-object value in
/// the way.
pub fn splat_into(index: &mut Metadata, relative: &Path, metadata: Metadata) {
    let segments: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    let Some((leaf, dirs)) = segments.split_last() else {
        return;
    };

    let mut node = index;
    for dir in dirs {
        let slot = node
            .entry(dir.clone())
            .or_insert_with(|| Value::Object(Metadata::new()));
        if !slot.is_object() {
            *slot = Value::Object(Metadata::new());
        }
        let Some(map) = slot.as_object_mut() else {
            return;
        };
        node = map;
    }
    node.insert(leaf.clone(), Value::Object(metadata));
}

/// Look up a string value.
pub fn get_str<'a>(metadata: &'a Metadata, key: &str) -> Option<&'a str> {
    metadata.get(key).and_then(Value::as_str)
}

/// Look up a flag. Only a JSON `true` counts as set.
pub fn get_flag(metadata: &Metadata, key: &str) -> bool {
    matches!(metadata.get(key), Some(Value::Bool(true)))
}
