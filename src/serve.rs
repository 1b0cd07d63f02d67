//! Preview server for a built site.
//!
//! A pass-through static file server over the target directory, built on
//! `tiny_http`. Requests resolve as:
//!
//! 1. Exact file match → serve file
//! 2. Directory with `index.html` → serve `index.html`
//! 3. Anything else → 404
//!
//! Redirect stubs are ordinary HTML files here; the browser follows their
//! `meta refresh`.

use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tiny_http::{Header, Request, Response, Server};
use tracing::{debug, info, warn};

use crate::config::ServeConfig;

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("failed to bind {address}: {message}")]
    Bind { address: String, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serve `root` until the process is stopped.
pub fn serve(root: &Path, config: &ServeConfig) -> Result<(), ServeError> {
    let address = config.socket_address();
    let server = Server::http(&address).map_err(|e| ServeError::Bind {
        address: address.clone(),
        message: e.to_string(),
    })?;
    info!("serving {} at http://{}", root.display(), address);

    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, root) {
            warn!("request error: {e}");
        }
    }
    Ok(())
}

fn handle_request(request: Request, root: &Path) -> Result<(), ServeError> {
    match resolve_request(root, request.url()) {
        Some(path) => {
            debug!("{} → {}", request.url(), path.display());
            let content = fs::read(&path)?;
            respond(request, 200, guess_content_type(&path), content)
        }
        None => {
            debug!("{} → 404", request.url());
            respond(request, 404, "text/plain", b"404 Not Found".to_vec())
        }
    }
}

fn respond(request: Request, status: u16, content_type: &str, body: Vec<u8>) -> Result<(), ServeError> {
    let mut response = Response::from_data(body).with_status_code(status);
    if let Ok(header) = Header::from_bytes("Content-Type", content_type) {
        response.add_header(header);
    }
    request.respond(response)?;
    Ok(())
}

/// Map a request URL onto a file under `root`.
///
/// Percent-escapes are decoded and the query string dropped. URLs that try
/// to climb out of `root` never resolve.
pub fn resolve_request(root: &Path, url: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(url).map(|s| s.into_owned()).ok()?;
    let without_query = decoded.split(['?', '#']).next().unwrap_or_default();
    let relative = Path::new(without_query.trim_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }

    let local = root.join(relative);
    if local.is_file() {
        return Some(local);
    }
    let index = local.join("index.html");
    if local.is_dir() && index.is_file() {
        return Some(index);
    }
    None
}

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
pub fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn site() -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("blog/2024")).unwrap();
        fs::write(tmp.path().join("index.html"), "home").unwrap();
        fs::write(tmp.path().join("blog/index.html"), "blog").unwrap();
        fs::write(tmp.path().join("blog/my post.html"), "post").unwrap();
        tmp
    }

    #[test]
    fn exact_file() {
        let tmp = site();
        assert_eq!(
            resolve_request(tmp.path(), "/blog/index.html"),
            Some(tmp.path().join("blog/index.html"))
        );
    }

    #[test]
    fn directory_resolves_to_index() {
        let tmp = site();
        assert_eq!(resolve_request(tmp.path(), "/"), Some(tmp.path().join("index.html")));
        assert_eq!(
            resolve_request(tmp.path(), "/blog/"),
            Some(tmp.path().join("blog/index.html"))
        );
    }

    #[test]
    fn directory_without_index_is_not_found() {
        let tmp = site();
        assert_eq!(resolve_request(tmp.path(), "/blog/2024"), None);
    }

    #[test]
    fn percent_escapes_and_query_handled() {
        let tmp = site();
        assert_eq!(
            resolve_request(tmp.path(), "/blog/my%20post.html?v=1"),
            Some(tmp.path().join("blog/my post.html"))
        );
    }

    #[test]
    fn traversal_rejected() {
        let tmp = site();
        assert_eq!(resolve_request(tmp.path(), "/../etc/passwd"), None);
        assert_eq!(resolve_request(tmp.path(), "/blog/%2e%2e/index.html"), None);
    }

    #[test]
    fn content_types() {
        assert_eq!(guess_content_type(Path::new("a.html")), "text/html; charset=utf-8");
        assert_eq!(guess_content_type(Path::new("a.css")), "text/css; charset=utf-8");
        assert_eq!(guess_content_type(Path::new("a.bin")), "application/octet-stream");
    }
}
