//! Shared test utilities: a throwaway source/target pair on disk.
//!
//! ```rust
//! use crate::test_helpers::Fixture;
//!
//! let fx = Fixture::new();
//! fx.write("blog/site.json", r#"{"section": "blog"}"#);
//! fx.write("blog/2024-03-01-hello.md", "Hello");
//!
//! let report = build(&fx.config()).unwrap();
//! assert!(fx.tgt("blog/2024/03/hello.html").exists());
//! ```

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::config::BuildConfig;
use crate::paths::SitePaths;

pub struct Fixture {
    _tmp: TempDir,
    pub paths: SitePaths,
}

impl Fixture {
    /// Empty `src/` next to a not-yet-existing `tgt/`.
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src");
        fs::create_dir_all(&source).unwrap();
        let paths = SitePaths::new(&source, &tmp.path().join("tgt")).unwrap();
        Self { _tmp: tmp, paths }
    }

    /// Write a source file, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.src(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    pub fn src(&self, rel: &str) -> PathBuf {
        self.paths.source.join(rel)
    }

    pub fn tgt(&self, rel: &str) -> PathBuf {
        self.paths.target.join(rel)
    }

    /// Read an output file. Panics with the missing path on failure.
    pub fn output(&self, rel: &str) -> String {
        let path = self.tgt(rel);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("output {} not readable: {e}", path.display()))
    }

    /// Build config pointing at this fixture's directories.
    pub fn config(&self) -> BuildConfig {
        BuildConfig {
            source: self.paths.source.clone(),
            target: self.paths.target.clone(),
            ..BuildConfig::default()
        }
    }
}
