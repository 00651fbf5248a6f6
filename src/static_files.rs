//! Files under the docs assets directory.
//!
//! Paths are resolved component by component; anything other than plain
//! names (`..`, absolute roots, drive prefixes) is refused, so a request can
//! never escape the base directory.

use minijinja::Environment;
use serde_json::Value as JsonValue;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// A loaded asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

#[derive(Debug, Clone)]
pub struct StaticFiles {
    base_dir: PathBuf,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self { base_dir: base.into() }
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let mut pb = self.base_dir.clone();
        for comp in Path::new(url_path.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    fn content_type(path: &Path) -> &'static str {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "html" => "text/html; charset=utf-8",
            "css" => "text/css; charset=utf-8",
            "js" | "mjs" => "application/javascript",
            "json" | "map" => "application/json",
            "svg" => "image/svg+xml",
            "png" => "image/png",
            "woff2" => "font/woff2",
            "txt" => "text/plain; charset=utf-8",
            _ => "application/octet-stream",
        }
    }

    /// Whether `url_path` names an existing file inside the base directory.
    #[must_use]
    pub fn contains(&self, url_path: &str) -> bool {
        self.map_path(url_path).is_some_and(|p| p.is_file())
    }

    /// Read an asset. HTML files are rendered as minijinja templates when
    /// `ctx` is given.
    ///
    /// # Errors
    ///
    /// `NotFound` for refused or missing paths, other kinds for read and
    /// template failures.
    pub fn load(&self, url_path: &str, ctx: Option<&JsonValue>) -> io::Result<Asset> {
        let path = self
            .map_path(url_path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "invalid path"))?;
        if !path.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        }
        let content_type = Self::content_type(&path);
        if let (Some("html"), Some(ctx)) = (path.extension().and_then(|s| s.to_str()), ctx) {
            let source = fs::read_to_string(&path)?;
            let rendered = Environment::new()
                .render_str(&source, ctx)
                .map_err(io::Error::other)?;
            return Ok(Asset {
                bytes: rendered.into_bytes(),
                content_type,
            });
        }
        Ok(Asset {
            bytes: fs::read(&path)?,
            content_type,
        })
    }
}
