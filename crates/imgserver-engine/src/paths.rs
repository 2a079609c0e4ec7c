//! Cache path resolution
//!
//! File names under the data directory are a persisted contract: existing caches are
//! found again only as long as these names do not change.

use std::io;
use std::path::{Path, PathBuf};

use imgserver_core::{DerivedKey, ImageFormat};

pub const ORIGINAL_DIRECTORY: &str = "pictures";
pub const CACHE_DIRECTORY: &str = "cache";

/// Location of a derived file, absolute for I/O and relative to the data directory for
/// handing back to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePath {
    pub absolute: PathBuf,
    pub relative: String,
}

#[derive(Debug, Clone)]
pub struct CachePathResolver {
    data_directory: PathBuf,
}

impl CachePathResolver {
    pub fn new(data_directory: impl Into<PathBuf>) -> Self {
        Self {
            data_directory: data_directory.into(),
        }
    }

    pub fn data_directory(&self) -> &Path {
        &self.data_directory
    }

    pub fn original_directory(&self) -> PathBuf {
        self.data_directory.join(ORIGINAL_DIRECTORY)
    }

    pub fn cache_directory(&self) -> PathBuf {
        self.data_directory.join(CACHE_DIRECTORY)
    }

    /// Create both directories if missing.
    pub fn ensure_directories(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.original_directory())?;
        std::fs::create_dir_all(self.cache_directory())?;
        Ok(())
    }

    /// `<data>/pictures/<id>.<ext>`
    pub fn original_path(&self, id: &str, format: ImageFormat) -> PathBuf {
        self.original_directory()
            .join(format!("{}.{}", id, format.extension()))
    }

    /// `<data>/cache/<id>-<w>x<h>.<ext>`
    pub fn derived_path(&self, key: &DerivedKey) -> CachePath {
        let file_name = format!(
            "{}-{}x{}.{}",
            key.original_id,
            key.size.width,
            key.size.height,
            key.format.extension()
        );
        CachePath {
            absolute: self.cache_directory().join(&file_name),
            relative: format!("{}/{}", CACHE_DIRECTORY, file_name),
        }
    }

    /// Map a relative path previously returned by [`derived_path`](Self::derived_path) back
    /// to an absolute one.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.data_directory.join(relative)
    }
}
