//! Destinations for downloaded files

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use fileshare_core::{ClientError, Result};

/// Fallback name when the response does not name the file
pub const DEFAULT_FILENAME: &str = "downloaded_file";

/// Trait for saving a downloaded payload on the client side
pub trait DownloadSink: Send + Sync {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<()>;
}

/// Saves downloads into a directory, created on first use
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<()> {
        // Never let a server-chosen name escape the download directory
        let name = Path::new(filename)
            .file_name()
            .map(|n| n.to_owned())
            .unwrap_or_else(|| DEFAULT_FILENAME.into());

        std::fs::create_dir_all(&self.dir).map_err(|e| ClientError::Storage(e.to_string()))?;
        let path = self.dir.join(name);
        std::fs::write(&path, bytes).map_err(|e| ClientError::Storage(e.to_string()))?;

        tracing::info!(path = %path.display(), size = bytes.len(), "Saved download");
        Ok(())
    }
}

/// Keeps downloads in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    saved: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything saved so far, oldest first
    pub fn saved(&self) -> Vec<(String, Vec<u8>)> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DownloadSink for MemorySink {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<()> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((filename.to_string(), bytes.to_vec()));
        Ok(())
    }
}

/// Extract the quoted filename from a `Content-Disposition` header value
pub fn filename_from_disposition(header: Option<&str>) -> String {
    header
        .and_then(|value| {
            let start = value.find("filename=\"")? + "filename=\"".len();
            let rest = &value[start..];
            let end = rest.find('"')?;
            Some(&rest[..end])
        })
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_FILENAME)
        .to_string()
}
