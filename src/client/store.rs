//! On-disk persistence for the license token.
//!
//! The token file is the source of truth for license state between runs;
//! the engine reads a fresh copy on every operation rather than caching it
//! in memory. The store is a thin facade over the filesystem with the
//! NotFound cases folded into `Option` / no-ops.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::errors::LicenseResult;

/// File name of the stored license token within the license directory.
pub const TOKEN_FILE_NAME: &str = "license-token.mb";

/// Manages `{license_dir}/license-token.mb`.
#[derive(Debug, Clone)]
pub struct TokenStore {
    dir: PathBuf,
    path: PathBuf,
}

impl TokenStore {
    pub fn new(license_dir: impl Into<PathBuf>) -> Self {
        let dir = license_dir.into();
        let path = dir.join(TOKEN_FILE_NAME);
        Self { dir, path }
    }

    /// Full path of the managed token file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the license directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> LicenseResult<()> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    pub async fn exists(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Read the stored token, `None` if no file is present.
    pub async fn load(&self) -> LicenseResult<Option<String>> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the token, truncating any previous contents.
    pub async fn save(&self, contents: &str) -> LicenseResult<()> {
        self.ensure_dir().await?;
        fs::write(&self.path, contents).await?;
        Ok(())
    }

    /// Delete the token file; succeeds if it was already gone.
    pub async fn remove(&self) -> LicenseResult<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Copy an externally supplied token file into the managed location.
    pub async fn copy_in(&self, src: &Path) -> LicenseResult<()> {
        self.ensure_dir().await?;
        fs::copy(src, &self.path).await?;
        Ok(())
    }
}
