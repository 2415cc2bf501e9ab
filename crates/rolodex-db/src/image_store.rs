//! Avatar image storage on the local filesystem.
//!
//! Files land under a fixed base directory and are served back at the
//! public `/images/` prefix. Names are a random UUID joined to a sanitized
//! copy of the original filename, so two uploads of `me.png` never collide.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use rolodex_core::{Error, Result};

/// Public URL prefix under which stored images are served.
pub const PUBLIC_IMAGE_PREFIX: &str = "/images/";

/// Filesystem-backed image store.
pub struct ImageStore {
    base_path: PathBuf,
}

impl ImageStore {
    /// Create a new image store rooted at the given directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Validate that the store can write, read, and delete files.
    ///
    /// Performs a full round-trip at startup to catch filesystem issues
    /// (permission errors, missing mounts) before the first upload.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_file = self.base_path.join(".health-check");

        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", self.base_path, e))?;

        let data = b"image-store-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_back = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_back != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;

        Ok(())
    }

    /// Store uploaded image bytes and return the public-relative path.
    ///
    /// The write is atomic (temp file + rename) so readers of the public
    /// directory never see a half-written file.
    pub async fn store(&self, original_name: &str, data: &[u8]) -> Result<String> {
        let file_name = format!("{}_{}", Uuid::new_v4(), sanitize_filename(original_name));
        let full_path = self.base_path.join(&file_name);

        debug!(
            subsystem = "storage",
            component = "images",
            op = "store",
            file = %file_name,
            size = data.len(),
            "Storing image"
        );

        fs::create_dir_all(&self.base_path).await?;

        let temp_path = full_path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &full_path).await?;

        Ok(format!("{}{}", PUBLIC_IMAGE_PREFIX, file_name))
    }

    /// Delete the file behind a public image path. No-ops when the path is
    /// empty or the file is already gone.
    pub async fn delete(&self, public_path: &str) -> Result<()> {
        if public_path.is_empty() {
            return Ok(());
        }

        let full_path = self.resolve_public_path(public_path)?;
        if fs::try_exists(&full_path).await? {
            fs::remove_file(&full_path).await?;
            debug!(
                subsystem = "storage",
                component = "images",
                op = "delete",
                path = %public_path,
                "Image removed"
            );
        }
        Ok(())
    }

    /// Best-effort variant of [`delete`] for cleanup paths where failure
    /// must not mask the primary result. Logs instead of propagating.
    pub async fn delete_best_effort(&self, public_path: &str) {
        if let Err(e) = self.delete(public_path).await {
            warn!(
                subsystem = "storage",
                component = "images",
                path = %public_path,
                error = %e,
                "Failed to remove image file"
            );
        }
    }

    /// Directory served at the public `/images/` prefix.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Map `/images/<file>` back to an absolute path, refusing anything
    /// that is not a bare file name under the base directory.
    fn resolve_public_path(&self, public_path: &str) -> Result<PathBuf> {
        let file_name = public_path
            .strip_prefix(PUBLIC_IMAGE_PREFIX)
            .ok_or_else(|| {
                Error::InvalidInput(format!("not an image path: {}", public_path))
            })?;

        if file_name.is_empty()
            || file_name.contains('/')
            || file_name.contains('\\')
            || file_name.contains("..")
        {
            return Err(Error::InvalidInput(format!(
                "unsafe image path: {}",
                public_path
            )));
        }

        Ok(self.base_path.join(file_name))
    }
}

/// Reduce an uploaded filename to a safe ASCII subset.
///
/// Keeps alphanumerics, dots, dashes, and underscores; everything else
/// becomes an underscore. An empty or fully-mangled name falls back to
/// "upload".
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches(|c| c == '_' || c == '.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
