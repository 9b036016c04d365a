//! Local file storage for uploads.
//!
//! Files are written under `<root>/<area>/<yyyymm>/<uuid>.<ext>` and recorded
//! in the database by their path relative to the root. Relative paths coming
//! back from the database are resolved against the root and may not escape it.

use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

pub const AREA_DOCUMENTS: &str = "documents";
pub const AREA_CONTRACTS: &str = "contracts";
pub const AREA_KNOWLEDGE: &str = "knowledge";
pub const AREA_VOUCHERS: &str = "vouchers";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid file path: {0}")]
    InvalidPath(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("File storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file written by [`FileStorage::save`].
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Path relative to the storage root, with `/` separators.
    pub relative_path: String,
    pub size: i64,
}

#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `data` under `area`, keeping the original file's extension.
    pub async fn save(
        &self,
        area: &str,
        original_name: &str,
        data: &[u8],
    ) -> Result<StoredFile, StorageError> {
        let month = Utc::now().format("%Y%m").to_string();
        let file_name = match extension_of(original_name) {
            Some(ext) => format!("{}.{ext}", Uuid::new_v4()),
            None => Uuid::new_v4().to_string(),
        };
        let relative_path = format!("{area}/{month}/{file_name}");

        let dir = self.root.join(area).join(&month);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&file_name), data).await?;

        tracing::debug!(path = %relative_path, size = data.len(), "Stored upload");
        Ok(StoredFile {
            relative_path,
            size: data.len() as i64,
        })
    }

    /// Map a stored relative path to a location under the root.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, StorageError> {
        let path = Path::new(relative);
        let safe = !relative.is_empty()
            && path
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe {
            return Err(StorageError::InvalidPath(relative.to_string()));
        }
        Ok(self.root.join(path))
    }

    /// Open a stored file for streaming, returning it with its size.
    pub async fn open(&self, relative: &str) -> Result<(tokio::fs::File, u64), StorageError> {
        let path = self.resolve(relative)?;
        let file = match tokio::fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(relative.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let size = file.metadata().await?.len();
        Ok((file, size))
    }

    /// Delete a stored file. Failures are logged, never returned.
    pub async fn remove(&self, relative: &str) {
        let path = match self.resolve(relative) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping removal of invalid path");
                return;
            }
        };
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!(path = %relative, error = %e, "Failed to remove stored file");
        }
    }
}

/// Lower-cased extension of an uploaded file name, if it has a sane one.
fn extension_of(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?;
    (!ext.is_empty() && ext.len() <= 16 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .then(|| ext.to_ascii_lowercase())
}

/// Guess a MIME type from a file name's extension.
pub fn mime_for(name: &str) -> &'static str {
    match extension_of(name).as_deref() {
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("xls") => "application/vnd.ms-excel",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("ppt") => "application/vnd.ms-powerpoint",
        Some("pptx") => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("txt") => "text/plain; charset=utf-8",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn save_then_open() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        let stored = storage
            .save(AREA_DOCUMENTS, "Plan.PDF", b"hello")
            .await
            .unwrap();
        assert!(stored.relative_path.starts_with("documents/"));
        assert!(stored.relative_path.ends_with(".pdf"));
        assert_eq!(stored.size, 5);

        let (_, size) = storage.open(&stored.relative_path).await.unwrap();
        assert_eq!(size, 5);
    }

    #[test]
    fn traversal_is_rejected() {
        let storage = FileStorage::new("/srv/uploads");
        assert_matches!(
            storage.resolve("../etc/passwd"),
            Err(StorageError::InvalidPath(_))
        );
        assert_matches!(storage.resolve("/etc/passwd"), Err(StorageError::InvalidPath(_)));
        assert_matches!(storage.resolve(""), Err(StorageError::InvalidPath(_)));
        assert!(storage.resolve("documents/202401/a.pdf").is_ok());
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        assert_matches!(
            storage.open("documents/202401/missing.pdf").await,
            Err(StorageError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn remove_deletes_and_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        let stored = storage.save(AREA_VOUCHERS, "r.png", b"x").await.unwrap();

        storage.remove(&stored.relative_path).await;
        assert!(!storage.resolve(&stored.relative_path).unwrap().exists());

        // Second removal only logs.
        storage.remove(&stored.relative_path).await;
    }

    #[test]
    fn extension_handling() {
        assert_eq!(extension_of("report.final.XLSX").as_deref(), Some("xlsx"));
        assert_eq!(extension_of("noext"), None);
        assert_eq!(mime_for("a.pdf"), "application/pdf");
        assert_eq!(mime_for("a.weird"), "application/octet-stream");
    }
}
