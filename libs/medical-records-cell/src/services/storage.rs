use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{FileUpload, RecordError, StoredFile, ALLOWED_FILE_TYPES, MAX_FILE_SIZE};

/// Lab report attachments on local disk under a single upload directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    upload_dir: PathBuf,
}

impl FileStorage {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn validate(content_type: &str, size: u64) -> Result<(), RecordError> {
        if size == 0 {
            return Err(RecordError::InvalidFile("File cannot be empty".to_string()));
        }
        if size > MAX_FILE_SIZE {
            return Err(RecordError::InvalidFile(
                "File size exceeds maximum limit of 10MB".to_string(),
            ));
        }
        if !ALLOWED_FILE_TYPES.contains(&content_type.to_ascii_lowercase().as_str()) {
            return Err(RecordError::InvalidFile(
                "File type not supported. Allowed types: PDF, JPEG, JPG, PNG".to_string(),
            ));
        }
        Ok(())
    }

    /// Decodes, validates and writes an upload under a fresh name that keeps
    /// the original extension.
    pub async fn store(&self, upload: &FileUpload) -> Result<StoredFile, RecordError> {
        let encoded = match upload.data.split_once(";base64,") {
            Some((_, data)) => data,
            None => upload.data.as_str(),
        };
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| RecordError::InvalidFile(format!("Failed to decode base64 data: {}", e)))?;

        let size = bytes.len() as u64;
        Self::validate(&upload.content_type, size)?;

        fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(|e| RecordError::Storage(e.to_string()))?;

        let extension = Path::new(&upload.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();
        let path = self
            .upload_dir
            .join(format!("{}{}", Uuid::new_v4(), extension));

        fs::write(&path, &bytes)
            .await
            .map_err(|e| RecordError::Storage(e.to_string()))?;

        debug!("Stored {} bytes at {}", size, path.display());
        Ok(StoredFile {
            path: path.to_string_lossy().into_owned(),
            file_name: upload.file_name.clone(),
            file_type: upload.content_type.to_ascii_lowercase(),
            size,
        })
    }

    pub async fn read(&self, path: &str) -> Result<Vec<u8>, RecordError> {
        fs::read(path)
            .await
            .map_err(|e| RecordError::Storage(format!("Could not read {}: {}", path, e)))
    }

    /// Missing files are not an error.
    pub async fn delete(&self, path: &str) -> Result<(), RecordError> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RecordError::Storage(e.to_string())),
        }
    }

    /// Removes files whose rows are already gone; failures are only logged.
    pub async fn delete_all(&self, paths: &[String]) {
        for path in paths {
            if let Err(e) = self.delete(path).await {
                warn!("Failed to delete stored file {}: {}", path, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitelist_and_size_cap() {
        assert!(FileStorage::validate("application/pdf", 1).is_ok());
        assert!(FileStorage::validate("IMAGE/PNG", MAX_FILE_SIZE).is_ok());
        assert!(FileStorage::validate("image/gif", 10).is_err());
        assert!(FileStorage::validate("image/jpeg", MAX_FILE_SIZE + 1).is_err());
        assert!(FileStorage::validate("image/jpeg", 0).is_err());
    }
}
