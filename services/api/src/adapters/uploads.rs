//! services/api/src/adapters/uploads.rs
//!
//! Stores uploaded photos in a local directory. Implements the `ImageStore` port.

use async_trait::async_trait;
use incident_core::ports::{ImageStore, PortError, PortResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Clone)]
pub struct UploadDir {
    root: PathBuf,
}

impl UploadDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Generates `<uuid><ext>`, keeping the original extension when it is plain ASCII.
    fn generated_name(original_name: &str) -> String {
        let ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_default();
        format!("{}{}", Uuid::new_v4(), ext)
    }
}

#[async_trait]
impl ImageStore for UploadDir {
    async fn store_image(&self, original_name: &str, bytes: &[u8]) -> PortResult<String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| PortError::Unexpected(format!("{}: {}", self.root.display(), e)))?;

        let filename = Self::generated_name(original_name);
        let path = self.root.join(&filename);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| PortError::Unexpected(format!("{}: {}", path.display(), e)))?;
        Ok(filename)
    }

    fn image_path(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    async fn remove_image(&self, filename: &str) -> PortResult<()> {
        let path = self.image_path(filename);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PortError::Unexpected(format!("{}: {}", path.display(), e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_names_keep_safe_extensions() {
        assert!(UploadDir::generated_name("IMG_0001.JPG").ends_with(".jpg"));
        assert!(!UploadDir::generated_name("photo").contains('.'));
        assert!(!UploadDir::generated_name("evil.j/pg").contains('/'));
        assert_ne!(
            UploadDir::generated_name("a.png"),
            UploadDir::generated_name("a.png")
        );
    }

    #[tokio::test]
    async fn stores_bytes_under_fresh_name() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadDir::new(dir.path().join("uploads"));

        let name = uploads.store_image("scene.jpeg", b"pixels").await.unwrap();

        assert!(name.ends_with(".jpeg"));
        let stored = tokio::fs::read(uploads.image_path(&name)).await.unwrap();
        assert_eq!(stored, b"pixels");
    }

    #[tokio::test]
    async fn removes_stored_image_and_ignores_missing_ones() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadDir::new(dir.path());
        let name = uploads.store_image("scene.jpg", b"pixels").await.unwrap();

        uploads.remove_image(&name).await.unwrap();

        assert!(!uploads.image_path(&name).exists());
        uploads.remove_image(&name).await.unwrap();
    }
}
