//! Ticket image storage.
//!
//! Images are written to `<root>/.staging/<uuid>` before the ticket row is
//! committed, then renamed to `<root>/<uuid>_<name>` on commit or removed on
//! any failure.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, error};
use uuid::Uuid;

const STAGING_DIR: &str = ".staging";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid image: {0}")]
    Rejected(String),

    #[error("Failed to store image: {0}")]
    Io(#[from] std::io::Error),
}

/// An image written to the staging area but not yet visible under the root.
#[derive(Debug)]
pub struct StagedImage {
    path: PathBuf,
    /// File name the image gets once finalized, relative to the upload root
    pub stored_name: String,
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Checks name, type and size, then writes the bytes to staging.
    pub async fn stage(&self, filename: &str, bytes: &[u8]) -> Result<StagedImage, UploadError> {
        let safe_name = sanitize_filename(filename);
        if safe_name.is_empty() {
            return Err(UploadError::Rejected("missing file name".to_string()));
        }

        let is_image = mime_guess::from_path(&safe_name)
            .first()
            .is_some_and(|mime| mime.type_() == mime_guess::mime::IMAGE);
        if !is_image {
            return Err(UploadError::Rejected(format!("{safe_name} is not an image")));
        }

        if bytes.is_empty() {
            return Err(UploadError::Rejected("empty file".to_string()));
        }

        if bytes.len() > self.max_bytes {
            return Err(UploadError::Rejected(format!(
                "file exceeds {} bytes",
                self.max_bytes
            )));
        }

        let staging = self.root.join(STAGING_DIR);
        fs::create_dir_all(&staging).await?;

        let id = Uuid::new_v4();
        let path = staging.join(id.to_string());
        fs::write(&path, bytes).await?;

        debug!(path = %path.display(), "Image staged");

        Ok(StagedImage {
            path,
            stored_name: format!("{id}_{safe_name}"),
        })
    }

    /// Moves a staged image to its final name. Called after commit.
    pub async fn finalize(&self, staged: StagedImage) -> Result<PathBuf, UploadError> {
        let target = self.root.join(&staged.stored_name);

        if let Err(e) = fs::rename(&staged.path, &target).await {
            error!(
                staged = %staged.path.display(),
                target = %target.display(),
                error = %e,
                "Failed to finalize staged image"
            );
            self.discard(staged).await;
            return Err(e.into());
        }

        Ok(target)
    }

    /// Removes a staged image. Missing files are ignored.
    pub async fn discard(&self, staged: StagedImage) {
        if let Err(e) = fs::remove_file(&staged.path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            error!(path = %staged.path.display(), error = %e, "Failed to discard staged image");
        }
    }

    /// Deletes a finalized image by its stored name. Missing files are ignored.
    pub async fn remove(&self, stored_name: &str) {
        let path = self.root.join(sanitize_filename(stored_name));

        if let Err(e) = fs::remove_file(&path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            error!(path = %path.display(), error = %e, "Failed to remove image");
        }
    }
}

/// Reduces an uploaded file name to a safe single path component.
///
/// Directory parts are dropped, whitespace becomes `_`, and anything other
/// than letters, digits, `.`, `-` and `_` is removed. Leading dots are
/// stripped so the result can never be hidden or refer to a parent.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    cleaned.trim_start_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("leak.jpg"), "leak.jpg");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\pic 1.png"), "pic_1.png");
        assert_eq!(sanitize_filename("..hidden.png"), "hidden.png");
        assert_eq!(sanitize_filename("水管 漏水.jpg"), "水管_漏水.jpg");
        assert_eq!(sanitize_filename("a<b>|c.gif"), "abc.gif");
        assert_eq!(sanitize_filename("../"), "");
    }

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("dormkeep-uploads-{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_stage_then_finalize() {
        let root = temp_root();
        let store = UploadStore::new(&root, 1024);

        let staged = store.stage("sink.png", b"\x89PNG").await.unwrap();
        assert!(staged.stored_name.ends_with("_sink.png"));
        let staged_path = staged.path.clone();
        assert!(staged_path.exists());

        let target = store.finalize(staged).await.unwrap();
        assert!(target.exists());
        assert!(!staged_path.exists());
        assert_eq!(target.parent(), Some(root.as_path()));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn test_stage_then_discard() {
        let root = temp_root();
        let store = UploadStore::new(&root, 1024);

        let staged = store.stage("sink.jpg", b"data").await.unwrap();
        let staged_path = staged.path.clone();
        store.discard(staged).await;
        assert!(!staged_path.exists());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn test_stage_rejects_bad_input() {
        let root = temp_root();
        let store = UploadStore::new(&root, 4);

        assert!(matches!(
            store.stage("notes.txt", b"abc").await,
            Err(UploadError::Rejected(_))
        ));
        assert!(matches!(
            store.stage("big.png", b"12345").await,
            Err(UploadError::Rejected(_))
        ));
        assert!(matches!(
            store.stage("", b"1").await,
            Err(UploadError::Rejected(_))
        ));
        assert!(!root.join(STAGING_DIR).exists());
    }
}
