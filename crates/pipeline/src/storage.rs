//! Durable object storage for page illustrations.
//!
//! Two backends: the local filesystem (served by the API under `/images`)
//! and S3-compatible storage. Keys are `{story_id}/{page_id}.{ext}` inside
//! the `images` bucket and writes always overwrite.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use image::ImageFormat;
use curico_core::naming::public_object_url;

use crate::error::StorageError;

/// Trait for pluggable object storage backends.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any existing object.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    /// Permanent public URL for `key`.
    fn public_url(&self, key: &str) -> String;

    /// Backend name, for logging.
    fn backend_name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// Image sniffing
// ---------------------------------------------------------------------------

/// Detected image format of a downloaded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageKind {
    pub extension: &'static str,
    pub content_type: &'static str,
}

/// Identify PNG, JPEG or WebP bytes from their header.
pub fn sniff_image(bytes: &[u8]) -> Result<ImageKind, StorageError> {
    let format = image::guess_format(bytes)
        .map_err(|e| StorageError::InvalidImage(format!("unrecognized payload: {e}")))?;
    match format {
        ImageFormat::Png => Ok(ImageKind {
            extension: "png",
            content_type: "image/png",
        }),
        ImageFormat::Jpeg => Ok(ImageKind {
            extension: "jpg",
            content_type: "image/jpeg",
        }),
        ImageFormat::WebP => Ok(ImageKind {
            extension: "webp",
            content_type: "image/webp",
        }),
        other => Err(StorageError::InvalidImage(format!(
            "unsupported format {other:?}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Local filesystem
// ---------------------------------------------------------------------------

/// Stores objects as files below a root directory.
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `key` below the root, rejecting absolute paths and `..`.
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || key.is_empty() {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid object key {key:?}"),
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Write then rename so readers never see a partial file.
        let tmp = path.with_extension("part");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        public_object_url(&self.public_base_url, key)
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

// ---------------------------------------------------------------------------
// S3
// ---------------------------------------------------------------------------

/// Stores objects in an S3 bucket.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, public_base_url: Option<String>) -> Self {
        let public_base_url =
            public_base_url.unwrap_or_else(|| format!("https://{bucket}.s3.amazonaws.com"));
        Self {
            client,
            bucket,
            public_base_url,
        }
    }

    /// Build a client from the standard AWS environment configuration.
    pub async fn from_env(bucket: String, public_base_url: Option<String>) -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(aws_sdk_s3::Client::new(&config), bucket, public_base_url)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::S3(aws_sdk_s3::error::DisplayErrorContext(e).to_string()))?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        public_object_url(&self.public_base_url, key)
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_HEADER: &[u8] = b"\xff\xd8\xff\xe0\0\x10JFIF\0";

    #[test]
    fn sniffs_png_and_jpeg() {
        assert_eq!(sniff_image(PNG_HEADER).unwrap().extension, "png");
        let jpeg = sniff_image(JPEG_HEADER).unwrap();
        assert_eq!(jpeg.extension, "jpg");
        assert_eq!(jpeg.content_type, "image/jpeg");
    }

    #[test]
    fn rejects_non_image_payload() {
        let err = sniff_image(b"<html>expired link</html>").unwrap_err();
        assert!(matches!(err, StorageError::InvalidImage(_)));
    }

    #[tokio::test]
    async fn local_put_writes_file_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "http://localhost:3000/images/");

        store.put("4/17.png", b"one".to_vec(), "image/png").await.unwrap();
        store.put("4/17.png", b"two".to_vec(), "image/png").await.unwrap();

        let written = std::fs::read(dir.path().join("4/17.png")).unwrap();
        assert_eq!(written, b"two");
        assert!(!dir.path().join("4/17.part").exists());
        assert_eq!(
            store.public_url("4/17.png"),
            "http://localhost:3000/images/4/17.png"
        );
    }

    #[tokio::test]
    async fn local_put_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "http://x");
        assert!(store.put("../escape.png", vec![1], "image/png").await.is_err());
        assert!(store.put("/abs.png", vec![1], "image/png").await.is_err());
    }

    #[test]
    fn s3_default_public_url_uses_bucket_host() {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new("us-east-1"))
            .build();
        let store = S3ObjectStore::new(
            aws_sdk_s3::Client::from_conf(config),
            "images".into(),
            None,
        );
        assert_eq!(
            store.public_url("1/2.png"),
            "https://images.s3.amazonaws.com/1/2.png"
        );
    }
}
