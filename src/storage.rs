//! Raw image byte storage.
//!
//! The pipeline only needs `store(bytes, content_type, metadata) -> locator`;
//! everything else about durability is a collaborator concern. The default
//! implementation writes to a local directory with a JSON sidecar for the
//! metadata map. At-least-once: a stored image with no completed record is an
//! accepted inconsistency.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to write object: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode object metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Persists the bytes and returns an opaque locator for them.
    async fn store(
        &self,
        bytes: &[u8],
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<String, StorageError>;
}

pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/heic" => "heic",
        "image/gif" => "gif",
        _ => "bin",
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn store(
        &self,
        bytes: &[u8],
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<String, StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let name = Uuid::new_v4().to_string();
        let image_path = self
            .root
            .join(format!("{name}.{}", extension_for(content_type)));
        tokio::fs::write(&image_path, bytes).await?;

        let sidecar = json!({
            "contentType": content_type,
            "sizeBytes": bytes.len(),
            "storedAt": Utc::now().to_rfc3339(),
            "metadata": metadata,
        });
        let sidecar_path = self.root.join(format!("{name}.json"));
        tokio::fs::write(&sidecar_path, serde_json::to_vec_pretty(&sidecar)?).await?;

        let locator = image_path.to_string_lossy().into_owned();
        debug!(locator = %locator, size = bytes.len(), "stored image");
        Ok(locator)
    }
}
