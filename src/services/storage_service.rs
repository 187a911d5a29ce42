//! src/services/storage_service.rs
//!
//! StorageService: the single entry point the upload endpoint talks to.
//! It owns exactly one backend, chosen at startup: local disk (files served
//! by this process under `/uploads`) or Cloudinary (files forwarded to the
//! remote media API after being staged on disk).

use crate::{
    config::{AppConfig, StorageConfig},
    models::asset::{BackendKind, StoredAsset},
    services::{local_store::LocalDiskStore, remote_store::RemoteObjectStore},
};
use anyhow::Context;
use std::{io, path::Path, sync::Arc};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("uploaded file is empty")]
    EmptyPayload,
    #[error("uploaded file is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },
    #[error("filename `{0}` cannot be stored")]
    InvalidFilename(String),
    #[error("remote store rejected upload: {0}")]
    Remote(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, UploadError>;

/// The active storage strategy. Both variants produce the same
/// [`StoredAsset`] so callers never branch on the backend.
pub enum StorageBackend {
    Local(LocalDiskStore),
    Remote(RemoteObjectStore),
}

/// Cheap-to-clone handle shared with every handler as router state.
///
/// Holds only immutable configuration; there is no per-request shared state.
#[derive(Clone)]
pub struct StorageService {
    backend: Arc<StorageBackend>,
    max_upload_bytes: usize,
}

impl StorageService {
    pub fn new(backend: StorageBackend, max_upload_bytes: usize) -> Self {
        Self {
            backend: Arc::new(backend),
            max_upload_bytes,
        }
    }

    /// Build the backend selected in `cfg`, creating its working directory.
    pub async fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let backend = match &cfg.storage {
            StorageConfig::Local(local) => StorageBackend::Local(
                LocalDiskStore::new(local.clone())
                    .await
                    .with_context(|| {
                        format!(
                            "preparing upload directory {}",
                            local.upload_dir.display()
                        )
                    })?,
            ),
            StorageConfig::Cloudinary(cloud) => {
                StorageBackend::Remote(RemoteObjectStore::new(cloud.clone()).await?)
            }
        };
        Ok(Self::new(backend, cfg.max_upload_bytes))
    }

    pub fn kind(&self) -> BackendKind {
        match &*self.backend {
            StorageBackend::Local(_) => BackendKind::Local,
            StorageBackend::Remote(_) => BackendKind::Cloudinary,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Directory served under `/uploads`, if the local backend is active.
    pub fn local_dir(&self) -> Option<&Path> {
        match &*self.backend {
            StorageBackend::Local(store) => Some(store.dir()),
            StorageBackend::Remote(_) => None,
        }
    }

    /// Directory the active backend writes to (uploads or staging files).
    pub fn work_dir(&self) -> &Path {
        match &*self.backend {
            StorageBackend::Local(store) => store.dir(),
            StorageBackend::Remote(store) => store.staging_dir(),
        }
    }

    /// Persist `payload` and return where it can be fetched.
    ///
    /// `origin` is the `scheme://host` the request arrived on; only the local
    /// backend uses it to build URLs.
    pub async fn store(
        &self,
        payload: &[u8],
        original_filename: &str,
        origin: &str,
    ) -> StorageResult<StoredAsset> {
        if payload.is_empty() {
            return Err(UploadError::EmptyPayload);
        }
        if payload.len() > self.max_upload_bytes {
            return Err(UploadError::TooLarge {
                size: payload.len(),
                limit: self.max_upload_bytes,
            });
        }

        let asset = match &*self.backend {
            StorageBackend::Local(store) => store.store(payload, original_filename, origin).await?,
            StorageBackend::Remote(store) => store.store(payload, original_filename).await?,
        };

        info!(
            backend = %asset.backend,
            identifier = %asset.identifier,
            size = payload.len(),
            "stored upload"
        );
        Ok(asset)
    }
}
