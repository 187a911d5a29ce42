//! Local disk backend: writes uploads into the directory served under
//! `/uploads` and builds URLs from the request origin.

use crate::{
    config::LocalStoreConfig,
    models::asset::{BackendKind, StoredAsset},
    services::storage_service::{StorageResult, UploadError},
};
use chrono::Utc;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File, OpenOptions},
    io::AsyncWriteExt,
};
use tracing::debug;

/// URL prefix the upload directory is served under.
pub const PUBLIC_PREFIX: &str = "/uploads";

const MAX_FILENAME_LEN: usize = 200;
const MAX_NAME_ATTEMPTS: i64 = 16;

pub struct LocalDiskStore {
    dir: PathBuf,
    public_base_url: Option<String>,
}

impl LocalDiskStore {
    /// Create the store, making sure the upload directory exists.
    pub async fn new(cfg: LocalStoreConfig) -> io::Result<Self> {
        fs::create_dir_all(&cfg.upload_dir).await?;
        Ok(Self {
            dir: cfg.upload_dir,
            public_base_url: cfg.public_base_url,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `payload` as `<epoch-ms>-<name>` and return its public URL.
    ///
    /// Files are opened create-new: when two uploads of the same name land in
    /// the same millisecond the later one moves to the next free timestamp
    /// instead of overwriting.
    pub async fn store(
        &self,
        payload: &[u8],
        original_filename: &str,
        origin: &str,
    ) -> StorageResult<StoredAsset> {
        if payload.is_empty() {
            return Err(UploadError::EmptyPayload);
        }
        let name = sanitize_filename(original_filename)?;

        let (stored_name, path, mut file) = self.create_unique(&name).await?;
        if let Err(err) = write_payload(&mut file, payload).await {
            let _ = fs::remove_file(&path).await;
            return Err(UploadError::Io(err));
        }
        debug!("wrote {} bytes to {}", payload.len(), path.display());

        let base = self.public_base_url.as_deref().unwrap_or(origin);
        Ok(StoredAsset {
            url: format!("{}{}/{}", base, PUBLIC_PREFIX, stored_name),
            identifier: stored_name,
            backend: BackendKind::Local,
        })
    }

    async fn create_unique(&self, name: &str) -> io::Result<(String, PathBuf, File)> {
        let stamp = Utc::now().timestamp_millis();
        for offset in 0..MAX_NAME_ATTEMPTS {
            let candidate = format!("{}-{}", stamp + offset, name);
            let path = self.dir.join(&candidate);
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((candidate, path, file)),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err),
            }
        }
        Err(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free upload name for `{}`", name),
        ))
    }
}

async fn write_payload(file: &mut File, payload: &[u8]) -> io::Result<()> {
    file.write_all(payload).await?;
    file.flush().await?;
    file.sync_all().await
}

/// Reduce a client-supplied filename to one safe path component.
///
/// Keeps the final component only, replaces anything outside
/// `[A-Za-z0-9._-]` with `_`, and rejects names made only of dots or
/// containing control characters.
pub fn sanitize_filename(original: &str) -> StorageResult<String> {
    let last = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if last.chars().any(char::is_control) {
        return Err(UploadError::InvalidFilename(original.to_string()));
    }

    let cleaned: String = last
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '-' => c,
            _ => '_',
        })
        .take(MAX_FILENAME_LEN)
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        return Err(UploadError::InvalidFilename(original.to_string()));
    }
    Ok(cleaned)
}
