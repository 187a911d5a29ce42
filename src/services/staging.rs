//! Staging files: transient on-disk copies of a payload that live only
//! while a remote upload is in flight.

use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

/// Owns a staging file until [`StagingFile::release`] removes it.
///
/// If the guard is dropped without being released (an error on the way, or
/// the request future cancelled mid-upload) the file is removed on drop.
#[derive(Debug)]
pub struct StagingFile {
    path: PathBuf,
    released: bool,
}

impl StagingFile {
    /// Write `payload` to a fresh, uniquely named file under `dir`.
    pub async fn create(dir: &Path, payload: &[u8]) -> io::Result<Self> {
        let path = dir.join(format!("{}.upload", Uuid::new_v4()));
        let mut file = fs::File::create(&path).await?;
        let staged = Self {
            path,
            released: false,
        };
        file.write_all(payload).await?;
        file.flush().await?;
        Ok(staged)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file. Failures are logged, never returned.
    pub async fn release(mut self) {
        self.released = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => debug!("removed staging file {}", self.path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("staging file {} already gone", self.path.display());
            }
            Err(err) => warn!(
                "failed to remove staging file {}: {}",
                self.path.display(),
                err
            ),
        }
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != ErrorKind::NotFound {
                warn!(
                    "failed to remove abandoned staging file {}: {}",
                    self.path.display(),
                    err
                );
            }
        }
    }
}
