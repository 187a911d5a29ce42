//! Cloudinary backend.
//!
//! Each upload is staged to disk, sent with one signed multipart request to
//! `{api_base}/v1_1/{cloud_name}/image/upload`, and the staging file is
//! released once that request resolves, whatever the outcome.

use crate::{
    config::CloudinaryConfig,
    models::asset::{BackendKind, StoredAsset},
    services::{
        staging::StagingFile,
        storage_service::{StorageResult, UploadError},
    },
};
use anyhow::Context;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::path::Path;
use tokio::fs::{self, File};
use tokio_util::io::ReaderStream;
use tracing::debug;

const RESOURCE_TYPE: &str = "image";
const DEFAULT_UPLOAD_NAME: &str = "upload";

pub struct RemoteObjectStore {
    client: reqwest::Client,
    cfg: CloudinaryConfig,
}

/// Fields we use from a successful upload response.
#[derive(Debug, Deserialize)]
struct UploadResult {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl RemoteObjectStore {
    /// Build the HTTP client and make sure the staging directory exists.
    pub async fn new(cfg: CloudinaryConfig) -> anyhow::Result<Self> {
        fs::create_dir_all(&cfg.staging_dir)
            .await
            .with_context(|| {
                format!(
                    "preparing staging directory {}",
                    cfg.staging_dir.display()
                )
            })?;
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .context("building cloudinary HTTP client")?;
        Ok(Self { client, cfg })
    }

    pub fn staging_dir(&self) -> &Path {
        &self.cfg.staging_dir
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/v1_1/{}/{}/upload",
            self.cfg.api_base, self.cfg.cloud_name, RESOURCE_TYPE
        )
    }

    pub async fn store(
        &self,
        payload: &[u8],
        original_filename: &str,
    ) -> StorageResult<StoredAsset> {
        if payload.is_empty() {
            return Err(UploadError::EmptyPayload);
        }

        let staged = StagingFile::create(&self.cfg.staging_dir, payload).await?;
        let outcome = self
            .upload(staged.path(), original_filename, payload.len() as u64)
            .await;
        staged.release().await;

        let uploaded = outcome?;
        Ok(StoredAsset {
            identifier: public_id_tail(&uploaded.public_id).to_string(),
            url: uploaded.secure_url,
            backend: BackendKind::Cloudinary,
        })
    }

    async fn upload(
        &self,
        staged: &Path,
        original_filename: &str,
        len: u64,
    ) -> StorageResult<UploadResult> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("folder", self.cfg.folder.as_str()), ("timestamp", timestamp.as_str())],
            &self.cfg.api_secret,
        );

        let file = File::open(staged).await?;
        let file_name = match original_filename.trim() {
            "" => DEFAULT_UPLOAD_NAME.to_string(),
            name => name.to_string(),
        };
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, len).file_name(file_name);
        let form = Form::new()
            .part("file", part)
            .text("api_key", self.cfg.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", self.cfg.folder.clone())
            .text("signature", signature);

        let url = self.upload_url();
        debug!("uploading {} bytes to {}", len, url);
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|err| UploadError::Remote(format!("request to {} failed: {}", url, err)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = match response.json::<ErrorBody>().await {
                Ok(body) => body.error.message,
                Err(_) => "no error detail".to_string(),
            };
            return Err(UploadError::Remote(format!("status {}: {}", status, detail)));
        }

        response
            .json::<UploadResult>()
            .await
            .map_err(|err| UploadError::Remote(format!("unreadable upload response: {}", err)))
    }
}

/// Cloudinary request signature: SHA-1 over the parameters sorted by name,
/// joined as `k=v&k=v`, followed directly by the API secret.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let to_sign = sorted
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// `haifriends/abc123` -> `abc123`
fn public_id_tail(public_id: &str) -> &str {
    public_id.rsplit('/').next().unwrap_or(public_id)
}
