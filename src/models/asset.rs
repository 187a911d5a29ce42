//! Represents an uploaded asset once a storage backend has persisted it.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The storage backend that produced an asset.
///
/// Exactly one backend is active per deployment; it is chosen at startup.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Files written under a directory this process serves itself.
    Local,
    /// Files forwarded to the Cloudinary upload API.
    Cloudinary,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Local => f.write_str("local"),
            BackendKind::Cloudinary => f.write_str("cloudinary"),
        }
    }
}

/// A durable, publicly fetchable asset.
///
/// Created on a successful upload and never updated afterwards.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StoredAsset {
    /// Stable name of the asset within its backend.
    pub identifier: String,

    /// Absolute address an unauthenticated GET can fetch.
    pub url: String,

    /// Which backend holds the bytes.
    pub backend: BackendKind,
}

/// Body returned by `POST /api/upload`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UploadResponse {
    pub filename: String,
    pub url: String,
}

impl From<StoredAsset> for UploadResponse {
    fn from(asset: StoredAsset) -> Self {
        Self {
            filename: asset.identifier,
            url: asset.url,
        }
    }
}
