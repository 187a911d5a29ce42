//! Common helpers for the HTTP-level tests.

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use haifriends_gateway::{
    config::{AppConfig, LocalStoreConfig, StorageConfig},
    routes::{mount_table::RouteGroups, routes::routes},
    services::storage_service::StorageService,
};
use http_body_util::BodyExt;
use std::path::PathBuf;
use tempfile::TempDir;

pub const BOUNDARY: &str = "haifriends-test-boundary";

/// A local-backend gateway writing into its own temporary directory.
pub struct TestApp {
    pub router: Router,
    pub upload_dir: PathBuf,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub async fn local() -> Self {
        Self::local_with(RouteGroups::new(), 10 * 1024 * 1024).await
    }

    pub async fn local_with(groups: RouteGroups, max_upload_bytes: usize) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let upload_dir = temp_dir.path().join("uploads/posts");
        let cfg = AppConfig {
            host: "127.0.0.1".into(),
            port: 8800,
            storage: StorageConfig::Local(LocalStoreConfig {
                upload_dir: upload_dir.clone(),
                public_base_url: None,
            }),
            max_upload_bytes,
            cors_allowed_origins: Vec::new(),
        };
        let storage = StorageService::from_config(&cfg).await.unwrap();

        Self {
            router: routes(storage, groups, &cfg.cors_allowed_origins),
            upload_dir,
            _temp_dir: temp_dir,
        }
    }

    pub fn stored_files(&self) -> usize {
        std::fs::read_dir(&self.upload_dir).unwrap().count()
    }
}

/// One part of a hand-built `multipart/form-data` body.
pub enum Field<'a> {
    File {
        name: &'a str,
        filename: &'a str,
        bytes: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

pub fn multipart_body(fields: &[Field<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for field in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match field {
            Field::File {
                name,
                filename,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: image/png\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            Field::Text { name, value } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}",
                        name, value
                    )
                    .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(host: &str, fields: &[Field<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(header::HOST, host)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(fields)))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn json_response(response: Response<Body>) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = body_bytes(response).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}
