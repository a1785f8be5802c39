// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Object storage for progress photos.
//!
//! Production uploads go to the Cloud Storage JSON API using the service
//! account token from the metadata server. With STORAGE_EMULATOR_HOST set,
//! requests go to the emulator without credentials.
//!
//! The bucket is not public, so each object gets a random Firebase download
//! token in its metadata. The returned URL carries that token and can be
//! loaded by the browser without credentials.

use crate::error::AppError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` at `path` and return a URL the client can load.
    async fn upload(&self, path: &str, content_type: &str, bytes: Vec<u8>)
        -> Result<String, AppError>;
}

const FIREBASE_STORAGE_URL: &str = "https://firebasestorage.googleapis.com";

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Refresh this long before the metadata token actually expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Cloud Storage JSON API client.
pub struct GcsBlobStore {
    http: reqwest::Client,
    base_url: String,
    download_base: String,
    bucket: String,
    emulated: bool,
    token: RwLock<Option<CachedToken>>,
}

impl GcsBlobStore {
    pub fn new(bucket: &str) -> Self {
        let (base_url, emulated) = match std::env::var("STORAGE_EMULATOR_HOST") {
            Ok(host) => (host.trim_end_matches('/').to_string(), true),
            Err(_) => ("https://storage.googleapis.com".to_string(), false),
        };
        // The emulator serves the download endpoint itself.
        let download_base = if emulated {
            base_url.clone()
        } else {
            FIREBASE_STORAGE_URL.to_string()
        };
        Self {
            http: reqwest::Client::new(),
            base_url,
            download_base,
            bucket: bucket.to_string(),
            emulated,
            token: RwLock::new(None),
        }
    }

    async fn access_token(&self) -> Result<String, AppError> {
        if let Some(cached) = self.token.read().await.as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.token.clone());
            }
        }

        let mut guard = self.token.write().await;
        // Another request may have refreshed while we waited for the lock.
        if let Some(cached) = guard.as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.token.clone());
            }
        }

        let response = self
            .http
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Metadata server unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Storage(format!(
                "Metadata token request failed: HTTP {}",
                response.status()
            )));
        }

        let token: MetadataToken = response
            .json()
            .await
            .map_err(|e| AppError::Storage(format!("Malformed metadata token: {}", e)))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *guard = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        tracing::debug!(expires_in = token.expires_in, "Refreshed storage access token");

        Ok(token.access_token)
    }
}

/// Tokenized download URL for `path`, in the form Firebase clients use.
pub fn download_url(base: &str, bucket: &str, path: &str, token: &str) -> String {
    format!(
        "{}/v0/b/{}/o/{}?alt=media&token={}",
        base,
        bucket,
        urlencoding::encode(path),
        token
    )
}

/// `multipart/related` body: JSON metadata part, then the media part.
fn multipart_related(
    boundary: &str,
    metadata: &[u8],
    content_type: &str,
    bytes: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(metadata.len() + bytes.len() + 256);
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n",
            boundary
        )
        .as_bytes(),
    );
    body.extend_from_slice(metadata);
    body.extend_from_slice(
        format!("\r\n--{}\r\nContent-Type: {}\r\n\r\n", boundary, content_type).as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn upload(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, AppError> {
        let url = format!("{}/upload/storage/v1/b/{}/o", self.base_url, self.bucket);
        let size = bytes.len();

        let download_token = Uuid::new_v4().to_string();
        let metadata = serde_json::to_vec(&json!({
            "name": path,
            "contentType": content_type,
            "metadata": { "firebaseStorageDownloadTokens": download_token },
        }))
        .map_err(|e| AppError::Storage(format!("Object metadata error: {}", e)))?;

        let boundary = format!("pulse-{}", Uuid::new_v4().simple());
        let body = multipart_related(&boundary, &metadata, content_type, &bytes);

        let mut request = self
            .http
            .post(&url)
            .query(&[("uploadType", "multipart")])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body);

        if !self.emulated {
            request = request.bearer_auth(self.access_token().await?);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Upload request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Storage(format!("HTTP {}: {}", status, body)));
        }

        tracing::info!(path, size, "Uploaded object");
        Ok(download_url(
            &self.download_base,
            &self.bucket,
            path,
            &download_token,
        ))
    }
}

/// In-memory blob store for tests.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: DashMap<String, (String, Vec<u8>)>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content type and bytes stored at `path`.
    pub fn get(&self, path: &str) -> Option<(String, Vec<u8>)> {
        self.objects.get(path).map(|o| o.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, AppError> {
        self.objects
            .insert(path.to_string(), (content_type.to_string(), bytes));
        Ok(format!("memory://{}", path))
    }
}
