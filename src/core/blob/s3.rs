// src/core/blob/s3.rs

//! The S3-compatible `BlobBackend` implementation (spec §4.7), built on
//! `rust-s3`'s `Bucket` client.

use super::backend::{BlobBackend, CompletedPart, Hooks, MultipartUpload};
use super::info::{validate_key, BlobInfo};
use crate::core::errors::{CoreError, CoreResult};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use std::sync::RwLock;

/// Upload/download presigned URLs expire after 5 minutes; multipart part
/// URLs get double that (spec §4.7/§5).
const PRESIGN_EXPIRY_SECS: u32 = 300;
const MULTIPART_PRESIGN_EXPIRY_SECS: u32 = 600;

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub use_accelerate: bool,
}

pub struct S3Backend {
    bucket: Box<Bucket>,
    hooks: RwLock<Hooks>,
}

impl S3Backend {
    pub fn new(config: &S3Config) -> CoreResult<Self> {
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| CoreError::Backend(e.to_string()))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| CoreError::Backend(e.to_string()))?;
        if config.use_accelerate {
            bucket = bucket.with_path_style();
        }

        Ok(Self {
            bucket,
            hooks: RwLock::new(Hooks::default()),
        })
    }

    pub fn set_hooks(&self, hooks: Hooks) {
        *self.hooks.write().unwrap() = hooks;
    }
}

#[async_trait]
impl BlobBackend for S3Backend {
    async fn get_object(&self, key: &str) -> CoreResult<Bytes> {
        validate_key(key)?;
        let response = self
            .bucket
            .get_object(key)
            .await
            .map_err(|e| CoreError::Backend(e.to_string()))?;
        if response.status_code() == 404 {
            return Err(CoreError::NotFound);
        }
        Ok(Bytes::from(response.into_bytes().to_vec()))
    }

    async fn put_object(&self, key: &str, body: Bytes) -> CoreResult<BlobInfo> {
        validate_key(key)?;
        let response = self
            .bucket
            .put_object(key, &body)
            .await
            .map_err(|e| CoreError::Backend(e.to_string()))?;
        let etag = response
            .headers()
            .get("ETag")
            .cloned()
            .unwrap_or_default()
            .trim_matches('"')
            .to_string();
        let info = BlobInfo {
            key: key.to_string(),
            etag,
            size: body.len() as i64,
            last_modified: Utc::now().to_rfc3339(),
        };
        let hook = self.hooks.read().unwrap().after_put.clone();

        if let Some(hook) = hook {
            hook(info.clone()).await;
        }
        Ok(info)
    }

    async fn copy_object(&self, src: &str, dst: &str) -> CoreResult<BlobInfo> {
        validate_key(dst)?;
        self.bucket
            .copy_object_internal(src, dst)
            .await
            .map_err(|e| CoreError::Backend(e.to_string()))?;
        let (head, _) = self
            .bucket
            .head_object(dst)
            .await
            .map_err(|e| CoreError::Backend(e.to_string()))?;
        let info = BlobInfo {
            key: dst.to_string(),
            etag: head.e_tag.unwrap_or_default().trim_matches('"').to_string(),
            size: head.content_length.unwrap_or_default(),
            last_modified: head.last_modified.unwrap_or_else(|| Utc::now().to_rfc3339()),
        };
        let hook = self.hooks.read().unwrap().after_copy.clone();

        if let Some(hook) = hook {
            hook(info.clone()).await;
        }
        Ok(info)
    }

    async fn delete_object(&self, key: &str) -> CoreResult<()> {
        self.bucket
            .delete_object(key)
            .await
            .map_err(|e| CoreError::Backend(e.to_string()))?;
        let hook = self.hooks.read().unwrap().after_delete.clone();

        if let Some(hook) = hook {
            hook(key.to_string()).await;
        }
        Ok(())
    }

    async fn list_objects(&self) -> CoreResult<Vec<BlobInfo>> {
        let results = self
            .bucket
            .list("".to_string(), None)
            .await
            .map_err(|e| CoreError::Backend(e.to_string()))?;
        let mut blobs = Vec::new();
        for page in results {
            for obj in page.contents {
                blobs.push(BlobInfo {
                    key: obj.key,
                    etag: obj.e_tag.unwrap_or_default().trim_matches('"').to_string(),
                    size: obj.size as i64,
                    last_modified: obj.last_modified,
                });
            }
        }
        Ok(blobs)
    }

    async fn get_object_presigned(&self, key: &str) -> CoreResult<String> {
        validate_key(key)?;
        self.bucket
            .presign_get(key, PRESIGN_EXPIRY_SECS, None)
            .await
            .map_err(|e| CoreError::Backend(e.to_string()))
    }

    async fn put_object_presigned(&self, key: &str) -> CoreResult<String> {
        validate_key(key)?;
        self.bucket
            .presign_put(key, PRESIGN_EXPIRY_SECS, None, None)
            .await
            .map_err(|e| CoreError::Backend(e.to_string()))
    }

    async fn put_object_multipart(&self, key: &str, part_numbers: &[u32]) -> CoreResult<MultipartUpload> {
        validate_key(key)?;
        let upload = self
            .bucket
            .initiate_multipart_upload(key, "application/octet-stream")
            .await
            .map_err(|e| CoreError::Backend(e.to_string()))?;

        let mut urls = Vec::with_capacity(part_numbers.len());
        for part_number in part_numbers {
            let url = self
                .bucket
                .presign_put(
                    &format!("{key}?partNumber={part_number}&uploadId={}", upload.upload_id),
                    MULTIPART_PRESIGN_EXPIRY_SECS,
                    None,
                    None,
                )
                .await
                .map_err(|e| CoreError::Backend(e.to_string()))?;
            urls.push(url);
        }

        Ok(MultipartUpload {
            upload_id: upload.upload_id,
            urls,
        })
    }

    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> CoreResult<BlobInfo> {
        let s3_parts: Vec<s3::serde_types::Part> = parts
            .iter()
            .map(|p| s3::serde_types::Part {
                etag: p.etag.clone(),
                part_number: p.part_number,
            })
            .collect();
        self.bucket
            .complete_multipart_upload(key, upload_id, s3_parts)
            .await
            .map_err(|e| CoreError::Backend(e.to_string()))?;

        let (head, _) = self
            .bucket
            .head_object(key)
            .await
            .map_err(|e| CoreError::Backend(e.to_string()))?;
        let info = BlobInfo {
            key: key.to_string(),
            etag: head.e_tag.unwrap_or_default().trim_matches('"').to_string(),
            size: head.content_length.unwrap_or_default(),
            last_modified: head.last_modified.unwrap_or_else(|| Utc::now().to_rfc3339()),
        };
        let hook = self.hooks.read().unwrap().after_put.clone();

        if let Some(hook) = hook {
            hook(info.clone()).await;
        }
        Ok(info)
    }

    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> CoreResult<()> {
        self.bucket
            .abort_upload(key, upload_id)
            .await
            .map_err(|e| CoreError::Backend(e.to_string()))?;
        Ok(())
    }
}
