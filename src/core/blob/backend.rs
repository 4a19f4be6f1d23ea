// src/core/blob/backend.rs

//! The object-store capability trait (spec §4.7) and an in-memory test
//! double. Grounded on the teacher's own `async_trait` polymorphism idiom
//! (`core::persistence::AofLoader`-style trait objects); the `MemoryBackend`
//! plays the role the example pack's `s5_store_memory` plays for tests that
//! must not require network access.

use super::info::BlobInfo;
use crate::core::errors::{CoreError, CoreResult};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;

/// Result of initiating a multipart upload: the upload id plus one
/// presigned URL per part number requested.
#[derive(Debug, Clone)]
pub struct MultipartUpload {
    pub upload_id: String,
    pub urls: Vec<String>,
}

/// A single completed part in a multipart upload.
#[derive(Debug, Clone)]
pub struct CompletedPart {
    pub part_number: u32,
    pub etag: String,
}

/// Capability set an object-store backend must implement (spec §4.7). All
/// write paths validate keys before touching the underlying store.
#[async_trait]
pub trait BlobBackend: Send + Sync {
    async fn get_object(&self, key: &str) -> CoreResult<Bytes>;
    async fn put_object(&self, key: &str, body: Bytes) -> CoreResult<BlobInfo>;
    async fn copy_object(&self, src: &str, dst: &str) -> CoreResult<BlobInfo>;
    async fn delete_object(&self, key: &str) -> CoreResult<()>;
    async fn list_objects(&self) -> CoreResult<Vec<BlobInfo>>;
    async fn get_object_presigned(&self, key: &str) -> CoreResult<String>;
    async fn put_object_presigned(&self, key: &str) -> CoreResult<String>;
    async fn put_object_multipart(&self, key: &str, part_numbers: &[u32]) -> CoreResult<MultipartUpload>;
    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> CoreResult<BlobInfo>;
    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> CoreResult<()>;
}

type HookFuture = futures::future::BoxFuture<'static, ()>;
type PutHook = Arc<dyn Fn(BlobInfo) -> HookFuture + Send + Sync>;
type CopyHook = Arc<dyn Fn(BlobInfo) -> HookFuture + Send + Sync>;
type DeleteHook = Arc<dyn Fn(String) -> HookFuture + Send + Sync>;

/// Post-write hook slots, invoked (and awaited) by the backend after the
/// underlying call succeeds, before the caller observes success (spec
/// §4.7/§4.10/§5's ordering guarantee). Set once at construction by
/// `BlobService::new`.
#[derive(Clone, Default)]
pub struct Hooks {
    pub after_put: Option<PutHook>,
    pub after_copy: Option<CopyHook>,
    pub after_delete: Option<DeleteHook>,
}

/// An in-memory backend for tests: no network access, no presign math
/// beyond a fabricated URL string, synchronous-in-spirit multipart (parts
/// are buffered and concatenated on complete).
pub struct MemoryBackend {
    objects: DashMap<String, Bytes>,
    uploads: DashMap<String, Vec<(u32, Bytes)>>,
    hooks: std::sync::RwLock<Hooks>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
            uploads: DashMap::new(),
            hooks: std::sync::RwLock::new(Hooks::default()),
        }
    }

    pub fn set_hooks(&self, hooks: Hooks) {
        *self.hooks.write().unwrap() = hooks;
    }

    fn info_for(key: &str, body: &Bytes) -> BlobInfo {
        BlobInfo {
            key: key.to_string(),
            etag: format!("{:x}", md5_stub(body)),
            size: body.len() as i64,
            last_modified: Utc::now().to_rfc3339(),
        }
    }
}

/// A cheap, non-cryptographic stand-in for an S3 ETag in the test double;
/// never used outside `MemoryBackend`.
fn md5_stub(body: &Bytes) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    body.hash(&mut hasher);
    hasher.finish()
}

#[async_trait]
impl BlobBackend for MemoryBackend {
    async fn get_object(&self, key: &str) -> CoreResult<Bytes> {
        super::info::validate_key(key)?;
        self.objects
            .get(key)
            .map(|v| v.clone())
            .ok_or(CoreError::NotFound)
    }

    async fn put_object(&self, key: &str, body: Bytes) -> CoreResult<BlobInfo> {
        super::info::validate_key(key)?;
        let info = Self::info_for(key, &body);
        self.objects.insert(key.to_string(), body);
        let hook = self.hooks.read().unwrap().after_put.clone();

        if let Some(hook) = hook {
            hook(info.clone()).await;
        }
        Ok(info)
    }

    async fn copy_object(&self, src: &str, dst: &str) -> CoreResult<BlobInfo> {
        super::info::validate_key(dst)?;
        let body = self.objects.get(src).map(|v| v.clone()).ok_or(CoreError::NotFound)?;
        let info = Self::info_for(dst, &body);
        self.objects.insert(dst.to_string(), body);
        let hook = self.hooks.read().unwrap().after_copy.clone();

        if let Some(hook) = hook {
            hook(info.clone()).await;
        }
        Ok(info)
    }

    async fn delete_object(&self, key: &str) -> CoreResult<()> {
        self.objects.remove(key);
        let hook = self.hooks.read().unwrap().after_delete.clone();

        if let Some(hook) = hook {
            hook(key.to_string()).await;
        }
        Ok(())
    }

    async fn list_objects(&self) -> CoreResult<Vec<BlobInfo>> {
        Ok(self
            .objects
            .iter()
            .map(|e| Self::info_for(e.key(), e.value()))
            .collect())
    }

    async fn get_object_presigned(&self, key: &str) -> CoreResult<String> {
        super::info::validate_key(key)?;
        Ok(format!("memory://{key}?expires=300"))
    }

    async fn put_object_presigned(&self, key: &str) -> CoreResult<String> {
        super::info::validate_key(key)?;
        Ok(format!("memory://{key}?expires=300&method=PUT"))
    }

    async fn put_object_multipart(&self, key: &str, part_numbers: &[u32]) -> CoreResult<MultipartUpload> {
        super::info::validate_key(key)?;
        let upload_id = uuid::Uuid::new_v4().to_string();
        self.uploads.insert(upload_id.clone(), Vec::new());
        let urls = part_numbers
            .iter()
            .map(|n| format!("memory://{key}?uploadId={upload_id}&partNumber={n}&expires=600"))
            .collect();
        Ok(MultipartUpload { upload_id, urls })
    }

    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> CoreResult<BlobInfo> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(part.etag.as_bytes());
        }
        self.uploads.remove(upload_id);
        let body = Bytes::from(body);
        let info = Self::info_for(key, &body);
        self.objects.insert(key.to_string(), body);
        let hook = self.hooks.read().unwrap().after_put.clone();

        if let Some(hook) = hook {
            hook(info.clone()).await;
        }
        Ok(info)
    }

    async fn abort_multipart_upload(&self, _key: &str, upload_id: &str) -> CoreResult<()> {
        self.uploads.remove(upload_id);
        Ok(())
    }
}
