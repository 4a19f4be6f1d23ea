// src/core/blob/service.rs

//! Wires the backend, index, and indexer together and installs the
//! post-write hooks that keep the index and blob-change subscribers
//! current (spec §4.10). Grounded on the teacher's
//! `core::pubsub::PubSubManager` for the concurrent-subscriber fanout
//! shape and `server::spawner::spawn_all` for background-task ownership.

use super::backend::{BlobBackend, Hooks};
use super::index::BlobIndex;
use super::info::{BlobChangeEvent, ChangeKind};
use super::indexer::BlobIndexer;
use crate::core::errors::CoreResult;
use crate::core::metrics;
use bytes::Bytes;
use futures::future::BoxFuture;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;

type Subscriber = Arc<dyn Fn(BlobChangeEvent) -> BoxFuture<'static, ()> + Send + Sync>;

/// Composes a backend, its relational index, and the periodic reconciler
/// (spec §4.10). Subscribers register via `on_blob_change`; callbacks run
/// concurrently with respect to one another and never block the backend
/// path (spec §4.10/§5).
pub struct BlobService {
    backend: Arc<dyn BlobBackend>,
    index: Arc<BlobIndex>,
    subscribers: Arc<RwLock<Vec<Subscriber>>>,
    reconcile_interval: Duration,
}

impl BlobService {
    pub fn new(backend: Arc<dyn BlobBackend>, index: Arc<BlobIndex>, reconcile_interval: Duration) -> Self {
        Self {
            backend,
            index,
            subscribers: Arc::new(RwLock::new(Vec::new())),
            reconcile_interval,
        }
    }

    /// Registers a blob-change subscriber.
    pub fn on_blob_change<F>(&self, callback: F)
    where
        F: Fn(BlobChangeEvent) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        self.subscribers.write().unwrap().push(Arc::new(callback));
    }

    fn fan_out(subscribers: &Arc<RwLock<Vec<Subscriber>>>, event: BlobChangeEvent) {
        let subs = subscribers.read().unwrap().clone();
        for sub in subs {
            let event = event.clone();
            tokio::spawn(async move { sub(event).await });
        }
    }

    fn hooks(&self) -> Hooks {
        let index = self.index.clone();
        let subscribers = self.subscribers.clone();

        let put_index = index.clone();
        let put_subs = subscribers.clone();
        let after_put = Arc::new(move |info: super::info::BlobInfo| -> BoxFuture<'static, ()> {
            let index = put_index.clone();
            let subs = put_subs.clone();
            Box::pin(async move {
                let key = info.key.clone();
                if let Err(e) = index.set(&info).await {
                    tracing::warn!("blob index update failed for {}: {}", key, e);
                }
                metrics::blob_op("put");
                Self::fan_out(&subs, BlobChangeEvent { key, kind: ChangeKind::Put });
            })
        });

        let copy_index = index.clone();
        let copy_subs = subscribers.clone();
        let after_copy = Arc::new(move |info: super::info::BlobInfo| -> BoxFuture<'static, ()> {
            let index = copy_index.clone();
            let subs = copy_subs.clone();
            Box::pin(async move {
                let key = info.key.clone();
                if let Err(e) = index.set(&info).await {
                    tracing::warn!("blob index update failed for {}: {}", key, e);
                }
                metrics::blob_op("copy");
                Self::fan_out(&subs, BlobChangeEvent { key, kind: ChangeKind::Copy });
            })
        });

        let delete_index = index.clone();
        let delete_subs = subscribers.clone();
        let after_delete = Arc::new(move |key: String| -> BoxFuture<'static, ()> {
            let index = delete_index.clone();
            let subs = delete_subs.clone();
            Box::pin(async move {
                if let Err(e) = index.remove(&key).await {
                    tracing::warn!("blob index removal failed for {}: {}", key, e);
                }
                metrics::blob_op("delete");
                Self::fan_out(&subs, BlobChangeEvent { key, kind: ChangeKind::Delete });
            })
        });

        Hooks {
            after_put: Some(after_put),
            after_copy: Some(after_copy),
            after_delete: Some(after_delete),
        }
    }

    /// Installs the post-write hooks and spawns the periodic reconciler.
    /// Requires `backend` to be the same `Arc` passed to `new`, exposed
    /// with its own `set_hooks` — both shipped backends (`S3Backend`,
    /// `MemoryBackend`) provide it.
    pub fn start<B>(&self, backend_for_hooks: &B, shutdown_rx: broadcast::Receiver<()>) -> tokio::task::JoinHandle<()>
    where
        B: HasHooks + ?Sized,
    {
        backend_for_hooks.set_hooks(self.hooks());

        let indexer = BlobIndexer::new(self.backend.clone(), self.index.clone(), self.reconcile_interval);
        tokio::spawn(indexer.run(shutdown_rx))
    }

    pub async fn get_object(&self, key: &str) -> CoreResult<Bytes> {
        self.backend.get_object(key).await
    }

    pub async fn put_object(&self, key: &str, body: Bytes) -> CoreResult<super::info::BlobInfo> {
        self.backend.put_object(key, body).await
    }

    pub async fn delete_object(&self, key: &str) -> CoreResult<()> {
        self.backend.delete_object(key).await
    }

    pub fn index(&self) -> &Arc<BlobIndex> {
        &self.index
    }
}

/// Backends that expose a way to install hooks after construction. Both
/// `S3Backend` and `MemoryBackend` implement this; it is kept separate
/// from `BlobBackend` since hook installation is a one-time wiring step,
/// not a per-call capability.
pub trait HasHooks {
    fn set_hooks(&self, hooks: Hooks);
}

impl HasHooks for super::backend::MemoryBackend {
    fn set_hooks(&self, hooks: Hooks) {
        super::backend::MemoryBackend::set_hooks(self, hooks)
    }
}

impl HasHooks for super::s3::S3Backend {
    fn set_hooks(&self, hooks: Hooks) {
        super::s3::S3Backend::set_hooks(self, hooks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::blob::backend::MemoryBackend;
    use crate::core::blob::index::BlobIndexConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn put_object_updates_index_and_notifies_subscriber() {
        let backend = Arc::new(MemoryBackend::new());
        let index = Arc::new(BlobIndex::connect(&BlobIndexConfig::default()).await.unwrap());
        let service = BlobService::new(backend.clone(), index.clone(), Duration::from_secs(900));

        let notified = Arc::new(AtomicUsize::new(0));
        let notified2 = notified.clone();
        service.on_blob_change(move |event| {
            let notified = notified2.clone();
            Box::pin(async move {
                assert_eq!(event.key, "a.txt");
                notified.fetch_add(1, Ordering::SeqCst);
            })
        });

        let (_tx, rx) = broadcast::channel(1);
        let _handle = service.start(backend.as_ref(), rx);

        service.put_object("a.txt", Bytes::from_static(b"hi")).await.unwrap();

        // Hooks run concurrently with respect to subscribers; give the
        // spawned subscriber task a chance to run.
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let indexed = index.get("a.txt").await.unwrap();
        assert!(indexed.is_some());
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }
}
