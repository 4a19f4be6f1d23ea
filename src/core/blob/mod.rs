// src/core/blob/mod.rs

//! The object store façade: a backend capability trait, a relational
//! metadata index, a periodic reconciler, and the service that wires them
//! together with post-write hooks (spec §4.7-§4.10).

pub mod backend;
pub mod index;
pub mod indexer;
pub mod info;
pub mod s3;
pub mod service;

pub use backend::{BlobBackend, CompletedPart, Hooks, MemoryBackend, MultipartUpload};
pub use index::{BlobIndex, BlobIndexConfig, BulkUpdateCounts};
pub use indexer::BlobIndexer;
pub use info::{validate_key, BlobChangeEvent, BlobInfo, ChangeKind};
pub use s3::{S3Backend, S3Config};
pub use service::{BlobService, HasHooks};
