// src/core/mod.rs

//! The central module containing the core logic and data structures of the
//! datasite platform: the access-control engine, the object store façade,
//! the datasite coordinator, and the realtime hub.

pub mod acl;
pub mod blob;
pub mod datasite;
pub mod errors;
pub mod hub;
pub mod metrics;
pub mod path;
pub mod pipeline;

pub use errors::{CoreError, CoreResult};
