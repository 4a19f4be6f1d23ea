// src/lib.rs

//! Multi-tenant datasite core: access-control engine, object store
//! façade, datasite coordinator, and realtime hub.

pub mod config;
pub mod core;
pub mod server;
