// src/core/metrics.rs

//! Defines and registers Prometheus metrics for the ACL engine, the blob
//! service, and the realtime hub.
//!
//! Metrics are registered once globally via `once_cell::sync::Lazy`, kept
//! instead of the teacher's `lazy_static` since that dependency was
//! dropped as part of narrowing the crate to this domain.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_int_counter, register_int_counter_vec, CounterVec, IntCounter,
    IntCounterVec, TextEncoder,
};

// --- ACL counters ---

/// The total number of ACL permission checks, labeled by outcome (`allow`/`deny`).
static ACL_CHECKS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "syftbox_acl_checks_total",
        "Total number of ACL permission checks, labeled by outcome.",
        &["result"]
    )
    .unwrap()
});

/// The total number of ACL rule cache hits.
static ACL_CACHE_HITS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "syftbox_acl_cache_hits_total",
        "Total number of ACL rule cache hits."
    )
    .unwrap()
});

/// The total number of ACL rule cache misses, including stale-version evictions.
static ACL_CACHE_MISSES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "syftbox_acl_cache_misses_total",
        "Total number of ACL rule cache misses."
    )
    .unwrap()
});

// --- Blob service counters ---

/// The total number of blob backend operations, labeled by operation.
static BLOB_OPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "syftbox_blob_ops_total",
        "Total number of blob backend operations, labeled by operation.",
        &["op"]
    )
    .unwrap()
});

static BLOB_INDEXER_ADDED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "syftbox_blob_indexer_added_total",
        "Total number of blobs added to the index by the reconciler."
    )
    .unwrap()
});

static BLOB_INDEXER_UPDATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "syftbox_blob_indexer_updated_total",
        "Total number of blobs updated in the index by the reconciler."
    )
    .unwrap()
});

static BLOB_INDEXER_DELETED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "syftbox_blob_indexer_deleted_total",
        "Total number of blobs removed from the index by the reconciler."
    )
    .unwrap()
});

// --- Realtime hub counters ---

static HUB_MESSAGES_SENT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "syftbox_hub_messages_sent_total",
        "Total number of websocket messages enqueued to a connection."
    )
    .unwrap()
});

static HUB_MESSAGES_DROPPED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "syftbox_hub_messages_dropped_total",
        "Total number of websocket messages dropped due to backpressure or a closed connection."
    )
    .unwrap()
});

pub fn acl_check(allowed: bool) {
    let label = if allowed { "allow" } else { "deny" };
    ACL_CHECKS_TOTAL.with_label_values(&[label]).inc();
}

pub fn acl_cache_hit() {
    ACL_CACHE_HITS_TOTAL.inc();
}

pub fn acl_cache_miss() {
    ACL_CACHE_MISSES_TOTAL.inc();
}

pub fn blob_op(op: &str) {
    BLOB_OPS_TOTAL.with_label_values(&[op]).inc();
}

pub fn blob_indexer_added() {
    BLOB_INDEXER_ADDED_TOTAL.inc();
}

pub fn blob_indexer_updated() {
    BLOB_INDEXER_UPDATED_TOTAL.inc();
}

pub fn blob_indexer_deleted() {
    BLOB_INDEXER_DELETED_TOTAL.inc();
}

pub fn hub_sent() {
    HUB_MESSAGES_SENT_TOTAL.inc();
}

pub fn hub_dropped() {
    HUB_MESSAGES_DROPPED_TOTAL.inc();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder.encode_to_string(&metric_families).unwrap()
}
