//! Single reporting channel for failures that are swallowed on purpose.
//!
//! The store and the gateway never hand storage or network errors to their
//! callers. Every place that degrades instead reports here, so running with
//! `RUST_LOG=edubridge::degraded=debug` shows each silent fallback.

use std::fmt::Display;

use tracing::{debug, warn};

/// A storage read or write degraded to "empty" or `false`.
pub fn storage_degraded(operation: &str, key: &str, error: &dyn Display) {
    warn!(
        target: "edubridge::degraded",
        operation,
        key,
        error = %error,
        "storage operation degraded"
    );
}

/// A gateway call was answered from the mock catalog.
///
/// `expected` marks fallbacks that were configured rather than caused by a
/// failure; those are logged at debug level only.
pub fn network_fallback(endpoint: &str, reason: &dyn Display, expected: bool) {
    if expected {
        debug!(
            target: "edubridge::degraded",
            endpoint,
            reason = %reason,
            "serving mock data"
        );
    } else {
        warn!(
            target: "edubridge::degraded",
            endpoint,
            reason = %reason,
            "backend call failed, serving mock data"
        );
    }
}

/// A response decoded into a plainer shape than it claimed to have.
pub fn response_downgraded(endpoint: &str, claimed: &str, decoded: &str) {
    debug!(
        target: "edubridge::degraded",
        endpoint,
        claimed,
        decoded,
        "response shape downgraded"
    );
}
