//! Error types for mainline operations.
//!
//! A single [`Error`] enum covers every failure the engine can report. Callers
//! that sit behind a transport (the HTTP layer, the CLI) use
//! [`Error::is_input_error`] and [`Error::is_internal_error`] to decide how a
//! failure is surfaced.
//!
//! ## Error Categorization
//!
//! Uses a 4xx/5xx style split:
//! - Input problems (caller's fault): unknown ids, out-of-range parameters,
//!   inconsistent network data
//! - Internal problems (our fault or the environment's): storage, I/O,
//!   configuration, traversal limits, cancellation
//!
//! A zero-impact outage is *not* an error; it is an empty `OutageImpact`.

use thiserror::Error;

/// Result type for mainline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for mainline operations.
#[derive(Debug, Error)]
pub enum Error {
    /// An edge, node or building id is unknown, or no edge lies near a point.
    #[error("not found: {0}")]
    NotFound(String),

    /// A query parameter or input record is missing, malformed or out of range.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The graph store could not be opened.
    #[error("cannot connect to graph store at {path}")]
    Connection {
        /// Location of the store that failed to open.
        path: String,
        /// Underlying `SQLite` failure.
        #[source]
        source: rusqlite::Error,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration or arguments
    #[error("configuration error: {0}")]
    Config(String),

    /// A traversal reached more nodes than the configured budget allows.
    #[error("traversal exceeded the limit of {limit} nodes")]
    TraversalLimitExceeded {
        /// The node budget that was exceeded.
        limit: usize,
    },

    /// A batch job observed its cancellation token.
    #[error("operation cancelled after {processed} of {total} edges")]
    Cancelled {
        /// Edges fully processed before the job stopped.
        processed: usize,
        /// Edges the job was asked to process.
        total: usize,
    },

    /// Broken internal invariant (poisoned lock, corrupted snapshot).
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for an unknown edge.
    #[must_use]
    pub fn edge_not_found(edge_id: crate::EdgeId) -> Self {
        Self::NotFound(format!("edge {edge_id} not found"))
    }

    /// Returns `true` if this is an input problem (4xx-style).
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::InvalidInput(_))
    }

    /// Returns `true` if this is an internal problem (5xx-style).
    #[must_use]
    pub fn is_internal_error(&self) -> bool {
        !self.is_input_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EdgeId;

    #[test]
    fn error_categorization() {
        assert!(Error::NotFound("edge 1".into()).is_input_error());
        assert!(Error::InvalidInput("hops".into()).is_input_error());
        assert!(!Error::InvalidInput("hops".into()).is_internal_error());

        assert!(Error::Config("bad".into()).is_internal_error());
        assert!(Error::TraversalLimitExceeded { limit: 10 }.is_internal_error());
        assert!(
            Error::Cancelled {
                processed: 1,
                total: 2
            }
            .is_internal_error()
        );
    }

    #[test]
    fn edge_not_found_names_the_edge() {
        let display = Error::edge_not_found(EdgeId(42)).to_string();
        assert!(display.contains("42"), "got: {display}");
    }

    #[test]
    fn connection_error_keeps_source() {
        let err = Error::Connection {
            path: "/nope/mainline.db".into(),
            source: rusqlite::Error::InvalidQuery,
        };
        assert!(err.to_string().contains("/nope/mainline.db"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
