//! HTTP API for mainline network analysis.
//!
//! Serves the engine's queries as JSON and `GeoJSON` over Axum.
//!
//! # Routes
//!
//! ## Graph
//! - `GET /graph/status` - Whether a graph is loaded, and its edge count
//! - `GET /graph/nearest_edge` - Edge closest to a point
//! - `GET /graph/nearby_edges/{edge_id}` - Edges within a few hops of an edge
//! - `GET /graph/outage/{edge_id}` - Buildings cut off by an edge failure
//! - `GET /graph/spread` - Hop-by-hop propagation from a point
//! - `GET /graph/worst_day` - The most damaging single failure
//!
//! ## Other
//! - `GET /health` - Liveness check
//! - `GET /network/stats` - Aggregate network statistics
//!
//! Errors are returned as `{"detail": "..."}`.

pub mod error;
pub mod features;
pub mod handlers;
pub mod models;

pub use error::{ApiError, Result};

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use mainline::Network;
use mainline::worst_day::{MessageChooser, RandomChooser};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state of the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// The analysed network.
    pub network: Arc<Network>,
    /// Headline picker for worst-day reports.
    pub chooser: Arc<dyn MessageChooser>,
}

impl AppState {
    /// State with random worst-day headlines.
    #[must_use]
    pub fn new(network: Network) -> Self {
        Self::with_chooser(network, RandomChooser)
    }

    /// State with a specific headline picker.
    #[must_use]
    pub fn with_chooser(network: Network, chooser: impl MessageChooser + 'static) -> Self {
        Self {
            network: Arc::new(network),
            chooser: Arc::new(chooser),
        }
    }
}

/// Build the router with CORS open to any origin and request tracing.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/graph/status", get(handlers::status))
        .route("/graph/nearest_edge", get(handlers::nearest_edge))
        .route("/graph/nearby_edges/{edge_id}", get(handlers::nearby_edges))
        .route("/graph/outage/{edge_id}", get(handlers::outage))
        .route("/graph/spread", get(handlers::spread))
        .route("/graph/worst_day", get(handlers::worst_day))
        .route("/network/stats", get(handlers::network_stats))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
