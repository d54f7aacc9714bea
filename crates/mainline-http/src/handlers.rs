//! Request handlers.
//!
//! Every analysis call runs on the blocking pool against one snapshot taken
//! at the start of the request.

use axum::Json;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use geojson::{Feature, FeatureCollection};
use mainline::outage::outage_impact;
use mainline::spread::{self, SpreadResult};
use mainline::{EdgeId, GraphSnapshot, NetworkStats, Point};

use crate::AppState;
use crate::error::{ApiError, Result};
use crate::features::{collection, feature};
use crate::models::{
    HealthResponse, NearbyQuery, OutageResponse, PointQuery, SpreadQuery, StatusResponse,
    WorstDayResponse,
};

/// Run `f` on the blocking pool with a clone of the state.
async fn blocking<T, F>(state: &AppState, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&AppState) -> mainline::Result<T> + Send + 'static,
{
    let state = state.clone();
    Ok(tokio::task::spawn_blocking(move || f(&state)).await??)
}

fn query_params<T>(query: std::result::Result<Query<T>, QueryRejection>) -> Result<T> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))
}

fn edge_param(path: std::result::Result<Path<i64>, PathRejection>) -> Result<EdgeId> {
    path.map(|Path(id)| EdgeId(id))
        .map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))
}

/// Reached edges as line features with `edge_id` and `hop` properties.
fn hop_collection(snapshot: &GraphSnapshot, result: &SpreadResult) -> FeatureCollection {
    collection(
        result
            .edges
            .iter()
            .filter_map(|entry| {
                snapshot.edge(entry.edge_id).map(|edge| {
                    let mut reached = feature(edge.geometry.clone());
                    reached.set_property("edge_id", entry.edge_id.as_i64());
                    reached.set_property("hop", entry.hop);
                    reached
                })
            })
            .collect(),
    )
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

/// `GET /graph/status`
pub async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>> {
    // May reload the snapshot from the store
    let status = blocking(&state, |state| state.network.status()).await?;
    Ok(Json(StatusResponse {
        pgrouting_available: status.graph_loaded,
        edge_count: status.edge_count,
    }))
}

/// `GET /graph/nearest_edge?lon=&lat=`
pub async fn nearest_edge(
    State(state): State<AppState>,
    query: std::result::Result<Query<PointQuery>, QueryRejection>,
) -> Result<Json<Feature>> {
    let params = query_params(query)?;
    let feature = blocking(&state, move |state| {
        let snapshot = state.network.snapshot()?;
        let radius = state.network.config().analysis.search_radius_m;
        let nearest = snapshot.nearest_edge(Point::new(params.lon, params.lat), radius)?;
        let edge = snapshot
            .edge(nearest.edge_id)
            .ok_or_else(|| mainline::Error::edge_not_found(nearest.edge_id))?;
        let mut located = feature(edge.geometry.clone());
        located.set_property("edge_id", nearest.edge_id.as_i64());
        located.set_property("distance_meters", nearest.distance_m);
        Ok(located)
    })
    .await?;
    Ok(Json(feature))
}

/// `GET /graph/nearby_edges/{edge_id}?hops=`
pub async fn nearby_edges(
    State(state): State<AppState>,
    path: std::result::Result<Path<i64>, PathRejection>,
    query: std::result::Result<Query<NearbyQuery>, QueryRejection>,
) -> Result<Json<FeatureCollection>> {
    let edge_id = edge_param(path)?;
    let params = query_params(query)?;
    let collection = blocking(&state, move |state| {
        let snapshot = state.network.snapshot()?;
        let result = spread::nearby_edges(
            &snapshot,
            edge_id,
            params.hops,
            &state.network.config().analysis,
        )?;
        Ok(hop_collection(&snapshot, &result))
    })
    .await?;
    Ok(Json(collection))
}

/// `GET /graph/outage/{edge_id}`
pub async fn outage(
    State(state): State<AppState>,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<OutageResponse>> {
    let edge_id = edge_param(path)?;
    let body = blocking(&state, move |state| {
        let snapshot = state.network.snapshot()?;
        let impact = outage_impact(&snapshot, edge_id, &state.network.config().analysis)?;
        Ok(OutageResponse::from_impact(&snapshot, &impact))
    })
    .await?;
    Ok(Json(body))
}

/// `GET /graph/spread?lon=&lat=&max_hops=`
pub async fn spread(
    State(state): State<AppState>,
    query: std::result::Result<Query<SpreadQuery>, QueryRejection>,
) -> Result<Json<FeatureCollection>> {
    let params = query_params(query)?;
    let collection = blocking(&state, move |state| {
        let snapshot = state.network.snapshot()?;
        let analysis = &state.network.config().analysis;
        let max_hops = params.max_hops.unwrap_or(analysis.default_spread_hops);
        let result = spread::spread(
            &snapshot,
            Point::new(params.lon, params.lat),
            max_hops,
            analysis,
        )?;
        Ok(hop_collection(&snapshot, &result))
    })
    .await?;
    Ok(Json(collection))
}

/// `GET /graph/worst_day`
pub async fn worst_day(State(state): State<AppState>) -> Result<Json<WorstDayResponse>> {
    let body = blocking(&state, |state| {
        let snapshot = state.network.snapshot()?;
        let report = mainline::worst_day::worst_day(
            &snapshot,
            &state.network.config().analysis,
            state.chooser.as_ref(),
        )?;
        Ok(WorstDayResponse::from_report(&snapshot, report))
    })
    .await?;
    Ok(Json(body))
}

/// `GET /network/stats`
pub async fn network_stats(State(state): State<AppState>) -> Result<Json<NetworkStats>> {
    let stats = blocking(&state, |state| state.network.network_stats()).await?;
    Ok(Json(stats))
}
