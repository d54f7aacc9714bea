//! Request parameters and response bodies.
//!
//! Field names follow the public API contract, which is why some differ from
//! the engine's own types (`distance_meters`, `pgrouting_available`).

use mainline::outage::OutageImpact;
use mainline::worst_day::{WorstDay, WorstPipe};
use geojson::{FeatureCollection, Geometry, Value};
use mainline::{EdgeId, GraphSnapshot, PipeClass};
use serde::{Deserialize, Serialize};

use crate::features::{collection, feature};

/// Query for `/graph/nearest_edge`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PointQuery {
    /// Longitude.
    pub lon: f64,
    /// Latitude.
    pub lat: f64,
}

/// Query for `/graph/nearby_edges/{edge_id}`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct NearbyQuery {
    /// Hop limit, 1 when omitted.
    #[serde(default = "default_nearby_hops")]
    pub hops: u32,
}

fn default_nearby_hops() -> u32 {
    1
}

/// Query for `/graph/spread`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SpreadQuery {
    /// Longitude.
    pub lon: f64,
    /// Latitude.
    pub lat: f64,
    /// Hop limit; the configured default when omitted.
    pub max_hops: Option<u32>,
}

/// Body of `/graph/status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    /// Whether a routable graph is loaded.
    pub pgrouting_available: bool,
    /// Number of edges.
    pub edge_count: usize,
}

/// Body of `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `healthy` when the process answers.
    pub status: &'static str,
}

/// Aggregate figures for an outage.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OutageStats {
    /// Buildings that lose supply.
    pub affected_building_count: usize,
    /// Service connections on the cut-off pipes.
    pub affected_service_count: usize,
    /// Their combined length.
    pub total_service_length_m: f64,
}

/// Body of `/graph/outage/{edge_id}`.
#[derive(Debug, Clone, Serialize)]
pub struct OutageResponse {
    /// Affected building polygons, each with a `building_id` property.
    #[serde(flatten)]
    pub collection: FeatureCollection,
    /// Totals.
    pub stats: OutageStats,
}

impl OutageResponse {
    /// An outage that affects nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            collection: collection(Vec::new()),
            stats: OutageStats::default(),
        }
    }

    /// Render `impact` with building geometry from `snapshot`.
    ///
    /// The building count in `stats` always equals the number of features.
    #[must_use]
    pub fn from_impact(snapshot: &GraphSnapshot, impact: &OutageImpact) -> Self {
        let features: Vec<_> = impact
            .affected_buildings
            .iter()
            .filter_map(|&id| snapshot.building(id))
            .map(|building| {
                let mut footprint = feature(building.geometry.clone());
                footprint.set_property("building_id", building.id.as_i64());
                footprint
            })
            .collect();

        Self {
            stats: OutageStats {
                affected_building_count: features.len(),
                affected_service_count: impact.affected_service_count,
                total_service_length_m: impact.total_service_length_m,
            },
            collection: collection(features),
        }
    }
}

/// The failing pipe in a worst-day body.
#[derive(Debug, Clone, Serialize)]
pub struct WorstPipeBody {
    /// Edge backed by the pipe.
    pub edge_id: EdgeId,
    /// Pipe tier.
    pub class: PipeClass,
    /// Diameter in millimetres.
    pub diameter_mm: u32,
    /// Material.
    pub material: String,
    /// Length in metres.
    pub length_m: f64,
    /// Pipe centreline.
    pub geometry: Geometry,
}

impl From<WorstPipe> for WorstPipeBody {
    fn from(pipe: WorstPipe) -> Self {
        Self {
            edge_id: pipe.edge_id,
            class: pipe.class,
            diameter_mm: pipe.diameter_mm,
            material: pipe.material,
            length_m: pipe.length_m,
            geometry: Geometry::new(Value::from(&pipe.geometry)),
        }
    }
}

/// Body of `/graph/worst_day`.
#[derive(Debug, Clone, Serialize)]
pub struct WorstDayResponse {
    /// Outage of the worst edge.
    #[serde(flatten)]
    pub outage: OutageResponse,
    /// The failing pipe, `null` when nothing scores above zero.
    pub worst_pipe: Option<WorstPipeBody>,
    /// Human-readable description.
    pub summary: String,
    /// Headline.
    pub message: Option<&'static str>,
}

impl WorstDayResponse {
    /// Render a worst-day report.
    #[must_use]
    pub fn from_report(snapshot: &GraphSnapshot, report: WorstDay) -> Self {
        Self {
            outage: report
                .impact
                .as_ref()
                .map_or_else(OutageResponse::empty, |impact| {
                    OutageResponse::from_impact(snapshot, impact)
                }),
            worst_pipe: report.worst_pipe.map(WorstPipeBody::from),
            summary: report.summary,
            message: report.message,
        }
    }
}
