//! Hop-by-hop propagation of an effect through the network.

use serde::Serialize;
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::graph::{GraphSnapshot, ReachQuery};
use crate::types::{EdgeId, NodeId, Point};

/// Accepted range for spread hop limits.
pub const SPREAD_HOPS: std::ops::RangeInclusive<u32> = 1..=20;

/// Accepted range for nearby-edge hop limits.
pub const NEARBY_HOPS: std::ops::RangeInclusive<u32> = 1..=10;

/// An edge tagged with the hop at which the effect reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HopEdge {
    /// The edge.
    pub edge_id: EdgeId,
    /// Hops from the origin node to the nearer reached endpoint.
    pub hop: u32,
}

/// Edges reached from an origin, ordered by `(hop, edge_id)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpreadResult {
    /// The edge the origin was snapped to, or started from.
    pub origin_edge: EdgeId,
    /// Source node of the origin edge.
    pub origin_node: NodeId,
    /// The hop limit applied.
    pub max_hops: u32,
    /// Reached edges.
    pub edges: Vec<HopEdge>,
}

fn check_hops(hops: u32, range: &std::ops::RangeInclusive<u32>, name: &str) -> Result<()> {
    if range.contains(&hops) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "{name} must be between {} and {}, got {hops}",
            range.start(),
            range.end()
        )))
    }
}

/// Propagate from the edge nearest to `origin` for up to `max_hops` hops.
///
/// # Errors
///
/// - `Error::InvalidInput` if `max_hops` is outside `1..=20` or the point is
///   not a valid coordinate
/// - `Error::NotFound` if no edge lies within the search radius
pub fn spread(
    snapshot: &GraphSnapshot,
    origin: Point,
    max_hops: u32,
    config: &AnalysisConfig,
) -> Result<SpreadResult> {
    check_hops(max_hops, &SPREAD_HOPS, "max_hops")?;
    let nearest = snapshot.nearest_edge(origin, config.search_radius_m)?;
    propagate(snapshot, nearest.edge_id, max_hops, config)
}

/// Edges within `hops` hops of a known edge's source node.
///
/// # Errors
///
/// - `Error::InvalidInput` if `hops` is outside `1..=10`
/// - `Error::NotFound` if the edge is unknown
pub fn nearby_edges(
    snapshot: &GraphSnapshot,
    edge_id: EdgeId,
    hops: u32,
    config: &AnalysisConfig,
) -> Result<SpreadResult> {
    check_hops(hops, &NEARBY_HOPS, "hops")?;
    propagate(snapshot, edge_id, hops, config)
}

fn propagate(
    snapshot: &GraphSnapshot,
    edge_id: EdgeId,
    max_hops: u32,
    config: &AnalysisConfig,
) -> Result<SpreadResult> {
    let origin_edge = snapshot
        .edge(edge_id)
        .ok_or_else(|| Error::edge_not_found(edge_id))?;
    let origin_node = origin_edge.source;

    let query = ReachQuery::within_hops(max_hops).with_node_limit(config.max_traversal_nodes);
    let reach = snapshot.reachable(origin_node, &query)?;

    let mut edges: Vec<HopEdge> = snapshot
        .edges()
        .iter()
        .filter_map(|edge| {
            let hop = match (reach.hops(edge.source), reach.hops(edge.target)) {
                (Some(a), Some(b)) => a.min(b),
                (Some(h), None) | (None, Some(h)) => h,
                (None, None) => return None,
            };
            Some(HopEdge {
                edge_id: edge.id,
                hop: hop.min(max_hops),
            })
        })
        .collect();
    edges.sort_by_key(|e| (e.hop, e.edge_id));

    debug!(
        origin_edge = %edge_id,
        origin_node = %origin_node,
        max_hops,
        edges = edges.len(),
        "Spread computed"
    );

    Ok(SpreadResult {
        origin_edge: edge_id,
        origin_node,
        max_hops,
        edges,
    })
}
