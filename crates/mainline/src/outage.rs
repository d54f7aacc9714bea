//! Single-edge outage impact.
//!
//! An outage is modelled as the removal of one edge. Supply is assumed to
//! enter at the hub node; anything the hub can reach before the removal but
//! not after it has lost supply, along with every pipe touching those nodes
//! and the buildings served from those pipes.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::graph::{GraphSnapshot, ReachQuery, Reachability};
use crate::types::{BuildingId, EdgeId, NodeId, PipeId};

/// Consequences of removing a single edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutageImpact {
    /// The removed edge.
    pub edge_id: EdgeId,
    /// Supply node the analysis was anchored on.
    pub hub: Option<NodeId>,
    /// Nodes that lost their path to the hub, ascending.
    pub disconnected_nodes: Vec<NodeId>,
    /// Pipes touching a disconnected node, ascending.
    pub affected_pipes: Vec<PipeId>,
    /// Buildings served from an affected pipe, ascending and distinct.
    pub affected_buildings: Vec<BuildingId>,
    /// Services on affected pipes.
    pub affected_service_count: usize,
    /// Summed length of those services, in metres.
    pub total_service_length_m: f64,
}

impl OutageImpact {
    /// An impact with nothing affected.
    #[must_use]
    pub fn none(edge_id: EdgeId, hub: Option<NodeId>) -> Self {
        Self {
            edge_id,
            hub,
            disconnected_nodes: Vec::new(),
            affected_pipes: Vec::new(),
            affected_buildings: Vec::new(),
            affected_service_count: 0,
            total_service_length_m: 0.0,
        }
    }

    /// Number of distinct buildings that lose service.
    #[must_use]
    pub fn affected_building_count(&self) -> usize {
        self.affected_buildings.len()
    }

    /// Whether the removal disconnects nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.disconnected_nodes.is_empty()
    }
}

/// Pipes, services and buildings hanging off a set of nodes.
#[derive(Debug, Default)]
pub(crate) struct Consumers {
    pub(crate) pipes: BTreeSet<PipeId>,
    pub(crate) buildings: BTreeSet<BuildingId>,
    pub(crate) service_count: usize,
    pub(crate) service_length_m: f64,
}

impl Consumers {
    /// Collect consumers of every edge touching `nodes`.
    pub(crate) fn of_nodes(snapshot: &GraphSnapshot, nodes: &[NodeId]) -> Self {
        let mut consumers = Self::default();
        for &node in nodes {
            for edge_id in snapshot.incident_edges(node) {
                if let Some(edge) = snapshot.edge(edge_id) {
                    consumers.pipes.insert(edge.pipe_id);
                }
            }
        }
        for &pipe in &consumers.pipes {
            for service in snapshot.services_on(pipe) {
                consumers.buildings.insert(service.building_id);
                consumers.service_count += 1;
                consumers.service_length_m += service.length_m;
            }
        }
        consumers
    }
}

/// Full-graph reachability from the hub under the configured node budget.
///
/// Returns `Ok(None)` when the snapshot has no edges and so no hub.
pub(crate) fn hub_reachability<'s>(
    snapshot: &'s GraphSnapshot,
    config: &AnalysisConfig,
) -> Result<Option<Reachability<'s>>> {
    let Some(hub) = snapshot.hub_node() else {
        return Ok(None);
    };
    let query = ReachQuery::unbounded().with_node_limit(config.max_traversal_nodes);
    snapshot.reachable(hub, &query).map(Some)
}

/// Nodes that lose their path to the hub when `edge_id` is removed.
pub(crate) fn disconnected_by(
    snapshot: &GraphSnapshot,
    before: &Reachability<'_>,
    edge_id: EdgeId,
    config: &AnalysisConfig,
) -> Result<Vec<NodeId>> {
    let query = ReachQuery::unbounded()
        .excluding(edge_id)
        .with_node_limit(config.max_traversal_nodes);
    let after = snapshot.reachable(before.source(), &query)?;
    Ok(before.difference(&after))
}

/// Impact of removing `edge_id`, relative to the hub.
///
/// # Errors
///
/// - `Error::NotFound` if the edge is not in the snapshot
/// - `Error::TraversalLimitExceeded` if a traversal exceeds the node budget
pub fn outage_impact(
    snapshot: &GraphSnapshot,
    edge_id: EdgeId,
    config: &AnalysisConfig,
) -> Result<OutageImpact> {
    if snapshot.edge(edge_id).is_none() {
        return Err(Error::edge_not_found(edge_id));
    }
    let Some(before) = hub_reachability(snapshot, config)? else {
        return Ok(OutageImpact::none(edge_id, None));
    };
    let hub = before.source();

    let disconnected = disconnected_by(snapshot, &before, edge_id, config)?;
    if disconnected.is_empty() {
        debug!(edge_id = %edge_id, hub = %hub, "Edge removal disconnects nothing");
        return Ok(OutageImpact::none(edge_id, Some(hub)));
    }

    #[allow(clippy::cast_precision_loss)]
    let share = disconnected.len() as f64 / before.len() as f64;
    if share > config.max_disconnected_fraction {
        warn!(
            edge_id = %edge_id,
            hub = %hub,
            disconnected = disconnected.len(),
            reachable = before.len(),
            "Single edge removal disconnects an implausible share of the network"
        );
    }

    let consumers = Consumers::of_nodes(snapshot, &disconnected);
    debug!(
        edge_id = %edge_id,
        nodes = disconnected.len(),
        buildings = consumers.buildings.len(),
        "Computed outage impact"
    );

    Ok(OutageImpact {
        edge_id,
        hub: Some(hub),
        disconnected_nodes: disconnected,
        affected_pipes: consumers.pipes.into_iter().collect(),
        affected_buildings: consumers.buildings.into_iter().collect(),
        affected_service_count: consumers.service_count,
        total_service_length_m: consumers.service_length_m,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::snapshot;

    fn config() -> AnalysisConfig {
        AnalysisConfig::default()
    }

    #[test]
    fn leaf_edge_disconnects_its_tail() {
        // 1-2-3-4, hub 2; one building on pipe 3 (the 3-4 edge)
        let snap = snapshot(&[(1, 1, 2), (2, 2, 3), (3, 3, 4)], &[(1, 100, 3)]);
        let impact = outage_impact(&snap, EdgeId(3), &config()).expect("impact");

        assert_eq!(impact.hub, Some(NodeId(2)));
        assert_eq!(impact.disconnected_nodes, vec![NodeId(4)]);
        assert_eq!(impact.affected_pipes, vec![PipeId(3)]);
        assert_eq!(impact.affected_buildings, vec![BuildingId(100)]);
        assert_eq!(impact.affected_service_count, 1);
        assert!((impact.total_service_length_m - 10.0).abs() < 1e-9);
    }

    #[test]
    fn interior_bridge_takes_downstream_pipes() {
        // Removing 2-3 strands 3 and 4, so pipes 2 and 3 are affected
        let snap = snapshot(
            &[(1, 1, 2), (2, 2, 3), (3, 3, 4)],
            &[(1, 100, 3), (2, 101, 2), (3, 102, 1)],
        );
        let impact = outage_impact(&snap, EdgeId(2), &config()).expect("impact");

        assert_eq!(impact.disconnected_nodes, vec![NodeId(3), NodeId(4)]);
        assert_eq!(impact.affected_pipes, vec![PipeId(2), PipeId(3)]);
        assert_eq!(
            impact.affected_buildings,
            vec![BuildingId(100), BuildingId(101)]
        );
        assert!(impact.affected_building_count() < snap.building_count());
    }

    #[test]
    fn loop_edge_has_no_impact() {
        let snap = snapshot(&[(1, 1, 2), (2, 2, 3), (3, 3, 1)], &[(1, 100, 1)]);
        for edge in 1..=3 {
            let impact = outage_impact(&snap, EdgeId(edge), &config()).expect("impact");
            assert!(impact.is_empty());
            assert_eq!(impact.affected_building_count(), 0);
            assert_eq!(impact.affected_service_count, 0);
        }
    }

    #[test]
    fn building_with_two_services_counts_once() {
        let snap = snapshot(&[(1, 1, 2), (2, 2, 3)], &[(1, 100, 2), (2, 100, 2)]);
        let impact = outage_impact(&snap, EdgeId(2), &config()).expect("impact");
        assert_eq!(impact.affected_building_count(), 1);
        assert_eq!(impact.affected_service_count, 2);
    }

    #[test]
    fn unknown_edge_is_not_found() {
        let snap = snapshot(&[(1, 1, 2)], &[]);
        let err = outage_impact(&snap, EdgeId(9), &config()).expect_err("unknown");
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn edge_outside_hub_component_has_no_impact() {
        // Hub is 2 (degree 2); edge 3 lives in a separate component
        let snap = snapshot(&[(1, 1, 2), (2, 2, 3), (3, 10, 11)], &[(1, 100, 3)]);
        let impact = outage_impact(&snap, EdgeId(3), &config()).expect("impact");
        assert!(impact.is_empty());
    }

    #[test]
    fn node_budget_surfaces_as_error() {
        let snap = snapshot(&[(1, 1, 2), (2, 2, 3), (3, 3, 4)], &[]);
        let tight = AnalysisConfig {
            max_traversal_nodes: 2,
            ..AnalysisConfig::default()
        };
        let err = outage_impact(&snap, EdgeId(1), &tight).expect_err("budget");
        assert!(matches!(err, Error::TraversalLimitExceeded { .. }));
    }
}
