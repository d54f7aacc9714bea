//! Derive the node/edge graph from pipe geometries.
//!
//! Pipe endpoints are clustered with single-linkage density clustering
//! (DBSCAN with a minimum cluster size of one): two endpoints share a node
//! whenever a chain of endpoints, each within the snap tolerance of the next,
//! connects them. Each cluster becomes a node at the centroid of its members
//! and each resolvable pipe becomes an edge between its endpoint clusters.

use std::ops::RangeInclusive;

use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::geometry::{centroid, degrees_for_meters, endpoints};
use crate::types::{Coord, Edge, EdgeId, Node, NodeId, Pipe, PipeId, Point};

/// Dead-end and intersection counts for a built graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConnectivityMetrics {
    /// Nodes with at least one incident edge.
    pub total_nodes: usize,
    /// Nodes with exactly one incident edge.
    pub dead_ends: usize,
    /// Nodes with three or more incident edges.
    pub intersections: usize,
}

impl ConnectivityMetrics {
    /// Tally metrics from per-node degrees. Isolated nodes are ignored.
    #[must_use]
    pub fn from_degrees(degrees: impl IntoIterator<Item = u32>) -> Self {
        let mut metrics = Self::default();
        for degree in degrees.into_iter().filter(|&d| d > 0) {
            metrics.total_nodes += 1;
            match degree {
                1 => metrics.dead_ends += 1,
                d if d >= 3 => metrics.intersections += 1,
                _ => {}
            }
        }
        metrics
    }

    /// Share of nodes that are dead ends, `0.0` for an empty graph.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn dead_end_ratio(&self) -> f64 {
        if self.total_nodes == 0 {
            0.0
        } else {
            self.dead_ends as f64 / self.total_nodes as f64
        }
    }
}

/// Output of a graph build.
#[derive(Debug, Clone, Default)]
pub struct BuiltGraph {
    /// Nodes, ids `1..=n` in order of first appearance.
    pub nodes: Vec<Node>,
    /// One edge per resolvable pipe, ids `1..=m` in pipe id order.
    pub edges: Vec<Edge>,
    /// Pipes whose geometry could not be resolved to two endpoints.
    pub skipped_pipes: Vec<PipeId>,
    /// Connectivity summary.
    pub metrics: ConnectivityMetrics,
}

/// Builds graphs from pipes with a fixed snap tolerance.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    snap_tolerance_m: f64,
    expected_dead_end_ratio: RangeInclusive<f64>,
}

impl GraphBuilder {
    /// Snap tolerance used when none is configured, in metres.
    pub const DEFAULT_SNAP_TOLERANCE_M: f64 = 1.0;

    /// Create a builder.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the tolerance is negative or not finite.
    pub fn new(snap_tolerance_m: f64) -> Result<Self> {
        if !snap_tolerance_m.is_finite() || snap_tolerance_m < 0.0 {
            return Err(Error::Config(format!(
                "snap tolerance must be a non-negative number of metres, got {snap_tolerance_m}"
            )));
        }
        Ok(Self {
            snap_tolerance_m,
            expected_dead_end_ratio: 0.0..=0.6,
        })
    }

    /// Warn when the dead-end ratio of a build falls outside `range`.
    #[must_use]
    pub fn expect_dead_end_ratio(mut self, range: RangeInclusive<f64>) -> Self {
        self.expected_dead_end_ratio = range;
        self
    }

    /// The configured tolerance in metres.
    #[must_use]
    pub fn snap_tolerance_m(&self) -> f64 {
        self.snap_tolerance_m
    }

    /// Build the graph for `pipes`.
    ///
    /// Pipes are processed in ascending id order regardless of input order,
    /// so node and edge ids are a pure function of the pipe set.
    #[must_use]
    pub fn build(&self, pipes: &[Pipe]) -> BuiltGraph {
        let mut ordered: Vec<&Pipe> = pipes.iter().collect();
        ordered.sort_by_key(|p| p.id);

        let mut resolvable = Vec::with_capacity(ordered.len());
        let mut skipped_pipes = Vec::new();
        for pipe in ordered {
            match endpoints(&pipe.geometry) {
                Some((start, end)) => resolvable.push((pipe, start, end)),
                None => skipped_pipes.push(pipe.id),
            }
        }
        if !skipped_pipes.is_empty() {
            warn!(
                count = skipped_pipes.len(),
                "Skipped pipes with unresolvable geometry"
            );
        }

        // Endpoint 2k is the start of pipe k, 2k + 1 its end
        let ends: Vec<Coord> = resolvable
            .iter()
            .flat_map(|(_, start, end)| [*start, *end])
            .collect();
        let (labels, clusters) = self.cluster(&ends);

        let nodes: Vec<Node> = clusters
            .iter()
            .enumerate()
            .map(|(label, members)| Node {
                id: node_id(label),
                location: centroid(members.iter().map(|&i| ends[i]))
                    .unwrap_or_else(|| Point::new(0.0, 0.0)),
            })
            .collect();

        let mut degrees = vec![0_u32; nodes.len()];
        let edges: Vec<Edge> = resolvable
            .iter()
            .enumerate()
            .map(|(k, (pipe, _, _))| {
                let source = labels[2 * k];
                let target = labels[2 * k + 1];
                degrees[source] += 1;
                degrees[target] += 1;
                Edge {
                    id: EdgeId(i64::try_from(k + 1).unwrap_or(i64::MAX)),
                    source: node_id(source),
                    target: node_id(target),
                    pipe_id: pipe.id,
                    length_m: pipe.length_m,
                    geometry: pipe.geometry.clone(),
                    affected_building_count: None,
                }
            })
            .collect();

        let metrics = ConnectivityMetrics::from_degrees(degrees);
        let ratio = metrics.dead_end_ratio();
        if metrics.total_nodes > 0 && !self.expected_dead_end_ratio.contains(&ratio) {
            warn!(
                dead_end_ratio = ratio,
                tolerance_m = self.snap_tolerance_m,
                "Dead-end ratio outside the expected range, snap tolerance may be wrong"
            );
        }
        info!(
            nodes = nodes.len(),
            edges = edges.len(),
            dead_ends = metrics.dead_ends,
            intersections = metrics.intersections,
            "Built graph"
        );

        BuiltGraph {
            nodes,
            edges,
            skipped_pipes,
            metrics,
        }
    }

    /// Label each endpoint with a cluster index; clusters are numbered in
    /// order of their first member.
    fn cluster(&self, endpoints: &[Coord]) -> (Vec<usize>, Vec<Vec<usize>>) {
        let eps = degrees_for_meters(self.snap_tolerance_m);
        let eps_2 = eps * eps;
        let points: Vec<[f64; 2]> = endpoints.iter().map(|&c| c.into()).collect();
        let tree = RTree::bulk_load(
            points
                .iter()
                .enumerate()
                .map(|(i, p)| GeomWithData::new(*p, i))
                .collect(),
        );

        let mut labels = vec![usize::MAX; endpoints.len()];
        let mut clusters: Vec<Vec<usize>> = Vec::new();
        let mut stack = Vec::new();

        for seed in 0..endpoints.len() {
            if labels[seed] != usize::MAX {
                continue;
            }
            let label = clusters.len();
            labels[seed] = label;
            let mut members = vec![seed];
            stack.push(seed);

            while let Some(current) = stack.pop() {
                for neighbour in tree.locate_within_distance(points[current], eps_2) {
                    if labels[neighbour.data] == usize::MAX {
                        labels[neighbour.data] = label;
                        members.push(neighbour.data);
                        stack.push(neighbour.data);
                    }
                }
            }
            members.sort_unstable();
            clusters.push(members);
        }

        debug!(
            endpoints = endpoints.len(),
            clusters = clusters.len(),
            "Clustered pipe endpoints"
        );
        (labels, clusters)
    }
}

fn node_id(label: usize) -> NodeId {
    NodeId(i64::try_from(label + 1).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LineString, PipeClass};
    use proptest::prelude::*;
    use rstest::rstest;

    fn pipe(id: i64, coords: Vec<[f64; 2]>) -> Pipe {
        Pipe {
            id: PipeId(id),
            class: PipeClass::Main,
            diameter_mm: 300,
            material: "ductile_iron".to_string(),
            install_year: 2005,
            length_m: 111.0,
            geometry: LineString::from(coords),
        }
    }

    fn builder(tol: f64) -> GraphBuilder {
        GraphBuilder::new(tol).expect("valid tolerance")
    }

    #[rstest]
    #[case(-1.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn rejects_bad_tolerance(#[case] tol: f64) {
        assert!(matches!(GraphBuilder::new(tol), Err(Error::Config(_))));
    }

    #[test]
    fn endpoints_within_tolerance_merge() {
        // Second pipe starts ~0.5 m from where the first ends
        let pipes = [
            pipe(1, vec![[0.0, 0.0], [0.001, 0.0]]),
            pipe(2, vec![[0.001_004_5, 0.0], [0.002, 0.0]]),
        ];
        let built = builder(1.0).build(&pipes);

        assert_eq!(built.nodes.len(), 3);
        assert_eq!(built.edges.len(), 2);
        assert_eq!(built.edges[0].target, built.edges[1].source);
        assert_eq!(built.metrics.dead_ends, 2);
    }

    #[test]
    fn endpoints_beyond_tolerance_stay_apart() {
        // ~5 m gap
        let pipes = [
            pipe(1, vec![[0.0, 0.0], [0.001, 0.0]]),
            pipe(2, vec![[0.001_045, 0.0], [0.002, 0.0]]),
        ];
        let built = builder(1.0).build(&pipes);
        assert_eq!(built.nodes.len(), 4);
    }

    #[test]
    fn clustering_is_transitive() {
        // a-b and b-c within tolerance, a-c beyond it
        let step = degrees_for_meters(0.8);
        let pipes = [
            pipe(1, vec![[0.0, 0.0], [0.01, 0.01]]),
            pipe(2, vec![[step, 0.0], [0.02, 0.02]]),
            pipe(3, vec![[2.0 * step, 0.0], [0.03, 0.03]]),
        ];
        let built = builder(1.0).build(&pipes);
        let sources: Vec<_> = built.edges.iter().map(|e| e.source).collect();
        assert_eq!(sources, vec![NodeId(1); 3]);
        assert!((built.nodes[0].location.x() - step).abs() < 1e-12);
    }

    #[test]
    fn ids_follow_pipe_order() {
        let pipes = [
            pipe(20, vec![[0.01, 0.0], [0.02, 0.0]]),
            pipe(10, vec![[0.0, 0.0], [0.01, 0.0]]),
        ];
        let built = builder(1.0).build(&pipes);

        assert_eq!(built.edges[0].id, EdgeId(1));
        assert_eq!(built.edges[0].pipe_id, PipeId(10));
        assert_eq!(built.edges[0].source, NodeId(1));
        assert_eq!(built.edges[0].target, NodeId(2));
        assert_eq!(built.edges[1].source, NodeId(2));
        assert_eq!(built.edges[1].target, NodeId(3));
    }

    #[test]
    fn unresolvable_pipes_are_skipped() {
        let pipes = [
            pipe(1, vec![[0.0, 0.0], [0.01, 0.0]]),
            pipe(2, vec![[0.0, 0.0]]),
            pipe(3, vec![]),
        ];
        let built = builder(1.0).build(&pipes);
        assert_eq!(built.edges.len(), 1);
        assert_eq!(built.skipped_pipes, vec![PipeId(2), PipeId(3)]);
    }

    #[test]
    fn closed_ring_pipe_becomes_self_loop() {
        let pipes = [pipe(1, vec![[0.0, 0.0], [0.01, 0.0], [0.0, 0.0]])];
        let built = builder(1.0).build(&pipes);
        assert_eq!(built.nodes.len(), 1);
        assert_eq!(built.edges[0].source, built.edges[0].target);
    }

    #[test]
    fn metrics_count_dead_ends_and_intersections() {
        let m = ConnectivityMetrics::from_degrees([1, 1, 1, 3, 2, 0]);
        assert_eq!(m.total_nodes, 5);
        assert_eq!(m.dead_ends, 3);
        assert_eq!(m.intersections, 1);
        assert!((m.dead_end_ratio() - 0.6).abs() < 1e-12);
        assert!(ConnectivityMetrics::default().dead_end_ratio().abs() < f64::EPSILON);
    }

    proptest! {
        #[test]
        fn every_resolvable_pipe_yields_one_edge(
            coords in prop::collection::vec(
                ((-0.01f64..0.01, -0.01f64..0.01), (-0.01f64..0.01, -0.01f64..0.01)),
                0..40,
            ),
            tol in 0.0f64..50.0,
        ) {
            let pipes: Vec<Pipe> = coords
                .iter()
                .enumerate()
                .map(|(i, ((x1, y1), (x2, y2)))| {
                    pipe(i64::try_from(i).expect("small"), vec![[*x1, *y1], [*x2, *y2]])
                })
                .collect();
            let built = builder(tol).build(&pipes);

            prop_assert_eq!(built.edges.len(), pipes.len());
            prop_assert!(built.nodes.len() <= 2 * pipes.len());
            for edge in &built.edges {
                prop_assert!(edge.source.0 >= 1 && edge.source.0 <= built.nodes.len() as i64);
                prop_assert!(edge.target.0 >= 1 && edge.target.0 <= built.nodes.len() as i64);
            }
        }
    }
}
