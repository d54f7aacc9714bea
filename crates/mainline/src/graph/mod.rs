//! In-memory graph snapshot and the algorithms that run over it.
//!
//! The store is the source of truth; a [`GraphSnapshot`] is an immutable,
//! fully indexed copy of it that every analysis reads from. Snapshots are
//! shared behind an `Arc` and replaced wholesale after a rebuild, so a query
//! never observes a half-rebuilt graph.
//!
//! ## Layout
//!
//! | Piece | Representation |
//! |-------|----------------|
//! | Adjacency | `petgraph::UnGraph`, node index `i` is the `i`-th node by id |
//! | Edge lookup | `HashMap<EdgeId, usize>` into the id-sorted edge list |
//! | Consumers | services grouped by pipe, buildings by id |
//! | Spatial | [`EdgeLocator`] R-tree over edge segments |
//!
//! ## Operations
//!
//! | Operation | Algorithm |
//! |-----------|-----------|
//! | Hub selection | max incident-edge count, lowest id on ties |
//! | Reachability | BFS (hops) or Dijkstra (length) with an excluded edge |
//! | Nearest edge | R-tree nearest-neighbour over projected segments |

mod builder;
mod locate;
mod traverse;

pub use builder::{BuiltGraph, ConnectivityMetrics, GraphBuilder};
pub use locate::{EdgeLocator, NearestEdge};
pub use traverse::{CostModel, ReachQuery, Reachability};

use std::collections::{BTreeMap, HashMap};

use petgraph::graph::{NodeIndex, UnGraph};
use tracing::warn;

use crate::geometry::LocalProjection;
use crate::types::{Building, BuildingId, Edge, EdgeId, Node, NodeId, Pipe, PipeId, Service};

/// Weight stored on each adjacency edge.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EdgeWeight {
    pub(crate) id: EdgeId,
    pub(crate) length_m: f64,
}

/// Raw records a snapshot is assembled from.
#[derive(Debug, Clone, Default)]
pub struct SnapshotParts {
    /// Graph nodes.
    pub nodes: Vec<Node>,
    /// Graph edges.
    pub edges: Vec<Edge>,
    /// Pipes backing the edges.
    pub pipes: Vec<Pipe>,
    /// Service connections.
    pub services: Vec<Service>,
    /// Buildings.
    pub buildings: Vec<Building>,
}

/// Immutable, indexed view of the whole network.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    degrees: Vec<u32>,
    node_index: HashMap<NodeId, NodeIndex>,
    edge_index: HashMap<EdgeId, usize>,
    graph: UnGraph<NodeId, EdgeWeight>,
    pipes: HashMap<PipeId, Pipe>,
    services_by_pipe: HashMap<PipeId, Vec<Service>>,
    service_count: usize,
    buildings: BTreeMap<BuildingId, Building>,
    locator: EdgeLocator,
}

impl Default for GraphSnapshot {
    fn default() -> Self {
        Self::new(SnapshotParts::default())
    }
}

impl GraphSnapshot {
    /// Assemble a snapshot, dropping records that would break its invariants.
    ///
    /// Edges whose endpoints or pipe are unknown are excluded, as are services
    /// pointing at unknown buildings. Exclusions are logged with counts.
    #[must_use]
    pub fn new(parts: SnapshotParts) -> Self {
        let SnapshotParts {
            mut nodes,
            mut edges,
            pipes,
            services,
            buildings,
        } = parts;

        nodes.sort_by_key(|n| n.id);
        nodes.dedup_by_key(|n| n.id);
        edges.sort_by_key(|e| e.id);
        edges.dedup_by_key(|e| e.id);

        let pipes: HashMap<PipeId, Pipe> = pipes.into_iter().map(|p| (p.id, p)).collect();
        let buildings: BTreeMap<BuildingId, Building> =
            buildings.into_iter().map(|b| (b.id, b)).collect();

        let mut graph = UnGraph::with_capacity(nodes.len(), edges.len());
        let mut node_index = HashMap::with_capacity(nodes.len());
        for node in &nodes {
            let ix = graph.add_node(node.id);
            node_index.insert(node.id, ix);
        }

        let before = edges.len();
        edges.retain(|e| {
            node_index.contains_key(&e.source)
                && node_index.contains_key(&e.target)
                && pipes.contains_key(&e.pipe_id)
        });
        if edges.len() < before {
            warn!(
                dropped = before - edges.len(),
                "Excluded edges with unresolved endpoints or pipes"
            );
        }

        let mut degrees = vec![0_u32; nodes.len()];
        let mut edge_index = HashMap::with_capacity(edges.len());
        for (pos, edge) in edges.iter().enumerate() {
            let a = node_index[&edge.source];
            let b = node_index[&edge.target];
            graph.add_edge(
                a,
                b,
                EdgeWeight {
                    id: edge.id,
                    length_m: edge.length_m.max(0.0),
                },
            );
            degrees[a.index()] += 1;
            degrees[b.index()] += 1;
            edge_index.insert(edge.id, pos);
        }

        let mut services_by_pipe: HashMap<PipeId, Vec<Service>> = HashMap::new();
        let mut service_count = 0;
        let mut orphaned = 0;
        for service in services {
            if buildings.contains_key(&service.building_id) {
                services_by_pipe
                    .entry(service.pipe_id)
                    .or_default()
                    .push(service);
                service_count += 1;
            } else {
                orphaned += 1;
            }
        }
        if orphaned > 0 {
            warn!(orphaned, "Excluded services referencing unknown buildings");
        }
        for list in services_by_pipe.values_mut() {
            list.sort_by_key(|s| s.id);
        }

        let projection = LocalProjection::fitted(nodes.iter().map(|n| n.location));
        let locator = EdgeLocator::new(&edges, projection);

        Self {
            nodes,
            edges,
            degrees,
            node_index,
            edge_index,
            graph,
            pipes,
            services_by_pipe,
            service_count,
            buildings,
            locator,
        }
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of traversable edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of buildings in the network.
    #[must_use]
    pub fn building_count(&self) -> usize {
        self.buildings.len()
    }

    /// Number of service connections attached to a known building.
    #[must_use]
    pub fn service_count(&self) -> usize {
        self.service_count
    }

    /// Nodes in ascending id order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Edges in ascending id order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Look up an edge.
    #[must_use]
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edge_index.get(&id).map(|&pos| &self.edges[pos])
    }

    /// Look up a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.node_index.get(&id).map(|ix| &self.nodes[ix.index()])
    }

    /// Look up a pipe.
    #[must_use]
    pub fn pipe(&self, id: PipeId) -> Option<&Pipe> {
        self.pipes.get(&id)
    }

    /// Look up a building.
    #[must_use]
    pub fn building(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.get(&id)
    }

    /// Services tapping a pipe, in id order.
    #[must_use]
    pub fn services_on(&self, pipe: PipeId) -> &[Service] {
        self.services_by_pipe.get(&pipe).map_or(&[], Vec::as_slice)
    }

    /// Number of edge endpoints at `node` (a self-loop counts twice).
    #[must_use]
    pub fn degree(&self, node: NodeId) -> Option<u32> {
        self.node_index.get(&node).map(|ix| self.degrees[ix.index()])
    }

    /// The most connected node, used as the reference supply source.
    ///
    /// Ties resolve to the lowest node id so scores are reproducible.
    /// Returns `None` when the graph has no edges.
    #[must_use]
    pub fn hub_node(&self) -> Option<NodeId> {
        let mut best: Option<(NodeId, u32)> = None;
        for (node, &degree) in self.nodes.iter().zip(&self.degrees) {
            if degree > 0 && best.is_none_or(|(_, d)| degree > d) {
                best = Some((node.id, degree));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Dead-end and intersection counts over nodes with at least one edge.
    #[must_use]
    pub fn connectivity(&self) -> ConnectivityMetrics {
        ConnectivityMetrics::from_degrees(self.degrees.iter().copied())
    }

    /// Spatial index over edge geometries.
    #[must_use]
    pub fn locator(&self) -> &EdgeLocator {
        &self.locator
    }

    /// Ids of every edge incident to `node`, ascending.
    #[must_use]
    pub fn incident_edges(&self, node: NodeId) -> Vec<EdgeId> {
        let Some(&ix) = self.node_index.get(&node) else {
            return Vec::new();
        };
        let mut ids: Vec<EdgeId> = self.graph.edges(ix).map(|e| e.weight().id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub(crate) fn index_of(&self, node: NodeId) -> Option<NodeIndex> {
        self.node_index.get(&node).copied()
    }

    pub(crate) fn adjacency(&self) -> &UnGraph<NodeId, EdgeWeight> {
        &self.graph
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Small hand-built networks shared by unit tests.

    use super::{GraphSnapshot, SnapshotParts};
    use crate::types::{
        Building, BuildingId, Edge, EdgeId, LineString, Node, NodeId, Pipe, PipeClass, PipeId,
        Point, Polygon, Service, ServiceId,
    };

    /// Spacing between consecutive fixture nodes, in degrees of longitude.
    pub(crate) const STEP: f64 = 0.001;

    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn node(id: i64) -> Node {
        Node {
            id: NodeId(id),
            location: Point::new(id as f64 * STEP, 0.0),
        }
    }

    pub(crate) fn pipe(id: i64, geometry: LineString) -> Pipe {
        Pipe {
            id: PipeId(id),
            class: PipeClass::Secondary,
            diameter_mm: 150,
            material: "pvc".to_string(),
            install_year: 1995,
            length_m: 100.0,
            geometry,
        }
    }

    /// Build a snapshot from `(edge id, source, target)` triples. Each edge
    /// gets a pipe with the same id; nodes sit on a horizontal line.
    pub(crate) fn snapshot(edges: &[(i64, i64, i64)], services: &[(i64, i64, i64)]) -> GraphSnapshot {
        let mut node_ids: Vec<i64> = edges.iter().flat_map(|&(_, a, b)| [a, b]).collect();
        node_ids.sort_unstable();
        node_ids.dedup();
        let nodes: Vec<Node> = node_ids.iter().map(|&id| node(id)).collect();

        let mut pipes = Vec::new();
        let mut graph_edges = Vec::new();
        for &(id, a, b) in edges {
            let geometry = LineString::from(vec![node(a).location, node(b).location]);
            pipes.push(pipe(id, geometry.clone()));
            graph_edges.push(Edge {
                id: EdgeId(id),
                source: NodeId(a),
                target: NodeId(b),
                pipe_id: PipeId(id),
                length_m: 100.0,
                geometry,
                affected_building_count: None,
            });
        }

        let mut buildings = Vec::new();
        let mut svc = Vec::new();
        for &(service_id, building_id, pipe_id) in services {
            buildings.push(Building {
                id: BuildingId(building_id),
                geometry: Polygon::new(
                    LineString::from(vec![[0.0, 0.0], [0.0, 0.0001], [0.0001, 0.0001], [0.0, 0.0]]),
                    Vec::new(),
                ),
            });
            svc.push(Service {
                id: ServiceId(service_id),
                building_id: BuildingId(building_id),
                pipe_id: PipeId(pipe_id),
                length_m: 10.0,
            });
        }

        GraphSnapshot::new(SnapshotParts {
            nodes,
            edges: graph_edges,
            pipes,
            services: svc,
            buildings,
        })
    }
}
