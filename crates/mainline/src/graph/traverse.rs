//! Reachability from a single source node.
//!
//! Hop-bounded queries use breadth-first search; length-bounded queries use
//! Dijkstra over pipe lengths. Both can treat one edge as removed, which is
//! how every outage question is asked.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

use super::GraphSnapshot;
use crate::error::{Error, Result};
use crate::types::{EdgeId, NodeId};

/// How traversal cost accumulates along a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostModel {
    /// Every edge costs 1.
    Hops,
    /// Every edge costs its pipe length in metres.
    Length,
}

/// Parameters of a reachability query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReachQuery {
    /// Cost model.
    pub cost_model: CostModel,
    /// Inclusive cost bound; `f64::INFINITY` for unbounded.
    pub max_cost: f64,
    /// Edge treated as absent during the traversal.
    pub excluded_edge: Option<EdgeId>,
    /// Upper bound on reached nodes before the traversal is abandoned.
    pub max_nodes: usize,
}

impl Default for ReachQuery {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl ReachQuery {
    /// Node budget used when none is configured.
    pub const DEFAULT_MAX_NODES: usize = 5_000_000;

    /// Reach everything connected to the source.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            cost_model: CostModel::Hops,
            max_cost: f64::INFINITY,
            excluded_edge: None,
            max_nodes: Self::DEFAULT_MAX_NODES,
        }
    }

    /// Reach nodes at most `hops` edges away.
    #[must_use]
    pub fn within_hops(hops: u32) -> Self {
        Self {
            max_cost: f64::from(hops),
            ..Self::unbounded()
        }
    }

    /// Reach nodes whose shortest pipe-length distance is at most `meters`.
    #[must_use]
    pub fn within_length(meters: f64) -> Self {
        Self {
            cost_model: CostModel::Length,
            max_cost: meters,
            ..Self::unbounded()
        }
    }

    /// Treat `edge` as removed.
    #[must_use]
    pub fn excluding(mut self, edge: EdgeId) -> Self {
        self.excluded_edge = Some(edge);
        self
    }

    /// Abandon the traversal once more than `max_nodes` nodes are reached.
    #[must_use]
    pub fn with_node_limit(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }
}

/// Result of a reachability query: the reached set with per-node cost.
#[derive(Debug, Clone)]
pub struct Reachability<'s> {
    snapshot: &'s GraphSnapshot,
    source: NodeId,
    costs: Vec<f64>,
    reached: usize,
}

impl Reachability<'_> {
    /// The node the traversal started from.
    #[must_use]
    pub fn source(&self) -> NodeId {
        self.source
    }

    /// Number of reached nodes, source included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reached
    }

    /// Never true for a successful query since the source is always reached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reached == 0
    }

    /// Whether `node` was reached.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.cost(node).is_some()
    }

    /// Minimal cost to `node`, `None` if unreached.
    #[must_use]
    pub fn cost(&self, node: NodeId) -> Option<f64> {
        let ix = self.snapshot.index_of(node)?;
        let cost = self.costs[ix.index()];
        cost.is_finite().then_some(cost)
    }

    /// Minimal hop count to `node` for a hop-model query.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn hops(&self, node: NodeId) -> Option<u32> {
        self.cost(node).map(|c| c as u32)
    }

    /// Reached nodes with their cost, in ascending node id order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.snapshot
            .nodes()
            .iter()
            .zip(&self.costs)
            .filter(|(_, cost)| cost.is_finite())
            .map(|(node, &cost)| (node.id, cost))
    }

    /// Reached node ids in ascending order.
    #[must_use]
    pub fn nodes(&self) -> Vec<NodeId> {
        self.iter().map(|(id, _)| id).collect()
    }

    /// Nodes reached here but not in `other`, ascending.
    ///
    /// Both results must come from the same snapshot.
    #[must_use]
    pub fn difference(&self, other: &Reachability<'_>) -> Vec<NodeId> {
        debug_assert!(std::ptr::eq(self.snapshot, other.snapshot));
        self.snapshot
            .nodes()
            .iter()
            .zip(self.costs.iter().zip(&other.costs))
            .filter(|(_, (mine, theirs))| mine.is_finite() && !theirs.is_finite())
            .map(|(node, _)| node.id)
            .collect()
    }
}

/// Min-heap entry for Dijkstra.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Frontier {
    cost: f64,
    node: NodeIndex,
}

impl Eq for Frontier {}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl GraphSnapshot {
    /// Compute the set of nodes reachable from `source` under `query`.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if `source` is not a node of this snapshot
    /// - `Error::TraversalLimitExceeded` if more than `query.max_nodes` nodes
    ///   are reached
    pub fn reachable(&self, source: NodeId, query: &ReachQuery) -> Result<Reachability<'_>> {
        let start = self
            .index_of(source)
            .ok_or_else(|| Error::NotFound(format!("node {source} not found")))?;

        let mut costs = vec![f64::INFINITY; self.node_count()];
        costs[start.index()] = 0.0;
        if query.max_nodes == 0 {
            return Err(Error::TraversalLimitExceeded { limit: 0 });
        }

        let reached = match query.cost_model {
            CostModel::Hops => self.breadth_first(start, query, &mut costs)?,
            CostModel::Length => self.shortest_lengths(start, query, &mut costs)?,
        };

        Ok(Reachability {
            snapshot: self,
            source,
            costs,
            reached,
        })
    }

    fn breadth_first(&self, start: NodeIndex, query: &ReachQuery, costs: &mut [f64]) -> Result<usize> {
        let graph = self.adjacency();
        let mut reached = 1;
        let mut queue = VecDeque::from([start]);

        while let Some(node) = queue.pop_front() {
            let next = costs[node.index()] + 1.0;
            if next > query.max_cost {
                continue;
            }
            for edge in graph.edges(node) {
                if query.excluded_edge == Some(edge.weight().id) {
                    continue;
                }
                let other = if edge.source() == node {
                    edge.target()
                } else {
                    edge.source()
                };
                if costs[other.index()].is_infinite() {
                    costs[other.index()] = next;
                    reached += 1;
                    if reached > query.max_nodes {
                        return Err(Error::TraversalLimitExceeded {
                            limit: query.max_nodes,
                        });
                    }
                    queue.push_back(other);
                }
            }
        }

        Ok(reached)
    }

    fn shortest_lengths(&self, start: NodeIndex, query: &ReachQuery, costs: &mut [f64]) -> Result<usize> {
        let graph = self.adjacency();
        let mut reached = 1;
        let mut heap = BinaryHeap::from([Frontier {
            cost: 0.0,
            node: start,
        }]);

        while let Some(Frontier { cost, node }) = heap.pop() {
            // Stale entry
            if cost > costs[node.index()] {
                continue;
            }
            for edge in graph.edges(node) {
                if query.excluded_edge == Some(edge.weight().id) {
                    continue;
                }
                let other = if edge.source() == node {
                    edge.target()
                } else {
                    edge.source()
                };
                let next = cost + edge.weight().length_m;
                if next > query.max_cost || next >= costs[other.index()] {
                    continue;
                }
                if costs[other.index()].is_infinite() {
                    reached += 1;
                    if reached > query.max_nodes {
                        return Err(Error::TraversalLimitExceeded {
                            limit: query.max_nodes,
                        });
                    }
                }
                costs[other.index()] = next;
                heap.push(Frontier {
                    cost: next,
                    node: other,
                });
            }
        }

        Ok(reached)
    }
}
