//! Nearest-edge lookup over an R-tree of projected pipe segments.

use rstar::primitives::{GeomWithData, Line};
use rstar::RTree;
use serde::Serialize;

use super::GraphSnapshot;
use crate::error::{Error, Result};
use crate::geometry::{is_wgs84, LocalProjection};
use crate::types::{Edge, EdgeId, Point};

type Segment = GeomWithData<Line<[f64; 2]>, EdgeId>;

/// The edge closest to a query point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NearestEdge {
    /// The winning edge.
    pub edge_id: EdgeId,
    /// Planar distance from the query point, in metres.
    pub distance_m: f64,
}

/// Spatial index over every segment of every edge geometry.
#[derive(Debug, Clone)]
pub struct EdgeLocator {
    tree: RTree<Segment>,
    projection: LocalProjection,
}

impl EdgeLocator {
    /// Index the segments of `edges` in the given projection.
    #[must_use]
    pub fn new(edges: &[Edge], projection: LocalProjection) -> Self {
        let segments: Vec<Segment> = edges
            .iter()
            .flat_map(|edge| {
                edge.geometry.lines().map(move |line| {
                    GeomWithData::new(
                        Line::new(projection.project(line.start), projection.project(line.end)),
                        edge.id,
                    )
                })
            })
            .collect();

        Self {
            tree: RTree::bulk_load(segments),
            projection,
        }
    }

    /// Whether no segments are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Closest edge within `max_distance_m` of `point`.
    ///
    /// Equal distances resolve to the lowest edge id.
    #[must_use]
    pub fn nearest(&self, point: Point, max_distance_m: f64) -> Option<NearestEdge> {
        let query = self.projection.project(point.0);
        let mut candidates = self.tree.nearest_neighbor_iter_with_distance_2(&query);

        let (first, best_d2) = candidates.next()?;
        if best_d2.sqrt() > max_distance_m {
            return None;
        }

        let mut edge_id = first.data;
        for (segment, d2) in candidates {
            if d2 > best_d2 {
                break;
            }
            edge_id = edge_id.min(segment.data);
        }

        Some(NearestEdge {
            edge_id,
            distance_m: best_d2.sqrt(),
        })
    }
}

impl GraphSnapshot {
    /// Closest edge to `point` within `max_distance_m`.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidInput` if `point` is not a valid WGS84 coordinate
    /// - `Error::NotFound` if the graph has no edge that close
    pub fn nearest_edge(&self, point: Point, max_distance_m: f64) -> Result<NearestEdge> {
        if !is_wgs84(point) {
            return Err(Error::InvalidInput(format!(
                "invalid coordinate ({}, {})",
                point.x(),
                point.y()
            )));
        }
        self.locator().nearest(point, max_distance_m).ok_or_else(|| {
            Error::NotFound(format!(
                "No edge found within {max_distance_m} m of ({}, {})",
                point.x(),
                point.y()
            ))
        })
    }
}
