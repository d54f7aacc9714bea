//! Graph node/edge storage and criticality scores.

use rusqlite::params;

use super::{
    encode_geometry, row_to_edge, row_to_node, Store, EDGES_COLUMNS, NODES_COLUMNS,
};
use crate::criticality::CriticalityScores;
use crate::error::Result;
use crate::graph::{BuiltGraph, GraphSnapshot, SnapshotParts};
use crate::types::{Edge, Node};

impl Store {
    /// Atomically replace the derived graph.
    ///
    /// All previous nodes, edges and criticality scores are discarded.
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` on storage failure; nothing changes in that case.
    pub fn replace_graph(&self, graph: &BuiltGraph) -> Result<()> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM graph_edges", [])?;
        tx.execute("DELETE FROM graph_nodes", [])?;

        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO graph_nodes ({NODES_COLUMNS}) VALUES (?1, ?2, ?3)"
            ))?;
            for node in &graph.nodes {
                insert.execute(params![node.id.as_i64(), node.location.x(), node.location.y()])?;
            }

            let mut insert = tx.prepare(&format!(
                "INSERT INTO graph_edges ({EDGES_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL)"
            ))?;
            for edge in &graph.edges {
                insert.execute(params![
                    edge.id.as_i64(),
                    edge.source.as_i64(),
                    edge.target.as_i64(),
                    edge.pipe_id.as_i64(),
                    edge.length_m,
                    encode_geometry(&edge.geometry)?,
                ])?;
            }
        }

        tx.commit()?;
        tracing::debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "Replaced graph"
        );
        Ok(())
    }

    /// All graph nodes, ascending id.
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` on storage failure.
    pub fn graph_nodes(&self) -> Result<Vec<Node>> {
        let conn = self.connection()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {NODES_COLUMNS} FROM graph_nodes ORDER BY id"))?;
        let rows = stmt.query_map([], row_to_node)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// All graph edges, ascending id.
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` on storage failure or corrupt rows.
    pub fn graph_edges(&self) -> Result<Vec<Edge>> {
        let conn = self.connection()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {EDGES_COLUMNS} FROM graph_edges ORDER BY id"))?;
        let rows = stmt.query_map([], row_to_edge)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Persist one batch of criticality scores in a single transaction.
    ///
    /// Edges absent from `scores` keep their previous value.
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` on storage failure; no score is written in
    /// that case.
    pub fn write_criticality(&self, scores: &CriticalityScores) -> Result<usize> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        let mut written = 0;
        {
            let mut update =
                tx.prepare("UPDATE graph_edges SET affected_building_count = ?2 WHERE id = ?1")?;
            for (edge, score) in &scores.scores {
                written += update.execute(params![edge.as_i64(), score])?;
            }
        }
        tx.commit()?;
        tracing::info!(edges = written, "Persisted criticality scores");
        Ok(written)
    }

    /// Load everything needed for analysis into an immutable snapshot.
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` on storage failure or corrupt rows.
    pub fn load_snapshot(&self) -> Result<GraphSnapshot> {
        let parts = SnapshotParts {
            nodes: self.graph_nodes()?,
            edges: self.graph_edges()?,
            pipes: self.pipes()?,
            services: self.services()?,
            buildings: self.buildings()?,
        };
        tracing::debug!(
            nodes = parts.nodes.len(),
            edges = parts.edges.len(),
            "Loaded graph snapshot"
        );
        Ok(GraphSnapshot::new(parts))
    }
}
