//! # Mainline: connectivity and outage impact for distribution networks
//!
//! Mainline models a utility network (pipes, junctions, service connections
//! to buildings) as an undirected graph and answers two questions about it:
//! what loses supply if one pipe fails, and how far an effect travels from a
//! point in a given number of hops.
//!
//! ## Design Philosophy
//!
//! - **Store is the truth** - `SQLite` holds the network, the derived graph
//!   and precomputed scores; everything else is rebuilt from it
//! - **Snapshots for reads** - queries run over an immutable, indexed
//!   [`GraphSnapshot`] that is swapped atomically after writes, including
//!   writes committed by another process such as the criticality batch
//! - **One writer at a time** - graph rebuilds and criticality runs hold an
//!   exclusive job lock for their whole duration
//! - **Empty is not an error** - an edge whose removal disconnects nothing
//!   yields an empty impact
//!
//! ## Quick Start
//!
//! ```no_run
//! use mainline::{MainlineConfig, Network, Point};
//!
//! let network = Network::open(MainlineConfig::default())?;
//! network.rebuild_graph()?;
//!
//! let nearest = network.nearest_edge(Point::new(-73.985, 40.748))?;
//! let impact = network.outage(nearest.edge_id)?;
//! println!("{} buildings lose service", impact.affected_building_count());
//! # Ok::<(), mainline::Error>(())
//! ```

pub mod config;
pub mod criticality;
mod db;
mod error;
pub mod geometry;
pub mod graph;
pub mod outage;
pub mod spread;
mod types;
pub mod worst_day;

pub use config::MainlineConfig;
pub use db::{
    validate_network, AgeStats, ClassStats, LoadSummary, MaterialStats, NetworkStats,
    NetworkTotals, Store,
};
pub use error::{Error, Result};
pub use graph::{ConnectivityMetrics, GraphSnapshot, NearestEdge};
pub use types::{
    Building, BuildingId, Coord, Edge, EdgeId, LineString, NetworkData, Node, NodeId, Pipe,
    PipeClass, PipeId, Point, Polygon, Service, ServiceId,
};

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use serde::Serialize;
use tracing::{debug, info};

use criticality::{
    CancelToken, CriticalityJob, CriticalityLevel, CriticalityScores, LevelSummary, Progress,
};
use graph::GraphBuilder;
use outage::OutageImpact;
use spread::SpreadResult;
use worst_day::{MessageChooser, WorstDay};

/// Summary of the currently loaded graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphStatus {
    /// Whether a graph with at least one edge is loaded.
    pub graph_loaded: bool,
    /// Number of traversable edges.
    pub edge_count: usize,
    /// Number of nodes.
    pub node_count: usize,
    /// Edges with a persisted criticality score.
    pub scored_edges: usize,
}

/// Outcome of a graph rebuild.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildReport {
    /// Nodes written.
    pub nodes: usize,
    /// Edges written.
    pub edges: usize,
    /// Pipes left out because their geometry has no usable endpoints.
    pub skipped_pipes: Vec<PipeId>,
    /// Dead-end and intersection counts.
    pub metrics: ConnectivityMetrics,
    /// Share of nodes that are dead ends.
    pub dead_end_ratio: f64,
}

/// One entry of the criticality ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEdge {
    /// The edge.
    pub edge_id: EdgeId,
    /// Buildings cut off by its failure.
    pub score: u32,
    /// Band of the score.
    pub level: CriticalityLevel,
    /// Pipe tier, when the pipe is known.
    pub class: Option<PipeClass>,
    /// Pipe diameter, when the pipe is known.
    pub diameter_mm: Option<u32>,
}

/// Outcome of a criticality run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticalityReport {
    /// All scores.
    pub scores: CriticalityScores,
    /// Rows written to the store.
    pub persisted: usize,
    /// Highest score and its edge.
    pub most_critical: Option<(EdgeId, u32)>,
    /// Per-band summary.
    pub distribution: Vec<LevelSummary>,
    /// Top non-zero scores.
    pub ranking: Vec<RankedEdge>,
}

/// Knobs for a single criticality run.
#[derive(Default)]
pub struct CriticalityOptions<'a> {
    /// Score edges one at a time instead of on the rayon pool.
    pub sequential: bool,
    /// Ranking length; the configured `top-n` when `None`.
    pub top: Option<usize>,
    /// Cancellation flag checked between edges.
    pub cancel: Option<CancelToken>,
    /// Progress callback.
    pub on_progress: Option<&'a (dyn Fn(Progress) + Send + Sync)>,
}

/// A network backed by a graph store, with a shared in-memory snapshot.
pub struct Network {
    store: Store,
    config: MainlineConfig,
    snapshot: RwLock<Arc<GraphSnapshot>>,
    // Store data version the current snapshot was loaded at
    loaded_version: AtomicI64,
    jobs: Mutex<()>,
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl Network {
    /// Open the store named by the environment or `config`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an unsupported connection string and
    /// `Error::Connection` if the store does not exist or cannot be opened.
    pub fn open(config: MainlineConfig) -> Result<Self> {
        let path = config.database_path()?;
        let store = Store::open(&path)?;
        Self::with_store(store, config)
    }

    /// Wrap an already opened store.
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if the snapshot cannot be loaded.
    pub fn with_store(store: Store, config: MainlineConfig) -> Result<Self> {
        let version = store.data_version()?;
        let snapshot = store.load_snapshot()?;
        info!(
            path = %store.path().display(),
            nodes = snapshot.node_count(),
            edges = snapshot.edge_count(),
            "Network opened"
        );
        Ok(Self {
            store,
            config,
            snapshot: RwLock::new(Arc::new(snapshot)),
            loaded_version: AtomicI64::new(version),
            jobs: Mutex::new(()),
        })
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &MainlineConfig {
        &self.config
    }

    /// Underlying store.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The current snapshot. Hold on to it for the duration of one operation.
    ///
    /// If another connection has committed to the store since the snapshot
    /// was loaded, the snapshot is reloaded first.
    ///
    /// # Errors
    ///
    /// - `Error::Database` if the store cannot be read
    /// - `Error::Internal` if the snapshot lock is poisoned
    pub fn snapshot(&self) -> Result<Arc<GraphSnapshot>> {
        let version = self.store.data_version()?;
        if version != self.loaded_version.load(Ordering::Acquire) {
            debug!(version, "Graph store changed, reloading snapshot");
            self.reload()?;
        }
        self.current()
    }

    fn current(&self) -> Result<Arc<GraphSnapshot>> {
        self.snapshot
            .read()
            .map(|guard| Arc::clone(&guard))
            .map_err(|e| Error::Internal(format!("snapshot lock poisoned: {e}")))
    }

    /// Reload the snapshot from the store and swap it in.
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if loading fails; the old snapshot stays in
    /// place in that case.
    pub fn reload(&self) -> Result<()> {
        // Read the version first so a commit racing the load triggers
        // another reload on the next query.
        let version = self.store.data_version()?;
        let fresh = Arc::new(self.store.load_snapshot()?);
        let mut slot = self
            .snapshot
            .write()
            .map_err(|e| Error::Internal(format!("snapshot lock poisoned: {e}")))?;
        *slot = fresh;
        self.loaded_version.store(version, Ordering::Release);
        Ok(())
    }

    fn job_lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.jobs
            .lock()
            .map_err(|e| Error::Internal(format!("job lock poisoned: {e}")))
    }

    /// Replace the network data. The derived graph is cleared.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for inconsistent data and
    /// `Error::Database` on storage failure.
    pub fn load_network(&self, data: &NetworkData) -> Result<LoadSummary> {
        let _job = self.job_lock()?;
        let summary = self.store.replace_network(data)?;
        self.reload()?;
        Ok(summary)
    }

    /// Rebuild the graph from the stored pipes.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an invalid snap tolerance and
    /// `Error::Database` on storage failure.
    pub fn rebuild_graph(&self) -> Result<BuildReport> {
        let _job = self.job_lock()?;
        let graph_config = &self.config.graph;
        let builder = GraphBuilder::new(graph_config.snap_tolerance_m)?
            .expect_dead_end_ratio(graph_config.dead_end_range());

        let pipes = self.store.pipes()?;
        let built = builder.build(&pipes);
        self.store.replace_graph(&built)?;
        self.reload()?;

        Ok(BuildReport {
            nodes: built.nodes.len(),
            edges: built.edges.len(),
            dead_end_ratio: built.metrics.dead_end_ratio(),
            skipped_pipes: built.skipped_pipes,
            metrics: built.metrics,
        })
    }

    /// Summary of the loaded graph.
    ///
    /// # Errors
    ///
    /// Returns `Error::Internal` if the snapshot lock is poisoned.
    pub fn status(&self) -> Result<GraphStatus> {
        let snapshot = self.snapshot()?;
        Ok(GraphStatus {
            graph_loaded: snapshot.edge_count() > 0,
            edge_count: snapshot.edge_count(),
            node_count: snapshot.node_count(),
            scored_edges: snapshot
                .edges()
                .iter()
                .filter(|e| e.affected_building_count.is_some())
                .count(),
        })
    }

    /// The edge nearest to `point` within the configured search radius.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidInput` if the point is not a valid coordinate
    /// - `Error::NotFound` if no edge is close enough
    pub fn nearest_edge(&self, point: Point) -> Result<NearestEdge> {
        self.snapshot()?
            .nearest_edge(point, self.config.analysis.search_radius_m)
    }

    /// Edges within `hops` of a known edge.
    ///
    /// # Errors
    ///
    /// See [`spread::nearby_edges`].
    pub fn nearby_edges(&self, edge_id: EdgeId, hops: u32) -> Result<SpreadResult> {
        spread::nearby_edges(&*self.snapshot()?, edge_id, hops, &self.config.analysis)
    }

    /// Impact of one edge failing.
    ///
    /// # Errors
    ///
    /// See [`outage::outage_impact`].
    pub fn outage(&self, edge_id: EdgeId) -> Result<OutageImpact> {
        outage::outage_impact(&*self.snapshot()?, edge_id, &self.config.analysis)
    }

    /// Spread from the edge nearest to `origin`.
    ///
    /// # Errors
    ///
    /// See [`spread::spread`].
    pub fn spread(&self, origin: Point, max_hops: u32) -> Result<SpreadResult> {
        spread::spread(&*self.snapshot()?, origin, max_hops, &self.config.analysis)
    }

    /// Score every edge, persist the scores and swap in a fresh snapshot.
    ///
    /// Nothing is written if the run fails or is cancelled.
    ///
    /// # Errors
    ///
    /// - `Error::Cancelled` if the token fires before the run completes
    /// - `Error::TraversalLimitExceeded` if a traversal exceeds the budget
    /// - `Error::Database` if the scores cannot be written
    pub fn compute_criticality(&self, options: &CriticalityOptions<'_>) -> Result<CriticalityReport> {
        let _job = self.job_lock()?;
        let snapshot = self.snapshot()?;
        let thresholds = &self.config.criticality;

        let mut job = CriticalityJob::new(&snapshot, &self.config.analysis)
            .parallel(!options.sequential)
            .progress_interval(thresholds.progress_interval);
        if let Some(token) = &options.cancel {
            job = job.cancel_token(token.clone());
        }
        if let Some(report) = options.on_progress {
            job = job.on_progress(report);
        }
        let scores = job.run()?;

        let persisted = self.store.write_criticality(&scores)?;
        self.reload()?;

        let ranking = scores
            .top(options.top.unwrap_or(thresholds.top_n))
            .into_iter()
            .map(|(edge_id, score)| {
                let pipe = snapshot
                    .edge(edge_id)
                    .and_then(|edge| snapshot.pipe(edge.pipe_id));
                RankedEdge {
                    edge_id,
                    score,
                    level: CriticalityLevel::classify(score, thresholds),
                    class: pipe.map(|p| p.class),
                    diameter_mm: pipe.map(|p| p.diameter_mm),
                }
            })
            .collect();

        Ok(CriticalityReport {
            most_critical: scores.max(),
            distribution: scores.distribution(thresholds),
            ranking,
            persisted,
            scores,
        })
    }

    /// The worst single failure according to the persisted scores.
    ///
    /// # Errors
    ///
    /// See [`worst_day::worst_day`].
    pub fn worst_day(&self, chooser: &dyn MessageChooser) -> Result<WorstDay> {
        worst_day::worst_day(&*self.snapshot()?, &self.config.analysis, chooser)
    }

    /// Aggregate statistics over the stored network.
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` on storage failure.
    pub fn network_stats(&self) -> Result<NetworkStats> {
        self.store.network_stats()
    }
}
