//! Batch criticality scoring.
//!
//! Every edge is scored with the number of distinct buildings that lose
//! service when that edge alone is removed. The hub and its full-graph
//! reachable set are computed once and shared by all workers; each edge then
//! needs one more traversal with that edge excluded.
//!
//! ```text
//! hub ──► before (once)
//!            │
//!   ┌────────┼────────┐   rayon
//!   ▼        ▼        ▼
//! edge 1   edge 2 … edge m   after = reachable(hub, excluding edge)
//!   │        │        │      score = |buildings(before − after)|
//!   └────────┴────────┘
//!            ▼
//!   BTreeMap<EdgeId, u32>
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{AnalysisConfig, CriticalityConfig};
use crate::error::{Error, Result};
use crate::graph::{GraphSnapshot, Reachability};
use crate::outage::{disconnected_by, hub_reachability, Consumers};
use crate::types::{Edge, EdgeId, NodeId};

/// Cooperative cancellation flag shared between a job and its controller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder of this token to stop.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Criticality band of a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CriticalityLevel {
    /// Below the medium threshold.
    Low,
    /// At or above the medium threshold.
    Medium,
    /// At or above the high threshold.
    High,
}

impl CriticalityLevel {
    /// Band for `score` under the configured thresholds.
    #[must_use]
    pub fn classify(score: u32, thresholds: &CriticalityConfig) -> Self {
        if score >= thresholds.high_threshold {
            Self::High
        } else if score >= thresholds.medium_threshold {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for CriticalityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge count and mean score within one band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelSummary {
    /// The band.
    pub level: CriticalityLevel,
    /// Edges in the band.
    pub edge_count: usize,
    /// Mean score of those edges.
    pub average_score: f64,
}

/// Progress of a running job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Edges scored so far.
    pub processed: usize,
    /// Edges in the job.
    pub total: usize,
}

/// Scores for every edge of a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CriticalityScores {
    /// Supply node the scores are relative to.
    pub hub: Option<NodeId>,
    /// Score per edge.
    pub scores: BTreeMap<EdgeId, u32>,
}

impl CriticalityScores {
    /// Number of scored edges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether no edge was scored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Score of one edge.
    #[must_use]
    pub fn get(&self, edge: EdgeId) -> Option<u32> {
        self.scores.get(&edge).copied()
    }

    /// Highest-scoring edge; ties go to the lowest edge id.
    #[must_use]
    pub fn max(&self) -> Option<(EdgeId, u32)> {
        self.scores
            .iter()
            .fold(None, |best: Option<(EdgeId, u32)>, (&edge, &score)| match best {
                Some((_, s)) if s >= score => best,
                _ => Some((edge, score)),
            })
    }

    /// Up to `n` non-zero scores, descending score then ascending edge id.
    #[must_use]
    pub fn top(&self, n: usize) -> Vec<(EdgeId, u32)> {
        let mut ranked: Vec<(EdgeId, u32)> = self
            .scores
            .iter()
            .filter(|(_, score)| **score > 0)
            .map(|(&edge, &score)| (edge, score))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }

    /// Per-band summary for bands that contain at least one edge, low first.
    #[must_use]
    pub fn distribution(&self, thresholds: &CriticalityConfig) -> Vec<LevelSummary> {
        let mut bands: BTreeMap<CriticalityLevel, (usize, u64)> = BTreeMap::new();
        for &score in self.scores.values() {
            let entry = bands
                .entry(CriticalityLevel::classify(score, thresholds))
                .or_default();
            entry.0 += 1;
            entry.1 += u64::from(score);
        }
        bands
            .into_iter()
            .map(|(level, (count, sum))| {
                #[allow(clippy::cast_precision_loss)]
                let average_score = sum as f64 / count as f64;
                LevelSummary {
                    level,
                    edge_count: count,
                    average_score,
                }
            })
            .collect()
    }
}

type ProgressFn<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// A configured criticality run over one snapshot.
///
/// ```no_run
/// # use mainline::{criticality::CriticalityJob, config::AnalysisConfig, graph::GraphSnapshot};
/// # let snapshot = GraphSnapshot::default();
/// let scores = CriticalityJob::new(&snapshot, &AnalysisConfig::default())
///     .parallel(true)
///     .on_progress(|p| eprintln!("{}/{}", p.processed, p.total))
///     .run()?;
/// # Ok::<(), mainline::Error>(())
/// ```
pub struct CriticalityJob<'a> {
    snapshot: &'a GraphSnapshot,
    analysis: &'a AnalysisConfig,
    parallel: bool,
    progress_interval: usize,
    cancel: CancelToken,
    on_progress: Option<ProgressFn<'a>>,
}

impl<'a> CriticalityJob<'a> {
    /// A parallel job reporting every 100 edges.
    #[must_use]
    pub fn new(snapshot: &'a GraphSnapshot, analysis: &'a AnalysisConfig) -> Self {
        Self {
            snapshot,
            analysis,
            parallel: true,
            progress_interval: CriticalityConfig::default().progress_interval,
            cancel: CancelToken::new(),
            on_progress: None,
        }
    }

    /// Score edges on the rayon pool (`true`) or one by one (`false`).
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Report progress every `interval` edges (and at completion).
    #[must_use]
    pub fn progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    /// Observe `token` between edges.
    #[must_use]
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Register a progress callback. It may be called from worker threads.
    #[must_use]
    pub fn on_progress(mut self, f: impl Fn(Progress) + Send + Sync + 'a) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Score every edge.
    ///
    /// # Errors
    ///
    /// - `Error::Cancelled` if the token was cancelled before all edges were
    ///   scored
    /// - `Error::TraversalLimitExceeded` if any traversal exceeds the budget
    pub fn run(&self) -> Result<CriticalityScores> {
        let edges = self.snapshot.edges();
        let total = edges.len();
        let Some(before) = hub_reachability(self.snapshot, self.analysis)? else {
            return Ok(CriticalityScores::default());
        };
        let hub = before.source();
        info!(
            hub = %hub,
            edges = total,
            reachable = before.len(),
            parallel = self.parallel,
            "Starting criticality run"
        );

        let processed = AtomicUsize::new(0);
        let score_one = |edge: &Edge| -> Result<(EdgeId, u32)> {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled {
                    processed: processed.load(Ordering::Relaxed),
                    total,
                });
            }
            let score = self.score(&before, edge)?;
            let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
            if done % self.progress_interval == 0 || done == total {
                if let Some(report) = &self.on_progress {
                    report(Progress {
                        processed: done,
                        total,
                    });
                }
            }
            Ok((edge.id, score))
        };

        let scored: Result<Vec<(EdgeId, u32)>> = if self.parallel {
            edges.par_iter().map(score_one).collect()
        } else {
            edges.iter().map(score_one).collect()
        };
        let scores = match scored {
            Ok(scores) => CriticalityScores {
                hub: Some(hub),
                scores: scores.into_iter().collect(),
            },
            Err(err) => {
                if matches!(err, Error::Cancelled { .. }) {
                    warn!(
                        processed = processed.load(Ordering::Relaxed),
                        total, "Criticality run cancelled"
                    );
                }
                return Err(err);
            }
        };

        if let Some((edge, score)) = scores.max() {
            info!(edge = %edge, score, "Criticality run complete");
        }
        Ok(scores)
    }

    fn score(&self, before: &Reachability<'_>, edge: &Edge) -> Result<u32> {
        // Both endpoints unreachable from the hub: removal changes nothing
        if !before.contains(edge.source) && !before.contains(edge.target) {
            return Ok(0);
        }
        let disconnected = disconnected_by(self.snapshot, before, edge.id, self.analysis)?;
        if disconnected.is_empty() {
            return Ok(0);
        }
        let consumers = Consumers::of_nodes(self.snapshot, &disconnected);
        Ok(u32::try_from(consumers.buildings.len()).unwrap_or(u32::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::snapshot;
    use rstest::rstest;
    use std::sync::Mutex;

    fn line_with_buildings() -> GraphSnapshot {
        // 1-2-3-4-5, hub 2; buildings on pipes 3 and 4
        snapshot(
            &[(1, 1, 2), (2, 2, 3), (3, 3, 4), (4, 4, 5)],
            &[(1, 100, 3), (2, 101, 4), (3, 102, 4)],
        )
    }

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn scores_match_outage_counts(#[case] parallel: bool) {
        let snap = line_with_buildings();
        let analysis = AnalysisConfig::default();
        let scores = CriticalityJob::new(&snap, &analysis)
            .parallel(parallel)
            .run()
            .expect("run");

        assert_eq!(scores.hub, Some(NodeId(2)));
        for edge in snap.edges() {
            let impact = crate::outage::outage_impact(&snap, edge.id, &analysis).expect("impact");
            assert_eq!(
                scores.get(edge.id),
                Some(u32::try_from(impact.affected_building_count()).expect("fits"))
            );
        }
        assert_eq!(scores.get(EdgeId(2)), Some(3));
        assert_eq!(scores.get(EdgeId(4)), Some(2));
        assert_eq!(scores.get(EdgeId(1)), Some(0));
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let snap = line_with_buildings();
        let analysis = AnalysisConfig::default();
        let a = CriticalityJob::new(&snap, &analysis).parallel(true).run().expect("a");
        let b = CriticalityJob::new(&snap, &analysis).parallel(false).run().expect("b");
        assert_eq!(a, b);
    }

    #[test]
    fn edges_outside_hub_component_score_zero() {
        let snap = snapshot(&[(1, 1, 2), (2, 2, 3), (3, 10, 11)], &[(1, 100, 3)]);
        let scores = CriticalityJob::new(&snap, &AnalysisConfig::default())
            .run()
            .expect("run");
        assert_eq!(scores.get(EdgeId(3)), Some(0));
    }

    #[test]
    fn empty_graph_yields_no_scores() {
        let snap = GraphSnapshot::default();
        let scores = CriticalityJob::new(&snap, &AnalysisConfig::default())
            .run()
            .expect("run");
        assert!(scores.is_empty());
        assert_eq!(scores.max(), None);
    }

    #[test]
    fn cancelled_token_stops_the_job() {
        let snap = line_with_buildings();
        let analysis = AnalysisConfig::default();
        let token = CancelToken::new();
        token.cancel();
        let err = CriticalityJob::new(&snap, &analysis)
            .parallel(false)
            .cancel_token(token)
            .run()
            .expect_err("cancelled");
        assert!(matches!(err, Error::Cancelled { processed: 0, total: 4 }));
    }

    #[test]
    fn progress_reports_interval_and_completion() {
        let snap = line_with_buildings();
        let analysis = AnalysisConfig::default();
        let seen = Mutex::new(Vec::new());
        CriticalityJob::new(&snap, &analysis)
            .parallel(false)
            .progress_interval(3)
            .on_progress(|p| seen.lock().expect("lock").push(p.processed))
            .run()
            .expect("run");
        assert_eq!(seen.into_inner().expect("lock"), vec![3, 4]);
    }

    #[test]
    fn max_prefers_lowest_edge_on_ties() {
        let scores = CriticalityScores {
            hub: None,
            scores: BTreeMap::from([(EdgeId(4), 7), (EdgeId(2), 7), (EdgeId(9), 1)]),
        };
        assert_eq!(scores.max(), Some((EdgeId(2), 7)));
    }

    #[test]
    fn top_skips_zero_and_orders_ties_by_id() {
        let scores = CriticalityScores {
            hub: None,
            scores: BTreeMap::from([
                (EdgeId(1), 0),
                (EdgeId(2), 5),
                (EdgeId(3), 9),
                (EdgeId(4), 5),
            ]),
        };
        assert_eq!(
            scores.top(10),
            vec![(EdgeId(3), 9), (EdgeId(2), 5), (EdgeId(4), 5)]
        );
        assert_eq!(scores.top(1), vec![(EdgeId(3), 9)]);
    }

    #[rstest]
    #[case(0, CriticalityLevel::Low)]
    #[case(4, CriticalityLevel::Low)]
    #[case(5, CriticalityLevel::Medium)]
    #[case(19, CriticalityLevel::Medium)]
    #[case(20, CriticalityLevel::High)]
    fn default_thresholds(#[case] score: u32, #[case] level: CriticalityLevel) {
        assert_eq!(
            CriticalityLevel::classify(score, &CriticalityConfig::default()),
            level
        );
    }

    #[test]
    fn distribution_groups_by_band() {
        let scores = CriticalityScores {
            hub: None,
            scores: BTreeMap::from([(EdgeId(1), 0), (EdgeId(2), 2), (EdgeId(3), 30)]),
        };
        let dist = scores.distribution(&CriticalityConfig::default());
        assert_eq!(dist.len(), 2);
        assert_eq!(dist[0].level, CriticalityLevel::Low);
        assert_eq!(dist[0].edge_count, 2);
        assert!((dist[0].average_score - 1.0).abs() < f64::EPSILON);
        assert_eq!(dist[1].level, CriticalityLevel::High);
    }
}
