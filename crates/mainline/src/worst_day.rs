//! The single most damaging pipe failure in the network.
//!
//! Picks the edge with the highest persisted criticality score and replays its
//! outage against the current snapshot. A dramatic headline is attached for
//! display; which headline is chosen is delegated to a [`MessageChooser`].

use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::graph::GraphSnapshot;
use crate::outage::{outage_impact, OutageImpact};
use crate::types::{Edge, EdgeId, LineString, PipeClass};

/// Headlines attached to a worst-day report.
pub const DRAMATIC_MESSAGES: &[&str] = &[
    "D'oh! The whole block is dry.",
    "Mmm... no water.",
    "Stupid pipe! Why won't you hold?",
    "Everything's coming up sinkholes!",
    "Worst. Main break. Ever.",
    "Hello, water department? It's happening again.",
];

/// Picks one headline from a fixed set.
pub trait MessageChooser: Send + Sync {
    /// Return one element of `messages`, which is never empty.
    fn choose(&self, messages: &[&'static str]) -> &'static str;
}

/// Uniform random choice using the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomChooser;

impl MessageChooser for RandomChooser {
    fn choose(&self, messages: &[&'static str]) -> &'static str {
        messages
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or_default()
    }
}

/// Attributes of the failing pipe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorstPipe {
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
    #[serde(serialize_with = "geojson::ser::serialize_geometry")]
    pub geometry: LineString,
}

/// Worst-day report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorstDay {
    /// Outage of the worst edge, `None` when no edge has a non-zero score.
    pub impact: Option<OutageImpact>,
    /// The failing pipe.
    pub worst_pipe: Option<WorstPipe>,
    /// Human-readable description.
    pub summary: String,
    /// Headline.
    pub message: Option<&'static str>,
}

/// Edge with the highest persisted score, lowest id on ties. Unscored and
/// zero-scored edges never qualify.
#[must_use]
pub fn worst_edge(snapshot: &GraphSnapshot) -> Option<&Edge> {
    snapshot
        .edges()
        .iter()
        .filter(|e| e.affected_building_count.is_some_and(|n| n > 0))
        .fold(None, |best: Option<&Edge>, edge| match best {
            Some(b) if b.affected_building_count >= edge.affected_building_count => best,
            _ => Some(edge),
        })
}

/// Build the worst-day report.
///
/// # Errors
///
/// Propagates traversal failures from the outage replay.
pub fn worst_day(
    snapshot: &GraphSnapshot,
    config: &AnalysisConfig,
    chooser: &dyn MessageChooser,
) -> Result<WorstDay> {
    let Some(edge) = worst_edge(snapshot) else {
        debug!("No edge has a non-zero criticality score");
        return Ok(WorstDay {
            impact: None,
            worst_pipe: None,
            summary: "No critical pipes found. Criticality scores may not have been \
                      computed yet; run `mainline criticality`."
                .to_string(),
            message: None,
        });
    };

    let impact = outage_impact(snapshot, edge.id, config)?;
    let worst_pipe = snapshot.pipe(edge.pipe_id).map(|pipe| WorstPipe {
        edge_id: edge.id,
        class: pipe.class,
        diameter_mm: pipe.diameter_mm,
        material: pipe.material.clone(),
        length_m: pipe.length_m,
        geometry: edge.geometry.clone(),
    });

    let summary = match &worst_pipe {
        Some(pipe) => format!(
            "If pipe #{} ({} {}, {} mm) fails, {} buildings lose water across {} service connections.",
            pipe.edge_id,
            pipe.class,
            pipe.material,
            pipe.diameter_mm,
            impact.affected_building_count(),
            impact.affected_service_count,
        ),
        None => format!(
            "If edge #{} fails, {} buildings lose water.",
            edge.id,
            impact.affected_building_count()
        ),
    };

    Ok(WorstDay {
        impact: Some(impact),
        worst_pipe,
        summary,
        message: Some(chooser.choose(DRAMATIC_MESSAGES)),
    })
}
