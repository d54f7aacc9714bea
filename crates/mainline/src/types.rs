//! Domain types for the distribution network.
//!
//! - **Entities**: `Pipe`, `Service`, `Building` (supplied by ingestion, stored)
//! - **Graph**: `Node`, `Edge` (derived by the graph builder, stored)
//! - **Geometry**: `geo` types with x = longitude and y = latitude in WGS84
//!   degrees, serialized as `GeoJSON` geometry objects
//!
//! ## Design Decisions
//!
//! | Decision | Choice | Rationale |
//! |----------|--------|-----------|
//! | Ids | Newtype per entity | An `EdgeId` can't be passed where a `PipeId` is expected |
//! | Geometry | `geo` types | Shared with the geometry algorithms and `GeoJSON` conversion |
//! | Pipe class | Enum not String | Only two tiers exist |
//! | Criticality | `Option<u32>` | `None` until the batch job has run |

use std::fmt;

use geojson::de::deserialize_geometry;
use geojson::ser::serialize_geometry;
use serde::{Deserialize, Serialize};

pub use geo::{Coord, LineString, Point, Polygon};

// ============================================================================
// Strongly-typed ID wrappers
// ============================================================================

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Extract the raw i64 value.
            #[must_use]
            pub fn as_i64(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Identity of a junction node in the built graph.
    NodeId
);
entity_id!(
    /// Identity of a graph edge (one per resolvable pipe).
    EdgeId
);
entity_id!(
    /// Identity of a pipe as supplied by ingestion.
    PipeId
);
entity_id!(
    /// Identity of a service connection.
    ServiceId
);
entity_id!(
    /// Identity of a served building.
    BuildingId
);

// ============================================================================
// Network entities
// ============================================================================

/// Pipe tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipeClass {
    /// Trunk main.
    Main,
    /// Distribution pipe feeding service connections.
    Secondary,
}

impl PipeClass {
    /// Convert to database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Secondary => "secondary",
        }
    }

    /// Parse the database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "main" => Some(Self::Main),
            "secondary" => Some(Self::Secondary),
            _ => None,
        }
    }
}

impl fmt::Display for PipeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A physical pipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipe {
    /// Pipe identity.
    pub id: PipeId,
    /// Tier of the pipe.
    pub class: PipeClass,
    /// Nominal diameter in millimetres.
    pub diameter_mm: u32,
    /// Pipe material (e.g. `ductile_iron`).
    pub material: String,
    /// Year the pipe was laid.
    pub install_year: i32,
    /// Length in metres.
    pub length_m: f64,
    /// Pipe centreline.
    #[serde(
        serialize_with = "serialize_geometry",
        deserialize_with = "deserialize_geometry"
    )]
    pub geometry: LineString,
}

/// A service connection joining one building to one pipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    /// Service identity.
    pub id: ServiceId,
    /// The building served.
    pub building_id: BuildingId,
    /// The pipe the service taps.
    pub pipe_id: PipeId,
    /// Length of the connecting segment in metres.
    pub length_m: f64,
}

/// A served building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    /// Building identity.
    pub id: BuildingId,
    /// Footprint.
    #[serde(
        serialize_with = "serialize_geometry",
        deserialize_with = "deserialize_geometry"
    )]
    pub geometry: Polygon,
}

/// A junction in the built graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node identity.
    pub id: NodeId,
    /// Cluster centroid.
    #[serde(
        serialize_with = "serialize_geometry",
        deserialize_with = "deserialize_geometry"
    )]
    pub location: Point,
}

/// A traversable connection between two nodes, backed by one pipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Edge identity.
    pub id: EdgeId,
    /// Node at the pipe's start.
    pub source: NodeId,
    /// Node at the pipe's end.
    pub target: NodeId,
    /// Originating pipe.
    pub pipe_id: PipeId,
    /// Traversal cost in metres (the pipe length).
    pub length_m: f64,
    /// Geometry for rendering.
    #[serde(
        serialize_with = "serialize_geometry",
        deserialize_with = "deserialize_geometry"
    )]
    pub geometry: LineString,
    /// Buildings cut off if this edge fails; `None` until computed.
    pub affected_building_count: Option<u32>,
}

impl Edge {
    /// Whether the edge touches `node`.
    #[must_use]
    pub fn touches(&self, node: NodeId) -> bool {
        self.source == node || self.target == node
    }
}

/// Everything ingestion supplies: the raw network before graph building.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkData {
    /// All pipes.
    #[serde(default)]
    pub pipes: Vec<Pipe>,
    /// All service connections.
    #[serde(default)]
    pub services: Vec<Service>,
    /// All buildings.
    #[serde(default)]
    pub buildings: Vec<Building>,
}
