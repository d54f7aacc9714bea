//! Shared fixtures for mainline integration tests.

// Not every test binary uses every helper
#![allow(dead_code)]

use mainline::{
    Building, BuildingId, LineString, MainlineConfig, Network, NetworkData, Pipe, PipeClass,
    PipeId, Polygon, Service, ServiceId, Store,
};
use tempfile::TempDir;

/// Distance between neighbouring junctions, in degrees of longitude.
pub const STEP: f64 = 0.001;

/// Position of junction `i` on the x axis.
#[allow(clippy::cast_precision_loss)]
pub fn junction(i: i64) -> [f64; 2] {
    [i as f64 * STEP, 0.0]
}

/// A straight secondary pipe between two junctions.
pub fn pipe(id: i64, from: [f64; 2], to: [f64; 2]) -> Pipe {
    Pipe {
        id: PipeId(id),
        class: PipeClass::Secondary,
        diameter_mm: 150,
        material: "pvc".into(),
        install_year: 1998,
        length_m: 111.0,
        geometry: LineString::from(vec![from, to]),
    }
}

/// A small square building just north of `anchor`.
pub fn building(id: i64, anchor: [f64; 2]) -> Building {
    let [x, y] = anchor;
    let d = STEP / 10.0;
    Building {
        id: BuildingId(id),
        geometry: Polygon::new(
            LineString::from(vec![
                [x, y + d],
                [x + d, y + d],
                [x + d, y + 2.0 * d],
                [x, y + 2.0 * d],
                [x, y + d],
            ]),
            Vec::new(),
        ),
    }
}

/// Network data for `pipes` with one building per `(building id, pipe id)`
/// pair, each connected by a 10 m service.
pub fn network_data(pipes: Vec<Pipe>, served: &[(i64, i64)]) -> NetworkData {
    let mut buildings = Vec::new();
    let mut services = Vec::new();
    for (n, &(building_id, pipe_id)) in served.iter().enumerate() {
        let anchor = pipes
            .iter()
            .find(|p| p.id == PipeId(pipe_id))
            .and_then(|p| p.geometry.0.last().copied())
            .map_or([0.0, 0.0], Into::into);
        if !buildings.iter().any(|b: &Building| b.id == BuildingId(building_id)) {
            buildings.push(building(building_id, anchor));
        }
        services.push(Service {
            id: ServiceId(i64::try_from(n).expect("service index") + 1),
            building_id: BuildingId(building_id),
            pipe_id: PipeId(pipe_id),
            length_m: 10.0,
        });
    }
    NetworkData {
        pipes,
        services,
        buildings,
    }
}

/// Pipes `1..=n` joining junctions `0..=n` in a straight line.
pub fn line(n: i64) -> Vec<Pipe> {
    (1..=n).map(|i| pipe(i, junction(i - 1), junction(i))).collect()
}

/// A network loaded into a store inside a temp directory, graph built.
pub struct Fixture {
    /// Must be kept alive for the duration of the test.
    pub dir: TempDir,
    /// The opened network.
    pub network: Network,
}

/// Create a file-backed store, load `data` and build the graph.
pub fn built(data: &NetworkData) -> Fixture {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let store = Store::create(&dir.path().join("graph.db")).expect("should create store");
    let network = Network::with_store(store, MainlineConfig::default()).expect("should open");
    network.load_network(data).expect("should load network");
    network.rebuild_graph().expect("should build graph");
    Fixture { dir, network }
}
