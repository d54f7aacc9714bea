//! End-to-end run over the bundled demo network.

use std::fs;

use mainline::{
    CriticalityOptions, EdgeId, MainlineConfig, Network, NetworkData, Store,
};

fn demo_network() -> NetworkData {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../demos/network.json");
    let content = fs::read_to_string(path).expect("should read demo network");
    serde_json::from_str(&content).expect("demo network should parse")
}

#[test]
fn demo_network_end_to_end() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let store = Store::create(&dir.path().join("demo.db")).expect("should create store");
    let network = Network::with_store(store, MainlineConfig::default()).expect("should open");

    let summary = network.load_network(&demo_network()).expect("should load");
    assert_eq!(summary.pipes, 16);
    assert_eq!(summary.buildings, 18);

    // A seven-pipe ring of mains with three three-pipe branches
    let report = network.rebuild_graph().expect("should build");
    assert_eq!(report.nodes, 16);
    assert_eq!(report.edges, 16);
    assert_eq!(report.metrics.dead_ends, 3);
    assert_eq!(report.metrics.intersections, 3);
    assert!(report.skipped_pipes.is_empty());

    let scores = network
        .compute_criticality(&CriticalityOptions::default())
        .expect("should score");
    // Ring edges have a way around; the first pipe of the first branch
    // carries all six of its buildings
    for ring_edge in 1..=7 {
        assert_eq!(scores.scores.get(EdgeId(ring_edge)), Some(0));
    }
    assert_eq!(scores.most_critical, Some((EdgeId(8), 6)));
    assert_eq!(scores.ranking.len(), 9);
}
