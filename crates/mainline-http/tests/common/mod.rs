//! Shared fixtures for HTTP API tests.

// Not every test binary uses every helper
#![allow(dead_code)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use mainline::criticality::CancelToken;
use mainline::worst_day::MessageChooser;
use mainline::{
    Building, BuildingId, CriticalityOptions, LineString, MainlineConfig, Network, NetworkData,
    Pipe, PipeClass, PipeId, Polygon, Service, ServiceId, Store,
};
use mainline_http::{AppState, router};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Always picks the first headline.
pub struct FirstMessage;

impl MessageChooser for FirstMessage {
    fn choose(&self, messages: &[&'static str]) -> &'static str {
        messages[0]
    }
}

/// Position of junction `i` on the x axis.
#[allow(clippy::cast_precision_loss)]
pub fn junction(i: i64) -> [f64; 2] {
    [i as f64 * 0.001, 0.0]
}

fn pipe(id: i64, from: [f64; 2], to: [f64; 2]) -> Pipe {
    Pipe {
        id: PipeId(id),
        class: if id == 1 { PipeClass::Main } else { PipeClass::Secondary },
        diameter_mm: if id == 1 { 300 } else { 150 },
        material: "ductile_iron".into(),
        install_year: 1985,
        length_m: 111.0,
        geometry: LineString::from(vec![from, to]),
    }
}

fn building(id: i64, [x, y]: [f64; 2]) -> Building {
    Building {
        id: BuildingId(id),
        geometry: Polygon::new(
            LineString::from(vec![
                [x, y + 0.0001],
                [x + 0.0001, y + 0.0001],
                [x + 0.0001, y + 0.0002],
                [x, y + 0.0001],
            ]),
            Vec::new(),
        ),
    }
}

/// Line A-B-C-D (edges 1-3) with building 10 on the C-D pipe.
pub fn line_network() -> NetworkData {
    NetworkData {
        pipes: (1..=3).map(|i| pipe(i, junction(i - 1), junction(i))).collect(),
        services: vec![Service {
            id: ServiceId(1),
            building_id: BuildingId(10),
            pipe_id: PipeId(3),
            length_m: 12.5,
        }],
        buildings: vec![building(10, junction(3))],
    }
}

/// Triangle A-B-C-A with a building on every pipe.
pub fn loop_network() -> NetworkData {
    let apex = [0.0005, 0.001];
    NetworkData {
        pipes: vec![
            pipe(1, junction(0), junction(1)),
            pipe(2, junction(1), apex),
            pipe(3, apex, junction(0)),
        ],
        services: (1..=3)
            .map(|i| Service {
                id: ServiceId(i),
                building_id: BuildingId(10 + i),
                pipe_id: PipeId(i),
                length_m: 5.0,
            })
            .collect(),
        buildings: (1..=3).map(|i| building(10 + i, apex)).collect(),
    }
}

/// A router over a freshly built network, with the backing temp dir.
pub struct TestApp {
    /// Must be kept alive for the duration of the test.
    pub dir: TempDir,
    /// The router under test.
    pub router: Router,
}

/// Load and build `data`; optionally run the criticality batch.
pub fn app(data: &NetworkData, score: bool) -> TestApp {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let store = Store::create(&dir.path().join("graph.db")).expect("should create store");
    let network = Network::with_store(store, MainlineConfig::default()).expect("should open");
    network.load_network(data).expect("should load");
    network.rebuild_graph().expect("should build");
    if score {
        network
            .compute_criticality(&CriticalityOptions {
                cancel: Some(CancelToken::new()),
                ..CriticalityOptions::default()
            })
            .expect("should score");
    }
    TestApp {
        dir,
        router: router(AppState::with_chooser(network, FirstMessage)),
    }
}

/// A router over an empty store.
pub fn empty_app() -> TestApp {
    app(&NetworkData::default(), false)
}

/// Issue a GET and return the status and decoded JSON body.
pub async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("should build request"),
        )
        .await
        .expect("router is infallible");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("should read body");
    let body = serde_json::from_slice(&bytes).expect("body should be JSON");
    (status, body)
}
