//! Database schema definition for the graph store.

/// Database schema definition.
///
/// Geometry columns hold `GeoJSON` geometry objects serialized as JSON text.
pub(crate) const SCHEMA: &str = r"
-- Physical pipes supplied by ingestion
CREATE TABLE IF NOT EXISTS pipes (
    id INTEGER PRIMARY KEY,
    class TEXT NOT NULL,
    diameter_mm INTEGER NOT NULL,
    material TEXT NOT NULL,
    install_year INTEGER NOT NULL,
    length_m REAL NOT NULL,
    geometry TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pipes_material ON pipes(material);
CREATE INDEX IF NOT EXISTS idx_pipes_class ON pipes(class);

-- Served buildings
CREATE TABLE IF NOT EXISTS buildings (
    id INTEGER PRIMARY KEY,
    geometry TEXT NOT NULL
);

-- Service connections, the only join between pipes and buildings
CREATE TABLE IF NOT EXISTS services (
    id INTEGER PRIMARY KEY,
    building_id INTEGER NOT NULL REFERENCES buildings(id) ON DELETE CASCADE,
    pipe_id INTEGER NOT NULL REFERENCES pipes(id) ON DELETE CASCADE,
    length_m REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_services_pipe ON services(pipe_id);
CREATE INDEX IF NOT EXISTS idx_services_building ON services(building_id);

-- Junctions derived by the graph builder
CREATE TABLE IF NOT EXISTS graph_nodes (
    id INTEGER PRIMARY KEY,
    lon REAL NOT NULL,
    lat REAL NOT NULL
);

-- One edge per resolvable pipe
-- affected_building_count is NULL until the criticality batch has run
CREATE TABLE IF NOT EXISTS graph_edges (
    id INTEGER PRIMARY KEY,
    source INTEGER NOT NULL REFERENCES graph_nodes(id) ON DELETE CASCADE,
    target INTEGER NOT NULL REFERENCES graph_nodes(id) ON DELETE CASCADE,
    pipe_id INTEGER NOT NULL REFERENCES pipes(id) ON DELETE CASCADE,
    length_m REAL NOT NULL,
    geometry TEXT NOT NULL,
    affected_building_count INTEGER
);

CREATE INDEX IF NOT EXISTS idx_graph_edges_source ON graph_edges(source);
CREATE INDEX IF NOT EXISTS idx_graph_edges_target ON graph_edges(target);
CREATE INDEX IF NOT EXISTS idx_graph_edges_score ON graph_edges(affected_building_count)
    WHERE affected_building_count > 0;
";
