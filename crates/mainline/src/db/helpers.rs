//! Helper functions for database row conversion and parsing.
//!
//! These utilities convert between database representations and domain types.
//! Also provides SQL column list constants to reduce duplication across query modules.

use crate::error::Result;
use crate::types::{
    Building, BuildingId, Edge, EdgeId, LineString, Node, NodeId, Pipe, PipeClass, PipeId,
    Point, Polygon, Service, ServiceId,
};

/// SQL column list for pipes table.
///
/// Use with `row_to_pipe` for consistent column ordering.
pub(crate) const PIPES_COLUMNS: &str =
    "id, class, diameter_mm, material, install_year, length_m, geometry";

/// SQL column list for services table.
///
/// Use with `row_to_service` for consistent column ordering.
pub(crate) const SERVICES_COLUMNS: &str = "id, building_id, pipe_id, length_m";

/// SQL column list for buildings table.
///
/// Use with `row_to_building` for consistent column ordering.
pub(crate) const BUILDINGS_COLUMNS: &str = "id, geometry";

/// SQL column list for graph nodes.
pub(crate) const NODES_COLUMNS: &str = "id, lon, lat";

/// SQL column list for graph edges.
pub(crate) const EDGES_COLUMNS: &str =
    "id, source, target, pipe_id, length_m, geometry, affected_building_count";

/// Parse a pipe class string from the database.
///
/// Returns an error for unrecognized values, indicating possible database corruption.
pub(crate) fn parse_pipe_class(s: &str) -> rusqlite::Result<PipeClass> {
    PipeClass::parse(s).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("Unknown pipe class '{s}' in database. Database may be corrupted.").into(),
        )
    })
}

/// Decode a `GeoJSON` geometry column into the expected `geo` type.
///
/// Malformed JSON and geometries of the wrong type are both conversion
/// failures on `column`.
pub(crate) fn parse_geometry<G>(column: usize, text: &str) -> rusqlite::Result<G>
where
    G: TryFrom<geojson::Geometry>,
    G::Error: std::error::Error + Send + Sync + 'static,
{
    let conversion_failure = |e: Box<dyn std::error::Error + Send + Sync>| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, e)
    };
    let geometry: geojson::Geometry =
        serde_json::from_str(text).map_err(|e| conversion_failure(Box::new(e)))?;
    G::try_from(geometry).map_err(|e| conversion_failure(Box::new(e)))
}

/// Encode a geometry for storage as a `GeoJSON` geometry object.
pub(crate) fn encode_geometry<'a, G>(geometry: &'a G) -> Result<String>
where
    geojson::Value: From<&'a G>,
{
    let geometry = geojson::Geometry::new(geojson::Value::from(geometry));
    Ok(serde_json::to_string(&geometry)?)
}

/// Convert a database row to a Pipe.
pub(crate) fn row_to_pipe(row: &rusqlite::Row) -> rusqlite::Result<Pipe> {
    Ok(Pipe {
        id: PipeId::from(row.get::<_, i64>(0)?),
        class: parse_pipe_class(&row.get::<_, String>(1)?)?,
        diameter_mm: row.get(2)?,
        material: row.get(3)?,
        install_year: row.get(4)?,
        length_m: row.get(5)?,
        geometry: parse_geometry::<LineString>(6, &row.get::<_, String>(6)?)?,
    })
}

/// Convert a database row to a Service.
pub(crate) fn row_to_service(row: &rusqlite::Row) -> rusqlite::Result<Service> {
    Ok(Service {
        id: ServiceId::from(row.get::<_, i64>(0)?),
        building_id: BuildingId::from(row.get::<_, i64>(1)?),
        pipe_id: PipeId::from(row.get::<_, i64>(2)?),
        length_m: row.get(3)?,
    })
}

/// Convert a database row to a Building.
pub(crate) fn row_to_building(row: &rusqlite::Row) -> rusqlite::Result<Building> {
    Ok(Building {
        id: BuildingId::from(row.get::<_, i64>(0)?),
        geometry: parse_geometry::<Polygon>(1, &row.get::<_, String>(1)?)?,
    })
}

/// Convert a database row to a Node.
pub(crate) fn row_to_node(row: &rusqlite::Row) -> rusqlite::Result<Node> {
    Ok(Node {
        id: NodeId::from(row.get::<_, i64>(0)?),
        location: Point::new(row.get(1)?, row.get(2)?),
    })
}

/// Convert a database row to an Edge.
pub(crate) fn row_to_edge(row: &rusqlite::Row) -> rusqlite::Result<Edge> {
    Ok(Edge {
        id: EdgeId::from(row.get::<_, i64>(0)?),
        source: NodeId::from(row.get::<_, i64>(1)?),
        target: NodeId::from(row.get::<_, i64>(2)?),
        pipe_id: PipeId::from(row.get::<_, i64>(3)?),
        length_m: row.get(4)?,
        geometry: parse_geometry::<LineString>(5, &row.get::<_, String>(5)?)?,
        affected_building_count: row.get(6)?,
    })
}
