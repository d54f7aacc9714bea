//! `GeoJSON` rendering of engine geometry.
//!
//! Geometries go through `geojson`'s `geo` conversions; properties are set
//! per feature by the handlers.

use geojson::{Feature, FeatureCollection, Geometry, Value};

/// A feature for `geometry` with no properties yet.
pub fn feature(geometry: impl Into<geo::Geometry>) -> Feature {
    Feature::from(Geometry::new(Value::from(&geometry.into())))
}

/// Collect `features` without a bounding box.
#[must_use]
pub fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
