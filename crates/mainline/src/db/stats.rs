//! Aggregate network statistics.

use serde::Serialize;

use super::Store;
use crate::error::Result;

/// Whole-network totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkTotals {
    /// Number of pipes.
    pub pipe_count: usize,
    /// Summed pipe length in metres.
    pub pipe_length_m: f64,
    /// Number of service connections.
    pub service_count: usize,
    /// Summed service length in metres.
    pub service_length_m: f64,
    /// Number of buildings.
    pub building_count: usize,
}

/// Pipes of one material.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialStats {
    /// Material name.
    pub material: String,
    /// Number of pipes.
    pub count: usize,
    /// Summed length in metres.
    pub total_length_m: f64,
}

/// Pipes of one class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassStats {
    /// Class name (`main` or `secondary`).
    pub class: String,
    /// Number of pipes.
    pub count: usize,
    /// Summed length in metres.
    pub total_length_m: f64,
    /// Mean diameter, rounded to the millimetre.
    pub avg_diameter_mm: u32,
}

/// Pipes installed in one era.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeStats {
    /// `Pre-1990`, `1990-1999`, `2000-2009` or `2010+`.
    pub era: String,
    /// Number of pipes.
    pub count: usize,
    /// Summed length in metres.
    pub total_length_m: f64,
}

/// Breakdown of the network by material, class and installation era.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkStats {
    /// Totals.
    pub totals: NetworkTotals,
    /// By material, longest first.
    pub by_material: Vec<MaterialStats>,
    /// By class, alphabetical.
    pub by_class: Vec<ClassStats>,
    /// By era, oldest first.
    pub by_age: Vec<AgeStats>,
}

/// Round to one decimal place.
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn to_count(raw: i64) -> usize {
    usize::try_from(raw).unwrap_or(0)
}

impl Store {
    /// Compute aggregate statistics over the stored network.
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` on storage failure.
    pub fn network_stats(&self) -> Result<NetworkStats> {
        let conn = self.connection()?;

        let totals = conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM pipes),
                (SELECT COALESCE(SUM(length_m), 0.0) FROM pipes),
                (SELECT COUNT(*) FROM services),
                (SELECT COALESCE(SUM(length_m), 0.0) FROM services),
                (SELECT COUNT(*) FROM buildings)",
            [],
            |row| {
                Ok(NetworkTotals {
                    pipe_count: to_count(row.get(0)?),
                    pipe_length_m: round1(row.get(1)?),
                    service_count: to_count(row.get(2)?),
                    service_length_m: round1(row.get(3)?),
                    building_count: to_count(row.get(4)?),
                })
            },
        )?;

        let mut stmt = conn.prepare(
            "SELECT material, COUNT(*), SUM(length_m) AS total
             FROM pipes GROUP BY material ORDER BY total DESC, material",
        )?;
        let by_material = stmt
            .query_map([], |row| {
                Ok(MaterialStats {
                    material: row.get(0)?,
                    count: to_count(row.get(1)?),
                    total_length_m: round1(row.get(2)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
            "SELECT class, COUNT(*), SUM(length_m), AVG(diameter_mm)
             FROM pipes GROUP BY class ORDER BY class",
        )?;
        let by_class = stmt
            .query_map([], |row| {
                let avg: f64 = row.get(3)?;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let avg_diameter_mm = avg.round().max(0.0) as u32;
                Ok(ClassStats {
                    class: row.get(0)?,
                    count: to_count(row.get(1)?),
                    total_length_m: round1(row.get(2)?),
                    avg_diameter_mm,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
            "SELECT
                CASE
                    WHEN install_year >= 2010 THEN '2010+'
                    WHEN install_year >= 2000 THEN '2000-2009'
                    WHEN install_year >= 1990 THEN '1990-1999'
                    ELSE 'Pre-1990'
                END AS era,
                MIN(install_year) AS first_year,
                COUNT(*),
                SUM(length_m)
             FROM pipes GROUP BY era ORDER BY first_year",
        )?;
        let by_age = stmt
            .query_map([], |row| {
                Ok(AgeStats {
                    era: row.get(0)?,
                    count: to_count(row.get(2)?),
                    total_length_m: round1(row.get(3)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(NetworkStats {
            totals,
            by_material,
            by_class,
            by_age,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LineString, NetworkData, Pipe, PipeClass, PipeId};

    fn pipe(id: i64, class: PipeClass, material: &str, year: i32, length: f64, diameter: u32) -> Pipe {
        Pipe {
            id: PipeId(id),
            class,
            diameter_mm: diameter,
            material: material.into(),
            install_year: year,
            length_m: length,
            geometry: LineString::from(vec![[0.0, 0.0], [0.001, 0.0]]),
        }
    }

    #[test]
    fn empty_store_has_zero_totals() {
        let store = Store::open_in_memory().expect("store");
        let stats = store.network_stats().expect("stats");
        assert_eq!(stats.totals, NetworkTotals::default());
        assert!(stats.by_material.is_empty());
    }

    #[test]
    fn breakdowns_group_and_order() {
        let store = Store::open_in_memory().expect("store");
        let data = NetworkData {
            pipes: vec![
                pipe(1, PipeClass::Main, "ductile_iron", 1975, 200.0, 300),
                pipe(2, PipeClass::Main, "ductile_iron", 2015, 100.04, 400),
                pipe(3, PipeClass::Secondary, "pvc", 1995, 50.0, 150),
                pipe(4, PipeClass::Secondary, "pvc", 2005, 25.0, 100),
            ],
            ..NetworkData::default()
        };
        store.replace_network(&data).expect("load");
        let stats = store.network_stats().expect("stats");

        assert_eq!(stats.totals.pipe_count, 4);
        assert!((stats.totals.pipe_length_m - 375.0).abs() < 1e-9);

        assert_eq!(stats.by_material[0].material, "ductile_iron");
        assert!((stats.by_material[0].total_length_m - 300.0).abs() < 1e-9);

        assert_eq!(stats.by_class[0].class, "main");
        assert_eq!(stats.by_class[0].avg_diameter_mm, 350);
        assert_eq!(stats.by_class[1].avg_diameter_mm, 125);

        let eras: Vec<&str> = stats.by_age.iter().map(|a| a.era.as_str()).collect();
        assert_eq!(eras, vec!["Pre-1990", "1990-1999", "2000-2009", "2010+"]);
    }
}
