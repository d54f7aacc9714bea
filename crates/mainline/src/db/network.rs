//! Pipe, service and building storage.

use std::collections::HashSet;

use rusqlite::params;

use super::{
    encode_geometry, row_to_building, row_to_pipe, row_to_service, Store, BUILDINGS_COLUMNS,
    PIPES_COLUMNS, SERVICES_COLUMNS,
};
use crate::error::{Error, Result};
use crate::types::{Building, NetworkData, Pipe, Service};

/// Record counts written by [`Store::replace_network`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Pipes written.
    pub pipes: usize,
    /// Services written.
    pub services: usize,
    /// Buildings written.
    pub buildings: usize,
}

/// Check ids are unique and every service references a known pipe and building.
///
/// # Errors
///
/// Returns `Error::InvalidInput` describing the first problem found.
pub fn validate_network(data: &NetworkData) -> Result<()> {
    let mut pipe_ids = HashSet::with_capacity(data.pipes.len());
    for pipe in &data.pipes {
        if !pipe_ids.insert(pipe.id) {
            return Err(Error::InvalidInput(format!("duplicate pipe id {}", pipe.id)));
        }
        if !pipe.length_m.is_finite() || pipe.length_m < 0.0 {
            return Err(Error::InvalidInput(format!(
                "pipe {} has invalid length {}",
                pipe.id, pipe.length_m
            )));
        }
    }

    let mut building_ids = HashSet::with_capacity(data.buildings.len());
    for building in &data.buildings {
        if !building_ids.insert(building.id) {
            return Err(Error::InvalidInput(format!(
                "duplicate building id {}",
                building.id
            )));
        }
    }

    let mut service_ids = HashSet::with_capacity(data.services.len());
    for service in &data.services {
        if !service_ids.insert(service.id) {
            return Err(Error::InvalidInput(format!(
                "duplicate service id {}",
                service.id
            )));
        }
        if !pipe_ids.contains(&service.pipe_id) {
            return Err(Error::InvalidInput(format!(
                "service {} references unknown pipe {}",
                service.id, service.pipe_id
            )));
        }
        if !building_ids.contains(&service.building_id) {
            return Err(Error::InvalidInput(format!(
                "service {} references unknown building {}",
                service.id, service.building_id
            )));
        }
    }
    Ok(())
}

impl Store {
    /// Replace the whole network, clearing any derived graph.
    ///
    /// Runs in a single transaction: either everything is written or nothing
    /// changes.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the data fails validation and
    /// `Error::Database` on storage failure.
    pub fn replace_network(&self, data: &NetworkData) -> Result<LoadSummary> {
        validate_network(data)?;

        let mut conn = self.connection()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM graph_edges", [])?;
        tx.execute("DELETE FROM graph_nodes", [])?;
        tx.execute("DELETE FROM services", [])?;
        tx.execute("DELETE FROM buildings", [])?;
        tx.execute("DELETE FROM pipes", [])?;

        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO pipes ({PIPES_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
            ))?;
            for pipe in &data.pipes {
                insert.execute(params![
                    pipe.id.as_i64(),
                    pipe.class.as_str(),
                    pipe.diameter_mm,
                    pipe.material,
                    pipe.install_year,
                    pipe.length_m,
                    encode_geometry(&pipe.geometry)?,
                ])?;
            }

            let mut insert = tx.prepare(&format!(
                "INSERT INTO buildings ({BUILDINGS_COLUMNS}) VALUES (?1, ?2)"
            ))?;
            for building in &data.buildings {
                insert.execute(params![
                    building.id.as_i64(),
                    encode_geometry(&building.geometry)?
                ])?;
            }

            let mut insert = tx.prepare(&format!(
                "INSERT INTO services ({SERVICES_COLUMNS}) VALUES (?1, ?2, ?3, ?4)"
            ))?;
            for service in &data.services {
                insert.execute(params![
                    service.id.as_i64(),
                    service.building_id.as_i64(),
                    service.pipe_id.as_i64(),
                    service.length_m,
                ])?;
            }
        }

        tx.commit()?;

        let summary = LoadSummary {
            pipes: data.pipes.len(),
            services: data.services.len(),
            buildings: data.buildings.len(),
        };
        tracing::info!(
            pipes = summary.pipes,
            services = summary.services,
            buildings = summary.buildings,
            "Replaced network data"
        );
        Ok(summary)
    }

    /// All pipes, ascending id.
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` on storage failure or corrupt rows.
    pub fn pipes(&self) -> Result<Vec<Pipe>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!("SELECT {PIPES_COLUMNS} FROM pipes ORDER BY id"))?;
        let rows = stmt.query_map([], row_to_pipe)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// All services, ascending id.
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` on storage failure.
    pub fn services(&self) -> Result<Vec<Service>> {
        let conn = self.connection()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {SERVICES_COLUMNS} FROM services ORDER BY id"))?;
        let rows = stmt.query_map([], row_to_service)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// All buildings, ascending id.
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` on storage failure or corrupt rows.
    pub fn buildings(&self) -> Result<Vec<Building>> {
        let conn = self.connection()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {BUILDINGS_COLUMNS} FROM buildings ORDER BY id"))?;
        let rows = stmt.query_map([], row_to_building)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Read the whole network back.
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` on storage failure or corrupt rows.
    pub fn network(&self) -> Result<NetworkData> {
        Ok(NetworkData {
            pipes: self.pipes()?,
            services: self.services()?,
            buildings: self.buildings()?,
        })
    }
}
