//! CLI command implementations.

mod display;
pub mod build;
pub mod criticality;
pub mod load;
pub mod outage;
pub mod spread;
pub mod stats;
pub mod status;

use std::path::{Path, PathBuf};

use mainline::config::parse_database_url;
use mainline::{MainlineConfig, Network, Store};

/// Settings shared by every command.
pub struct Context {
    config: MainlineConfig,
    database: PathBuf,
}

impl Context {
    /// Resolve configuration and store location from the global flags.
    ///
    /// An explicit `--database` wins over the environment and the file.
    pub fn new(config_path: Option<&Path>, database: Option<&str>) -> Result<Self, mainline::Error> {
        let config = match config_path {
            Some(path) => MainlineConfig::load(path)?,
            None => MainlineConfig::default(),
        };
        let database = match database {
            Some(url) => parse_database_url(url)?,
            None => config.database_path()?,
        };
        tracing::debug!(database = %database.display(), "Resolved graph store");
        Ok(Self { config, database })
    }

    /// Open an existing graph store.
    pub fn open(&self) -> Result<Network, mainline::Error> {
        let store = Store::open(&self.database)?;
        Network::with_store(store, self.config.clone())
    }

    /// Open the graph store, creating it if necessary.
    pub fn create(&self) -> Result<Network, mainline::Error> {
        let store = Store::create(&self.database)?;
        Network::with_store(store, self.config.clone())
    }

    /// Resolved store path.
    pub fn database(&self) -> &Path {
        &self.database
    }
}
