//! Tunables for history stores and the spatial index.
use std::{fs::File, io::BufReader, path::Path};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{Result, VersionedIntError},
    history::{ENTRY_SIZE, HEADER_SIZE},
};

/// 512 MiB
pub const DEFAULT_MAX_BYTES: usize = 512 * 1024 * 1024;
pub const DEFAULT_MAX_FANOUT: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Hard cap on the byte size of one store's buffer (header plus every entry slot).
    pub max_bytes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Children an internal node may hold before it is split.
    pub max_fanout: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_fanout: DEFAULT_MAX_FANOUT,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub index: IndexConfig,
}

impl Config {
    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let config: Config = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        debug!(?path, ?config, "Loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.index.validate()?;
        self.store.validate()
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_bytes < HEADER_SIZE + ENTRY_SIZE {
            return Err(VersionedIntError::InvalidConfig(format!(
                "store.max_bytes must fit at least one entry ({} bytes), got {}",
                HEADER_SIZE + ENTRY_SIZE,
                self.max_bytes
            )));
        }
        Ok(())
    }
}

impl IndexConfig {
    /// A split needs at least two children to hand one to each side.
    pub fn validate(&self) -> Result<()> {
        if self.max_fanout < 2 {
            return Err(VersionedIntError::InvalidConfig(format!(
                "index.max_fanout must be at least 2, got {}",
                self.max_fanout
            )));
        }
        Ok(())
    }
}
