use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use log::debug;

use super::alias::AliasTable;
use super::filter::{resolve_filter_file, Filter};
use crate::config::FluxingConfig;
use crate::error::Result;

/// Parsed filters shared by resolved file.
///
/// Every name that resolves to the same file (`WISE_3.4`, `wise_1`, `wise1`)
/// gets the same `Arc<Filter>`, so a curve is parsed once however many
/// SEDs use it. A shared filter keeps the name it was first requested with.
#[derive(Debug)]
pub struct FilterBank {
    config: FluxingConfig,
    aliases: AliasTable,
    loaded: Mutex<HashMap<PathBuf, Arc<Filter>>>,
}

impl FilterBank {
    pub fn new(config: FluxingConfig) -> Self {
        Self::with_aliases(config, AliasTable::default())
    }

    pub fn with_aliases(config: FluxingConfig, aliases: AliasTable) -> Self {
        Self {
            config,
            aliases,
            loaded: Mutex::new(HashMap::new()),
        }
    }

    /// Bank over the directory configured in the environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(FluxingConfig::from_env()?))
    }

    pub fn config(&self) -> &FluxingConfig {
        &self.config
    }

    pub fn get(&self, name: &str) -> Result<Arc<Filter>> {
        let path = resolve_filter_file(name, &self.config, &self.aliases)?;

        let mut loaded = self.loaded.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(filter) = loaded.get(&path) {
            return Ok(Arc::clone(filter));
        }
        debug!("filter bank: loading '{name}' from {}", path.display());
        let filter = Arc::new(Filter::from_file_named(name, &path)?);
        loaded.insert(path, Arc::clone(&filter));
        Ok(filter)
    }

    pub fn get_many<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Arc<Filter>>> {
        names.iter().map(|n| self.get(n.as_ref())).collect()
    }

    /// Number of distinct filter files parsed so far.
    pub fn len(&self) -> usize {
        self.loaded.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
