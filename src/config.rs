use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::error::{FluxingError, Result};

/// Environment variable naming the directory with filter transmission files.
pub const FILTER_DIR_ENV: &str = "SEDFLUX_FILTER_DIR";

/// Environment variable naming a JSON configuration file.
pub const CONFIG_ENV: &str = "SEDFLUX_CONFIG";

/// Directory used when neither the environment nor a config file names one.
pub const DEFAULT_FILTER_DIR: &str = "filterdata";

// ---------------------------------------------------------------------------
// FluxingConfig
// ---------------------------------------------------------------------------

/// Where filter files live and which extra names resolve to them.
///
/// JSON layout:
///
/// ```json
/// {
///   "filter_dir": "/data/filters",
///   "aliases": { "IRAC1": "irac_i1", "w1": "wise1" }
/// }
/// ```
///
/// `aliases` maps a (case-insensitive) user-facing name to a filter file stem
/// and is consulted before the built-in survey rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FluxingConfig {
    pub filter_dir: PathBuf,
    pub aliases: BTreeMap<String, String>,
}

impl Default for FluxingConfig {
    fn default() -> Self {
        Self {
            filter_dir: PathBuf::from(DEFAULT_FILTER_DIR),
            aliases: BTreeMap::new(),
        }
    }
}

impl FluxingConfig {
    /// Configuration pointing at `dir`, with no extra aliases.
    pub fn with_filter_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            filter_dir: dir.into(),
            ..Default::default()
        }
    }

    /// Parse a JSON configuration file.
    ///
    /// A relative `filter_dir` is taken relative to the file's directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| FluxingError::io(path, e))?;
        let mut config: FluxingConfig = serde_json::from_str(&text)
            .map_err(|e| FluxingError::Config(format!("{}: {e}", path.display())))?;

        if config.filter_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.filter_dir = parent.join(&config.filter_dir);
            }
        }
        config.aliases = config
            .aliases
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v.to_lowercase()))
            .collect();
        Ok(config)
    }

    /// Configuration from the process environment.
    ///
    /// `SEDFLUX_CONFIG` wins over `SEDFLUX_FILTER_DIR`; with neither set the
    /// filters are looked up in `./filterdata`.
    pub fn from_env() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            debug!("loading fluxing config from {path:?}");
            return Self::from_file(Path::new(&path));
        }
        match std::env::var_os(FILTER_DIR_ENV) {
            Some(dir) => Ok(Self::with_filter_dir(dir)),
            None => Ok(Self::default()),
        }
    }

    /// Look up a user-supplied alias (case-insensitive).
    pub fn alias(&self, name: &str) -> Option<&str> {
        self.aliases.get(&name.to_lowercase()).map(String::as_str)
    }
}
