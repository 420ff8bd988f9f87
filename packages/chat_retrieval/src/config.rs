use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

// =============================================================================
// Tunables (figment-deserialized from defaults / config.toml / env vars)
// =============================================================================
//
//   config.toml:     [store]
//                    path = "/srv/bridge/store/messages.db"
//
//   env var:         CHAT_STORE__PATH=/srv/bridge/store/messages.db
//                    (double underscore = nesting)

pub const ENV_PREFIX: &str = "CHAT_";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub store: StoreFileConfig,
    #[serde(default)]
    pub defaults: QueryDefaults,
    #[serde(default)]
    pub log: LogFileConfig,
}

/// Store location and pool sizing (lives under `[store]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreFileConfig {
    /// Path to the bridge's SQLite message database. Relative paths resolve
    /// against the data directory.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for StoreFileConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Defaults applied by callers that do not pass explicit sizes (lives under
/// `[defaults]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryDefaults {
    #[serde(default = "crate::params::default_limit")]
    pub limit: i64,
    #[serde(default = "crate::params::default_listing_context")]
    pub listing_context: i64,
    #[serde(default = "crate::params::default_window")]
    pub context_window: i64,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            limit: crate::params::default_limit(),
            listing_context: crate::params::default_listing_context(),
            context_window: crate::params::default_window(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogFileConfig {
    /// Default tracing directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogFileConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("store").join("messages.db")
}

fn default_max_connections() -> u32 {
    4
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Build a figment that layers: defaults → `<data_dir>/config.toml` → `CHAT_*`
/// env vars.
pub fn load_config(data_dir: &Path) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(data_dir.join("config.toml")))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

// =============================================================================
// Resolved runtime view
// =============================================================================

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub max_connections: u32,
}

impl StoreConfig {
    pub fn from_file(data_dir: &Path, fc: &StoreFileConfig) -> Self {
        let db_path = if fc.path.is_absolute() {
            fc.path.clone()
        } else {
            data_dir.join(&fc.path)
        };
        Self {
            db_path,
            max_connections: fc.max_connections.max(1),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RetrievalConfig {
    pub data_dir: PathBuf,
    pub store: StoreConfig,
    pub defaults: QueryDefaults,
    pub log_level: String,
}

impl RetrievalConfig {
    /// Resolve the data directory (defaults to `~/.chat-retrieval`) and extract
    /// the layered config from it.
    pub fn load(custom_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = match custom_dir {
            Some(dir) => dir,
            None => dirs::home_dir()
                .context("Could not find home directory")?
                .join(".chat-retrieval"),
        };

        let file: FileConfig = load_config(&data_dir)
            .extract()
            .with_context(|| format!("Invalid configuration in {}", data_dir.display()))?;

        Ok(Self::from_file(data_dir, file))
    }

    pub fn from_file(data_dir: PathBuf, file: FileConfig) -> Self {
        let store = StoreConfig::from_file(&data_dir, &file.store);
        Self {
            data_dir,
            store,
            defaults: file.defaults,
            log_level: file.log.level,
        }
    }
}
