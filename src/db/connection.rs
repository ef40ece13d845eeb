//! Storage connection.
//!
//! The library lives in one SurrealDB namespace/database pair. Three
//! backends are supported: an on-disk RocksDB store under the data
//! directory, a throwaway in-process store, and a remote server over
//! WebSocket. All three hand back the same `Surreal<Any>` handle.

use std::path::Path;

use serde::{Deserialize, Serialize};
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;
use surrealdb::opt::capabilities::Capabilities;
use surrealdb::Surreal;

use crate::ManuscryptError;

pub type ManuscryptDb = Surreal<Any>;

pub const DB_CONFIG_FILE: &str = "database.toml";

const NAMESPACE: &str = "manuscrypt";
const DATABASE: &str = "library";
const STORE_DIR: &str = "library.db";

fn default_namespace() -> String {
    NAMESPACE.to_string()
}

fn default_database() -> String {
    DATABASE.to_string()
}

/// Which store backs the library. Serialized with a `mode` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DbConfig {
    /// RocksDB on disk; holds an exclusive lock while open.
    Embedded {
        /// Store directory. Unset: `{data_path}/library.db`.
        #[serde(default)]
        path: Option<String>,
    },
    Memory,
    Remote {
        /// e.g. `ws://127.0.0.1:8000`
        endpoint: String,
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        password: Option<String>,
        #[serde(default = "default_namespace")]
        namespace: String,
        #[serde(default = "default_database")]
        database: String,
    },
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::Embedded { path: None }
    }
}

impl DbConfig {
    /// Parse `database.toml`. Unreadable or invalid files are logged and
    /// ignored so that the next source gets a chance.
    fn from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|contents| toml::from_str::<Self>(&contents).map_err(|e| e.to_string()));
        match parsed {
            Ok(config) => {
                tracing::info!(path = %path.display(), "Using database config file");
                Some(config)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring database config file");
                None
            }
        }
    }

    /// `MANUSCRYPT_DB_URL`: `mem://` (or `memory`) selects the in-process
    /// store, anything else is a remote endpoint.
    fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let url = lookup("MANUSCRYPT_DB_URL").filter(|u| !u.trim().is_empty())?;
        tracing::info!("Using database from MANUSCRYPT_DB_URL");
        if url == "mem://" || url == "memory" {
            return Some(Self::Memory);
        }
        Some(Self::Remote {
            endpoint: url,
            username: lookup("MANUSCRYPT_DB_USER"),
            password: lookup("MANUSCRYPT_DB_PASS"),
            namespace: default_namespace(),
            database: default_database(),
        })
    }
}

/// Config file first, then `MANUSCRYPT_DB_URL`, then the embedded store.
pub fn load_db_config(data_path: &Path) -> DbConfig {
    DbConfig::from_file(&data_path.join(DB_CONFIG_FILE))
        .or_else(|| DbConfig::from_env(|key| std::env::var(key).ok()))
        .unwrap_or_default()
}

/// Explicit value, then the environment, then `root`.
fn credential(explicit: &Option<String>, env_key: &str) -> String {
    explicit
        .clone()
        .or_else(|| std::env::var(env_key).ok())
        .unwrap_or_else(|| "root".to_string())
}

/// Open the configured store and select the library namespace.
pub async fn init_db(config: &DbConfig, data_path: &Path) -> Result<ManuscryptDb, ManuscryptError> {
    let db = match config {
        DbConfig::Embedded { path } => {
            let store = match path {
                Some(p) => p.clone(),
                None => data_path.join(STORE_DIR).to_string_lossy().into_owned(),
            };
            let options = surrealdb::opt::Config::new().capabilities(Capabilities::all());
            surrealdb::engine::any::connect((format!("rocksdb:{store}"), options)).await?
        }
        DbConfig::Memory => surrealdb::engine::any::connect("mem://").await?,
        DbConfig::Remote {
            endpoint,
            username,
            password,
            namespace,
            database,
        } => {
            let db = surrealdb::engine::any::connect(endpoint).await?;
            let username = credential(username, "MANUSCRYPT_DB_USER");
            let password = credential(password, "MANUSCRYPT_DB_PASS");
            db.signin(Root {
                username: &username,
                password: &password,
            })
            .await?;
            db.use_ns(namespace).use_db(database).await?;
            return Ok(db);
        }
    };
    db.use_ns(NAMESPACE).use_db(DATABASE).await?;
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_db_config_parses_tagged_modes() {
        let memory: DbConfig = toml::from_str(r#"mode = "memory""#).unwrap();
        assert!(matches!(memory, DbConfig::Memory));

        let remote: DbConfig =
            toml::from_str("mode = \"remote\"\nendpoint = \"ws://127.0.0.1:8000\"").unwrap();
        match remote {
            DbConfig::Remote {
                endpoint,
                namespace,
                database,
                ..
            } => {
                assert_eq!(endpoint, "ws://127.0.0.1:8000");
                assert_eq!(namespace, "manuscrypt");
                assert_eq!(database, "library");
            }
            other => panic!("expected remote config, got {other:?}"),
        }
    }

    #[test]
    fn test_db_config_file_takes_priority() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(DB_CONFIG_FILE), "mode = \"memory\"\n").unwrap();
        assert!(matches!(load_db_config(dir.path()), DbConfig::Memory));
    }

    #[test]
    fn test_invalid_file_is_ignored() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(DB_CONFIG_FILE);
        std::fs::write(&path, "mode = \"tape\"\n").unwrap();
        assert!(DbConfig::from_file(&path).is_none());
    }

    #[test]
    fn test_env_url_selects_backend() {
        let env: HashMap<&str, &str> = [
            ("MANUSCRYPT_DB_URL", "ws://db:8000"),
            ("MANUSCRYPT_DB_USER", "writer"),
        ]
        .into_iter()
        .collect();
        match DbConfig::from_env(|k| env.get(k).map(|v| v.to_string())) {
            Some(DbConfig::Remote {
                endpoint,
                username,
                password,
                ..
            }) => {
                assert_eq!(endpoint, "ws://db:8000");
                assert_eq!(username.as_deref(), Some("writer"));
                assert_eq!(password, None);
            }
            other => panic!("expected remote config, got {other:?}"),
        }

        let memory = DbConfig::from_env(|k| (k == "MANUSCRYPT_DB_URL").then(|| "mem://".to_string()));
        assert!(matches!(memory, Some(DbConfig::Memory)));
        assert!(DbConfig::from_env(|_| None).is_none());
    }
}
