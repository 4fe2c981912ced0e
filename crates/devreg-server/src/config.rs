use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use devreg_sync::RegistryConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// JSON index, loaded once at startup.
    pub index_path: PathBuf,
    pub registry: RegistryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 7070)),
            index_path: PathBuf::from("/registry/index.json"),
            registry: RegistryConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read a TOML config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ServerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> ServerResult<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "0.0.0.0:7070".parse::<SocketAddr>().unwrap());
        assert_eq!(c.index_path, PathBuf::from("/registry/index.json"));
        assert_eq!(c.registry.host, "localhost:5000");
        assert_eq!(c.registry.stacks_root, PathBuf::from("/registry/stacks"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = ServerConfig::from_toml(
            r#"
            bind_addr = "127.0.0.1:8080"

            [registry]
            host = "registry.internal:5000"
            "#,
        )
        .unwrap();
        assert_eq!(c.bind_addr.port(), 8080);
        assert_eq!(c.index_path, PathBuf::from("/registry/index.json"));
        assert_eq!(c.registry.host, "registry.internal:5000");
        assert_eq!(c.registry.probe_interval_ms, 1000);
    }

    #[test]
    fn bad_toml_is_rejected() {
        let err = ServerConfig::from_toml("bind_addr = 7070").unwrap_err();
        assert!(matches!(err, ServerError::ConfigParse(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devreg.toml");
        std::fs::write(&path, "index_path = \"/srv/index.json\"\n").unwrap();
        let c = ServerConfig::load(&path).unwrap();
        assert_eq!(c.index_path, PathBuf::from("/srv/index.json"));

        let missing = ServerConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ServerError::ConfigRead { .. }));
    }
}
