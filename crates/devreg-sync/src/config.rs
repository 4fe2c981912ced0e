use std::path::PathBuf;
use std::time::Duration;

use devreg_oci::ClientConfig;
use serde::{Deserialize, Serialize};

/// Where the registry lives and how patiently to talk to it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// `host:port` of the OCI registry, without scheme.
    pub host: String,
    pub plain_http: bool,
    /// Directory holding `{stack}/devfile.yaml`.
    pub stacks_root: PathBuf,
    pub probe_interval_ms: u64,
    pub request_timeout_secs: u64,
    pub pull_deadline_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            host: "localhost:5000".into(),
            plain_http: true,
            stacks_root: PathBuf::from("/registry/stacks"),
            probe_interval_ms: 1000,
            request_timeout_secs: 30,
            pull_deadline_secs: 60,
        }
    }
}

impl RegistryConfig {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn pull_deadline(&self) -> Duration {
        Duration::from_secs(self.pull_deadline_secs)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            plain_http: self.plain_http,
            request_timeout: self.request_timeout(),
            ..ClientConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = RegistryConfig::default();
        assert_eq!(c.host, "localhost:5000");
        assert!(c.plain_http);
        assert_eq!(c.stacks_root, PathBuf::from("/registry/stacks"));
        assert_eq!(c.probe_interval(), Duration::from_secs(1));
        assert_eq!(c.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c: RegistryConfig = toml::from_str(r#"host = "registry:5000""#).unwrap();
        assert_eq!(c.host, "registry:5000");
        assert_eq!(c.probe_interval_ms, 1000);
        assert!(c.client_config().plain_http);
    }
}
