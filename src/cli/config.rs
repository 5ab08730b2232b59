//! Configuration
//!
//! Optional JSON file; every field has a default. Command line flags win
//! over the file, the file wins over the defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::args::ConnectionArgs;
use super::errors::{CliError, CliResult};
use crate::cluster::ClusterEndpoint;
use crate::reconcile::PollPolicy;

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Host of the node to administer (default "localhost")
    #[serde(default = "default_login_host")]
    pub login_host: String,

    /// Port of the node to administer (default 27017)
    #[serde(default = "default_login_port")]
    pub login_port: u16,

    #[serde(default)]
    pub ssl: bool,

    /// Stored credentials file (default ~/.mongodb.cnf)
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,

    /// Connect and server selection timeout (default 10s)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Status queries after an initiation (default 10)
    #[serde(default = "default_primary_wait_attempts")]
    pub primary_wait_attempts: u32,

    /// Seconds between those queries (default 1)
    #[serde(default = "default_primary_wait_interval_secs")]
    pub primary_wait_interval_secs: u64,

    #[serde(default)]
    pub retry_on_version_conflict: bool,
}

fn default_login_host() -> String {
    "localhost".to_string()
}
fn default_login_port() -> u16 {
    27017
}
fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_primary_wait_attempts() -> u32 {
    10
}
fn default_primary_wait_interval_secs() -> u64 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            login_host: default_login_host(),
            login_port: default_login_port(),
            ssl: false,
            credentials_file: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            primary_wait_attempts: default_primary_wait_attempts(),
            primary_wait_interval_secs: default_primary_wait_interval_secs(),
            retry_on_version_conflict: false,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// File named by `--config` (if any) with the remaining flags applied.
    pub fn resolve(args: &ConnectionArgs) -> CliResult<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if let Some(host) = &args.login_host {
            config.login_host = host.clone();
        }
        if let Some(port) = args.login_port {
            config.login_port = port;
        }
        if let Some(path) = &args.credentials_file {
            config.credentials_file = Some(path.clone());
        }
        // Boolean flags can only switch a setting on.
        config.ssl |= args.ssl;
        config.retry_on_version_conflict |= args.retry_on_version_conflict;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.login_host.trim().is_empty() {
            return Err(CliError::config_error("login_host must not be empty"));
        }

        if self.login_port == 0 {
            return Err(CliError::config_error("login_port must be > 0"));
        }

        if self.connect_timeout_secs == 0 {
            return Err(CliError::config_error("connect_timeout_secs must be >= 1"));
        }

        if self.primary_wait_attempts == 0 {
            return Err(CliError::config_error("primary_wait_attempts must be >= 1"));
        }

        Ok(())
    }

    pub fn endpoint(&self) -> ClusterEndpoint {
        ClusterEndpoint::new(self.login_host.clone(), self.login_port, self.ssl)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            self.primary_wait_attempts,
            Duration::from_secs(self.primary_wait_interval_secs),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_config(temp_dir: &TempDir, value: serde_json::Value) -> PathBuf {
        let path = temp_dir.path().join("keeper.json");
        fs::write(&path, value.to_string()).unwrap();
        path
    }

    #[test]
    fn test_config_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.endpoint().to_string(), "localhost:27017");
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.poll_policy(), PollPolicy::default());
        assert!(!config.retry_on_version_conflict);
    }

    #[test]
    fn test_config_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(
            &temp_dir,
            json!({
                "login_host": "db1",
                "login_port": 27019,
                "ssl": true,
                "primary_wait_attempts": 3
            }),
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.login_host, "db1");
        assert_eq!(config.login_port, 27019);
        assert!(config.ssl);
        assert_eq!(config.poll_policy().max_attempts, 3);
    }

    #[test]
    fn test_config_rejects_zero_attempts() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, json!({ "primary_wait_attempts": 0 }));

        let err = Config::load(&path).unwrap_err();
        assert_eq!(err.code_str(), "TOPO_CLI_CONFIG_ERROR");
    }

    #[test]
    fn test_config_rejects_unknown_field() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, json!({ "login_hots": "typo" }));

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_config_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = Config::load(&temp_dir.path().join("absent.json")).unwrap_err();
        assert_eq!(err.code_str(), "TOPO_CLI_CONFIG_ERROR");
    }

    #[test]
    fn test_flags_override_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(
            &temp_dir,
            json!({ "login_host": "from-file", "login_port": 27019 }),
        );
        let args = ConnectionArgs {
            config: Some(path),
            login_host: Some("from-flag".to_string()),
            retry_on_version_conflict: true,
            ..Default::default()
        };

        let config = Config::resolve(&args).unwrap();
        assert_eq!(config.login_host, "from-flag");
        assert_eq!(config.login_port, 27019);
        assert!(config.retry_on_version_conflict);
    }

    #[test]
    fn test_flag_port_zero_rejected() {
        let args = ConnectionArgs {
            login_port: Some(0),
            ..Default::default()
        };
        assert!(Config::resolve(&args).is_err());
    }
}
