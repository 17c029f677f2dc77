//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! NewsData API keys are loaded from the NEWSDATA_API_KEY env var or
//! api_keys_file, never stored in the TOML directly to avoid leaking secrets.

use common::Secret;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Env var holding one key or a comma-separated list of keys.
pub const API_KEY_ENV: &str = "NEWSDATA_API_KEY";

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub newsdata: NewsdataConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Upstream NewsData.io settings
#[derive(Debug, Deserialize)]
pub struct NewsdataConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Path to a file containing the key list (alternative to NEWSDATA_API_KEY)
    #[serde(default)]
    pub api_keys_file: Option<PathBuf>,
    #[serde(skip)]
    pub api_keys: Option<Secret<String>>,
}

impl Default for NewsdataConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            api_keys_file: None,
            api_keys: None,
        }
    }
}

impl NewsdataConfig {
    /// Connection settings for the NewsData client.
    pub fn client_config(&self) -> newsdata::ClientConfig {
        newsdata::ClientConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

fn default_base_url() -> String {
    "https://newsdata.io/api/1".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    100
}

fn default_max_connections() -> usize {
    256
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// API key resolution order:
    /// 1. NEWSDATA_API_KEY env var
    /// 2. api_keys_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if !config.newsdata.base_url.starts_with("http://")
            && !config.newsdata.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                config.newsdata.base_url
            )));
        }

        if config.newsdata.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if config.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        // Resolve API keys: env var takes precedence over file
        if let Ok(keys) = std::env::var(API_KEY_ENV) {
            config.newsdata.api_keys = Some(Secret::new(keys));
        } else if let Some(ref keys_file) = config.newsdata.api_keys_file {
            let keys = std::fs::read_to_string(keys_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read api_keys_file {}: {e}",
                    keys_file.display()
                ))
            })?;
            config.newsdata.api_keys = Some(Secret::new(keys.trim().to_owned()));
        }

        if config.newsdata.api_keys.is_none() {
            return Err(common::Error::Config(format!(
                "{API_KEY_ENV} is not set and no api_keys_file is configured"
            )));
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("news-gateway.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables, preventing
    /// data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn minimal_toml() -> &'static str {
        r#"
[server]
listen_addr = "127.0.0.1:8090"
"#
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("news-gateway.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_defaults_with_env_keys() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, minimal_toml());

        unsafe { set_env(API_KEY_ENV, "pub_key1, pub_key2") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env(API_KEY_ENV) };

        assert_eq!(config.server.listen_addr.port(), 8090);
        assert_eq!(config.server.max_connections, 256);
        assert_eq!(config.newsdata.base_url, "https://newsdata.io/api/1");
        assert_eq!(config.newsdata.timeout_secs, 30);
        assert_eq!(config.newsdata.max_retries, 2);
        assert_eq!(config.newsdata.retry_delay_ms, 100);
        assert_eq!(
            config.newsdata.api_keys.as_ref().unwrap().expose(),
            "pub_key1, pub_key2"
        );
    }

    #[test]
    fn test_load_custom_values() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[server]
listen_addr = "0.0.0.0:9000"
max_connections = 32

[newsdata]
base_url = "http://localhost:4010/api/1"
timeout_secs = 5
max_retries = 0
retry_delay_ms = 250
"#,
        );

        unsafe { set_env(API_KEY_ENV, "pub_key1") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env(API_KEY_ENV) };

        assert_eq!(config.server.max_connections, 32);
        let client = config.newsdata.client_config();
        assert_eq!(client.base_url, "http://localhost:4010/api/1");
        assert_eq!(client.timeout, Duration::from_secs(5));
        assert_eq!(client.max_retries, 0);
        assert_eq!(client.retry_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(common::Error::Io(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "not valid {{{{ toml");
        assert!(matches!(Config::load(&path), Err(common::Error::Toml(_))));
    }

    #[test]
    fn test_missing_keys_is_config_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, minimal_toml());

        unsafe { remove_env(API_KEY_ENV) };
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains(API_KEY_ENV), "got: {err}");
    }

    #[test]
    fn test_keys_from_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let keys_path = dir.path().join("newsdata-keys");
        std::fs::write(&keys_path, "pub_file1,pub_file2\n").unwrap();
        let path = write_config(
            &dir,
            &format!(
                r#"
[server]
listen_addr = "127.0.0.1:8090"

[newsdata]
api_keys_file = "{}"
"#,
                keys_path.display()
            ),
        );

        unsafe { remove_env(API_KEY_ENV) };
        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.newsdata.api_keys.as_ref().unwrap().expose(),
            "pub_file1,pub_file2"
        );
    }

    #[test]
    fn test_env_keys_override_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let keys_path = dir.path().join("newsdata-keys");
        std::fs::write(&keys_path, "pub_from_file").unwrap();
        let path = write_config(
            &dir,
            &format!(
                r#"
[server]
listen_addr = "127.0.0.1:8090"

[newsdata]
api_keys_file = "{}"
"#,
                keys_path.display()
            ),
        );

        unsafe { set_env(API_KEY_ENV, "pub_from_env") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env(API_KEY_ENV) };

        assert_eq!(
            config.newsdata.api_keys.as_ref().unwrap().expose(),
            "pub_from_env"
        );
    }

    #[test]
    fn test_unreadable_keys_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[server]
listen_addr = "127.0.0.1:8090"

[newsdata]
api_keys_file = "/nonexistent/newsdata-keys"
"#,
        );

        unsafe { remove_env(API_KEY_ENV) };
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("api_keys_file"), "got: {err}");
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[server]
listen_addr = "127.0.0.1:8090"

[newsdata]
base_url = "newsdata.io/api/1"
"#,
        );
        unsafe { set_env(API_KEY_ENV, "pub_key1") };
        let result = Config::load(&path);
        unsafe { remove_env(API_KEY_ENV) };
        assert!(result.unwrap_err().to_string().contains("base_url"));
    }

    #[test]
    fn test_rejects_zero_timeout_and_connections() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        unsafe { set_env(API_KEY_ENV, "pub_key1") };

        let path = write_config(
            &dir,
            r#"
[server]
listen_addr = "127.0.0.1:8090"

[newsdata]
timeout_secs = 0
"#,
        );
        assert!(
            Config::load(&path)
                .unwrap_err()
                .to_string()
                .contains("timeout_secs")
        );

        let path = write_config(
            &dir,
            r#"
[server]
listen_addr = "127.0.0.1:8090"
max_connections = 0
"#,
        );
        assert!(
            Config::load(&path)
                .unwrap_err()
                .to_string()
                .contains("max_connections")
        );

        unsafe { remove_env(API_KEY_ENV) };
    }

    #[test]
    fn test_resolve_path_cli_arg() {
        let path = Config::resolve_path(Some("/custom/path.toml"));
        assert_eq!(path, PathBuf::from("/custom/path.toml"));
    }

    #[test]
    fn test_resolve_path_env_var() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/path.toml") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("/env/path.toml"));
        unsafe { remove_env("CONFIG_PATH") };
    }

    #[test]
    fn test_resolve_path_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONFIG_PATH") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("news-gateway.toml"));
    }

    #[test]
    fn test_debug_redacts_keys() {
        let config = NewsdataConfig {
            api_keys: Some(Secret::new("pub_secret_value".into())),
            ..NewsdataConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("pub_secret_value"), "got: {debug}");
    }
}
