//! Server configuration: defaults, then an optional RON file, then environment.

use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use grabber_engine::{EngineConfig, HttpSettings, DEFAULT_REFERER, DEFAULT_SUBSCRIBER_BUFFER};
use grabber_logging::parse_level;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File read when `GRABBER_CONFIG` is unset and the file exists.
pub const DEFAULT_CONFIG_FILE: &str = "./grabber.ron";
pub const CONFIG_PATH_VAR: &str = "GRABBER_CONFIG";

const DEFAULT_ORIGINS: [&str; 2] = [
    "http://localhost:3000",
    "https://fitgirl-downloader.vercel.app",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub download_dir: PathBuf,
    pub environment: String,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub referer: String,
    pub queue_delay_secs: u64,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: Option<u64>,
    pub subscriber_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            allowed_origins: DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect(),
            download_dir: PathBuf::from("./downloads"),
            environment: "development".to_string(),
            log_level: "info".to_string(),
            log_file: None,
            referer: DEFAULT_REFERER.to_string(),
            queue_delay_secs: 5,
            connect_timeout_secs: 10,
            read_timeout_secs: None,
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
        }
    }
}

impl ServerConfig {
    /// Builds the process configuration from the real environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// Same as [`ServerConfig::load`] with an injectable variable lookup.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup(CONFIG_PATH_VAR).filter(|p| !p.trim().is_empty()) {
            Some(path) => Self::from_file(Path::new(path.trim()))?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&text).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    /// Overlays the environment variables that are set and non-blank.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(raw) = var("PORT") {
            self.port = parse_var("PORT", &raw)?;
        }
        if let Some(raw) = var("BIND_ADDR") {
            self.bind_addr = parse_var("BIND_ADDR", &raw)?;
        }
        if let Some(raw) = var("ALLOWED_ORIGINS") {
            self.allowed_origins = raw
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(ToOwned::to_owned)
                .collect();
        }
        if let Some(raw) = var("DOWNLOAD_DIR") {
            self.download_dir = PathBuf::from(raw);
        }
        if let Some(raw) = var("APP_ENV").or_else(|| var("NODE_ENV")) {
            self.environment = raw;
        }
        if let Some(raw) = var("LOG_LEVEL") {
            self.log_level = raw;
        }
        if let Some(raw) = var("LOG_FILE") {
            self.log_file = Some(PathBuf::from(raw));
        }
        if let Some(raw) = var("GRABBER_REFERER") {
            self.referer = raw;
        }
        if let Some(raw) = var("QUEUE_DELAY_SECS") {
            self.queue_delay_secs = parse_var("QUEUE_DELAY_SECS", &raw)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if parse_level(&self.log_level).is_none() {
            return Err(ConfigError::Invalid {
                name: "log_level",
                value: self.log_level.clone(),
            });
        }
        if self.subscriber_buffer == 0 {
            return Err(ConfigError::Invalid {
                name: "subscriber_buffer",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    pub fn level_filter(&self) -> LevelFilter {
        parse_level(&self.log_level).unwrap_or(LevelFilter::Info)
    }

    pub fn queue_delay(&self) -> Duration {
        Duration::from_secs(self.queue_delay_secs)
    }

    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            http: HttpSettings {
                connect_timeout: Duration::from_secs(self.connect_timeout_secs),
                read_timeout: self.read_timeout_secs.map(Duration::from_secs),
                referer: self.referer.clone(),
                ..HttpSettings::default()
            },
            output_dir: self.download_dir.clone(),
            subscriber_buffer: self.subscriber_buffer,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Invalid {
        name,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_the_documented_values() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.environment, "development");
        assert_eq!(config.queue_delay(), Duration::from_secs(5));
        assert!(config.is_origin_allowed("http://localhost:3000"));
        assert!(config.is_origin_allowed("https://fitgirl-downloader.vercel.app"));
        assert!(!config.is_origin_allowed("https://evil.example"));
    }

    #[test]
    fn env_overrides_defaults() {
        let mut config = ServerConfig::default();
        config
            .apply_env(env(&[
                ("PORT", "8080"),
                ("ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
                ("NODE_ENV", "production"),
                ("DOWNLOAD_DIR", "/tmp/dl"),
                ("QUEUE_DELAY_SECS", "0"),
            ]))
            .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.allowed_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert_eq!(config.environment, "production");
        assert_eq!(config.download_dir, PathBuf::from("/tmp/dl"));
        assert_eq!(config.queue_delay(), Duration::ZERO);
    }

    #[test]
    fn app_env_wins_over_node_env() {
        let mut config = ServerConfig::default();
        config
            .apply_env(env(&[("APP_ENV", "staging"), ("NODE_ENV", "production")]))
            .unwrap();
        assert_eq!(config.environment, "staging");
    }

    #[test]
    fn bad_port_names_the_variable() {
        let mut config = ServerConfig::default();
        let err = config.apply_env(env(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let err = ServerConfig::load_with(env(&[("LOG_LEVEL", "chatty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "log_level", .. }));
    }

    #[test]
    fn ron_file_is_layered_under_env() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("grabber.ron");
        fs::write(&path, "(port: 4000, environment: \"test\", queue_delay_secs: 1)").unwrap();
        let path_str = path.to_string_lossy().into_owned();

        let config = ServerConfig::load_with(env(&[
            (CONFIG_PATH_VAR, path_str.as_str()),
            ("PORT", "4001"),
        ]))
        .unwrap();

        assert_eq!(config.port, 4001);
        assert_eq!(config.environment, "test");
        assert_eq!(config.queue_delay_secs, 1);
        assert_eq!(config.connect_timeout_secs, 10);
    }

    #[test]
    fn engine_config_carries_http_settings() {
        let config = ServerConfig {
            read_timeout_secs: Some(30),
            referer: "https://ref.example/".to_string(),
            ..ServerConfig::default()
        };
        let engine = config.engine_config();
        assert_eq!(engine.http.read_timeout, Some(Duration::from_secs(30)));
        assert_eq!(engine.http.referer, "https://ref.example/");
        assert_eq!(engine.output_dir, PathBuf::from("./downloads"));
    }
}
