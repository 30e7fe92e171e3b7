use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use std::{fs, path::Path};

use serde::Deserialize;
use tracing::level_filters::LevelFilter;

use crate::cli::Args;
use crate::errors::StartupError;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Address to bind the HTTP listener to.
    pub address: String,

    /// HTTP port to listen on.
    pub port: u16,

    /// Log level for tracing (e.g. "info", "debug").
    pub log_level: String,

    /// Content delivered to subscribers when a publish does not carry its own.
    pub payload: String,

    /// Maximum time (seconds) a subscriber is held open.
    ///
    /// If `None`, subscribers wait until the next publish or until they
    /// disconnect, however long that takes.
    pub max_hold_secs: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            payload: "X".to_string(),
            max_hold_secs: None,
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, StartupError> {
        let file = fs::read_to_string(path).map_err(|source| StartupError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;

        serde_json::from_str::<AppConfig>(&file).map_err(|source| StartupError::ConfigParse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Resolve the configuration for a run: an explicit `--config` file must
    /// load, otherwise `config.json` is looked up beside the executable (or one
    /// directory above it) and defaults are used when neither exists. Command
    /// line flags win over file values.
    pub fn resolve(args: &Args) -> Result<Self, StartupError> {
        let mut cfg = match &args.config {
            Some(path) => Self::load_from_file(path)?,
            None => match locate_config_file() {
                Some(path) => Self::load_from_file(&path)?,
                None => Self::default(),
            },
        };
        cfg.apply_args(args);
        Ok(cfg)
    }

    pub fn apply_args(&mut self, args: &Args) {
        if let Some(address) = &args.address {
            self.address = address.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if args.verbose {
            self.log_level = "debug".to_string();
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, StartupError> {
        let ip: IpAddr = self
            .address
            .parse()
            .map_err(|source| StartupError::InvalidAddress {
                addr: self.address.clone(),
                source,
            })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn max_hold(&self) -> Option<Duration> {
        self.max_hold_secs.map(Duration::from_secs)
    }

    pub fn level_filter(&self) -> LevelFilter {
        match self.log_level.to_lowercase().as_str() {
            "trace" => LevelFilter::TRACE,
            "debug" => LevelFilter::DEBUG,
            "info" => LevelFilter::INFO,
            "warn" => LevelFilter::WARN,
            "error" => LevelFilter::ERROR,
            _ => LevelFilter::INFO,
        }
    }
}

fn locate_config_file() -> Option<std::path::PathBuf> {
    let exe_path = std::env::current_exe().ok()?;
    let exe_dir = exe_path.parent()?;

    [exe_dir.join("config.json"), exe_dir.join("..").join("config.json")]
        .into_iter()
        .find(|candidate| candidate.exists())
}
