use crate::error::{GridError, Result};
use crate::formulas::FormulaConfig;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_QUOTE_URL: &str = "https://finance.yahoo.com/quote";

/// Runtime settings, read from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Directory holding the presentation bundle.
    pub static_dir: PathBuf,
    /// Base URL of the scraped quote pages.
    pub quote_url: String,
    /// Where the terminal client finds the server.
    pub endpoint: String,
    /// Local key-value snapshot file.
    pub state_path: PathBuf,
    pub formulas: FormulaConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            static_dir: PathBuf::from("dist"),
            quote_url: DEFAULT_QUOTE_URL.to_string(),
            endpoint: format!("http://127.0.0.1:{}", DEFAULT_PORT),
            state_path: PathBuf::from("stockgrid-state.json"),
            formulas: FormulaConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any variable lookup, so tests need not touch
    /// the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(port) = lookup("PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|e| GridError::Config(format!("Invalid PORT '{}': {}", port, e)))?;
        }
        if let Some(host) = lookup("HOST") {
            config.host = host;
        }
        if let Some(dir) = lookup("STOCKGRID_STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("STOCKGRID_QUOTE_URL") {
            config.quote_url = url;
        }
        if let Some(endpoint) = lookup("STOCKGRID_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Some(path) = lookup("STOCKGRID_STATE") {
            config.state_path = PathBuf::from(path);
        }

        Ok(config)
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| GridError::Config(format!("Invalid address: {}", e)))
    }
}
