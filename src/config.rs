use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Where the wiki content comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Gzipped tarball fetched over HTTP
    #[default]
    Archive,
    /// Directory on the local filesystem
    Local,
}

/// Content source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default = "default_repo")]
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Full tarball URL; overrides owner/repo/branch when set.
    #[serde(default)]
    pub archive_url: Option<String>,
    /// Root directory for `kind = "local"`.
    #[serde(default)]
    pub local_path: Option<PathBuf>,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            owner: default_owner(),
            repo: default_repo(),
            branch: default_branch(),
            archive_url: None,
            local_path: None,
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: default_http_host(),
            port: default_http_port(),
            refresh_path: default_refresh_path(),
        }
    }
}

/// Filesystem watcher configuration (local sources only)
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// Routes the server registers on its own; the refresh hook may not shadow them
const RESERVED_PATHS: &[&str] = &["/", "/_health"];

fn default_owner() -> String {
    "umurgdk".to_string()
}

fn default_repo() -> String {
    "wiki".to_string()
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    60
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_refresh_path() -> String {
    "/_githook".to_string()
}

fn default_debounce_ms() -> u64 {
    500
}

impl SourceConfig {
    /// Tarball URL for the archive source
    pub fn tarball_url(&self) -> String {
        match &self.archive_url {
            Some(url) => url.clone(),
            None => format!(
                "https://api.github.com/repos/{}/{}/tarball/{}",
                self.owner, self.repo, self.branch
            ),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in FIKI_CONFIG environment variable
    /// 2. ./config.toml in current directory (built-in defaults if absent)
    pub fn load() -> Result<Self> {
        let _ = dotenv::dotenv();

        let config = match std::env::var("FIKI_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => {
                let path = PathBuf::from("config.toml");
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    log::debug!("No config.toml found, using built-in defaults");
                    Config::default()
                }
            }
        };

        Ok(config)
    }

    /// Parse a config file without validating it
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Point the source at a local directory (CLI `--local`)
    pub fn use_local(&mut self, root: PathBuf) {
        self.source.kind = SourceKind::Local;
        self.source.local_path = Some(root);
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        match self.source.kind {
            SourceKind::Local => {
                let root = self.source.local_path.as_ref().with_context(|| {
                    "source.local_path must be set when source.kind = \"local\"".to_string()
                })?;

                if !root.exists() {
                    anyhow::bail!("local_path does not exist: {}", root.display());
                }

                if !root.is_dir() {
                    anyhow::bail!(
                        "local_path must be a directory, not a file: {}",
                        root.display()
                    );
                }
            }
            SourceKind::Archive => {
                let tarball = self.source.tarball_url();
                url::Url::parse(&tarball)
                    .with_context(|| format!("Invalid archive URL: {}", tarball))?;

                if self.source.fetch_timeout_secs == 0 {
                    anyhow::bail!("source.fetch_timeout_secs must be greater than 0");
                }
            }
        }

        if self.http_server.port == 0 {
            anyhow::bail!("http_server.port must be greater than 0");
        }

        let refresh_path = self.http_server.refresh_path.as_str();
        if !refresh_path.starts_with('/') {
            anyhow::bail!("http_server.refresh_path must start with '/': {}", refresh_path);
        }

        if RESERVED_PATHS.contains(&refresh_path) {
            anyhow::bail!(
                "http_server.refresh_path collides with a built-in route: {}",
                refresh_path
            );
        }

        if refresh_path.contains(|c: char| c == ':' || c == '*') {
            anyhow::bail!(
                "http_server.refresh_path must be a literal path, not a pattern: {}",
                refresh_path
            );
        }

        Ok(())
    }

    /// Socket address the server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.http_server.host, self.http_server.port)
    }
}
