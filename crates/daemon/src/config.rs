//! Daemon configuration
//!
//! Sources, later ones win:
//! 1. built-in defaults
//! 2. `discscan.toml` in the platform config directory
//! 3. `./discscan.toml`
//! 4. `DISCSCAN_*` environment variables (e.g. `DISCSCAN_RPC_PORT=9700`)

use anyhow::{bail, Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use discscan_api_rpc::server::{DEFAULT_RPC_HOST, DEFAULT_RPC_PORT};
use discscan_core::application::constants::*;
use discscan_core::application::{Backoff, SessionSettings};
use discscan_infra_system::WatchMode;

const ENV_PREFIX: &str = "DISCSCAN";
const CONFIG_FILE_NAME: &str = "discscan";

/// Installation directory name next to the daemon executable
const DEFAULT_SCANNER_DIR_NAME: &str = "ZZZ-Scanner-Tesseract";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Scanner installation directory; `~` is expanded
    pub scanner_dir: Option<String>,
    pub rpc_host: String,
    pub rpc_port: u16,
    pub log_format: LogFormat,
    pub log_file: Option<String>,
    /// Open the file browser on the scan artifact after a successful scan
    pub reveal_artifact: bool,
    pub watch_mode: WatchMode,
    pub poll_interval_ms: u64,
    pub readiness_attempts: u32,
    pub readiness_base_delay_ms: u64,
    pub readiness_max_delay_ms: u64,
    pub read_retry_attempts: u32,
    pub read_retry_base_delay_ms: u64,
    pub exit_grace_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            scanner_dir: None,
            rpc_host: DEFAULT_RPC_HOST.to_string(),
            rpc_port: DEFAULT_RPC_PORT,
            log_format: LogFormat::Pretty,
            log_file: None,
            reveal_artifact: true,
            watch_mode: WatchMode::Auto,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            readiness_attempts: DEFAULT_READINESS_ATTEMPTS,
            readiness_base_delay_ms: DEFAULT_READINESS_BASE_DELAY.as_millis() as u64,
            readiness_max_delay_ms: DEFAULT_READINESS_MAX_DELAY.as_millis() as u64,
            read_retry_attempts: DEFAULT_READ_RETRY_ATTEMPTS,
            read_retry_base_delay_ms: DEFAULT_READ_RETRY_BASE_DELAY.as_millis() as u64,
            exit_grace_ms: DEFAULT_EXIT_GRACE.as_millis() as u64,
        }
    }
}

fn config_files() -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Some(dirs) = ProjectDirs::from("", "", "discscan") {
        files.push(dirs.config_dir().join(format!("{CONFIG_FILE_NAME}.toml")));
    }
    files.push(PathBuf::from(format!("{CONFIG_FILE_NAME}.toml")));
    files
}

impl DaemonConfig {
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder();
        for path in config_files() {
            builder = builder.add_source(File::from(path).required(false));
        }
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        Self::from_builder(builder)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config: DaemonConfig = builder
            .build()
            .context("Failed to read configuration sources")?
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.rpc_host.trim().is_empty() {
            bail!("rpc_host must not be empty");
        }
        if self.readiness_attempts == 0 {
            bail!("readiness_attempts must be at least 1");
        }
        if self.read_retry_attempts == 0 {
            bail!("read_retry_attempts must be at least 1");
        }
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be positive");
        }
        if self.readiness_base_delay_ms > self.readiness_max_delay_ms {
            bail!(
                "readiness_base_delay_ms ({}) exceeds readiness_max_delay_ms ({})",
                self.readiness_base_delay_ms,
                self.readiness_max_delay_ms
            );
        }
        Ok(())
    }

    /// Scanner installation directory
    ///
    /// Defaults to `ZZZ-Scanner-Tesseract` next to the daemon executable.
    pub fn resolve_scanner_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.scanner_dir {
            return Ok(PathBuf::from(shellexpand::tilde(dir).into_owned()));
        }
        let exe = std::env::current_exe().context("Cannot locate daemon executable")?;
        let base = exe
            .parent()
            .context("Daemon executable has no parent directory")?;
        Ok(base.join(DEFAULT_SCANNER_DIR_NAME))
    }

    pub fn log_file_path(&self) -> Option<PathBuf> {
        self.log_file
            .as_deref()
            .map(|path| PathBuf::from(shellexpand::tilde(path).into_owned()))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            readiness: Backoff::new(
                self.readiness_attempts,
                Duration::from_millis(self.readiness_base_delay_ms),
                Duration::from_millis(self.readiness_max_delay_ms),
            ),
            read_retry: Backoff::new(
                self.read_retry_attempts,
                Duration::from_millis(self.read_retry_base_delay_ms),
                DEFAULT_READ_RETRY_MAX_DELAY,
            ),
            exit_grace: Duration::from_millis(self.exit_grace_ms),
            fallback_poll: self.poll_interval(),
        }
    }
}
