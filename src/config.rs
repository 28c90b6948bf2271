use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::download::DownloadConfig;
use crate::retry::RetryPolicy;
use crate::window::{MinuteOfDay, TimeWindow, WindowError, Zone};

/// Invalid command-line values. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("--{flag}: {source}")]
    Window {
        flag: &'static str,
        source: WindowError,
    },

    #[error("Invalid window: {0}")]
    EmptyWindow(WindowError),
}

/// Application configuration, resolved from the CLI once at startup and
/// passed by reference to whatever needs it.
#[derive(Debug, Clone)]
pub struct Config {
    pub state_file: PathBuf,
    pub download_dir: PathBuf,
    pub token_cache: PathBuf,

    pub zone: Zone,
    pub window: TimeWindow,
    pub retry: RetryPolicy,

    pub limit: u32,

    pub resume: bool,
    pub reset_resume: bool,
    pub skip_existing: bool,
    pub auth_only: bool,
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

fn parse_bound(flag: &'static str, value: &str) -> Result<MinuteOfDay, ConfigError> {
    value
        .parse()
        .map_err(|source| ConfigError::Window { flag, source })
}

impl Config {
    pub fn from_cli(cli: crate::cli::Cli) -> Result<Self, ConfigError> {
        let start = parse_bound("window-start", &cli.window_start)?;
        let end = parse_bound("window-end", &cli.window_end)?;
        let window = TimeWindow::new(start, end).map_err(ConfigError::EmptyWindow)?;

        let base_delay = Duration::from_secs(cli.retry_delay);
        let retry = RetryPolicy {
            max_retries: cli.max_retries,
            base_delay,
            max_delay: RetryPolicy::default().max_delay.max(base_delay),
        };

        Ok(Self {
            state_file: expand_tilde(&cli.state_file),
            download_dir: expand_tilde(&cli.download_dir),
            token_cache: expand_tilde(&cli.token_cache),
            zone: Zone::resolve(&cli.timezone),
            window,
            retry,
            limit: cli.limit,
            resume: cli.resume,
            reset_resume: cli.reset_resume,
            skip_existing: cli.skip_existing,
            auth_only: cli.auth_only,
        })
    }

    pub fn download_config(&self) -> DownloadConfig {
        DownloadConfig {
            directory: self.download_dir.clone(),
            zone: self.zone,
            skip_existing: self.skip_existing,
            retry: self.retry.clone(),
        }
    }
}
