use clap::Parser;

use crate::types::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "ring-history",
    version,
    about = "Download overnight Ring doorbell recordings, walking backwards through history"
)]
pub struct Cli {
    /// Events to inspect per doorbell
    #[arg(long, default_value_t = 3000, value_parser = clap::value_parser!(u32).range(1..))]
    pub limit: u32,

    /// Continue from the stored checkpoint, fetching older events
    #[arg(long)]
    pub resume: bool,

    /// Clear the stored checkpoint before running
    #[arg(long)]
    pub reset_resume: bool,

    /// Checkpoint file
    #[arg(long, default_value = "./ring_history_state.json")]
    pub state_file: String,

    /// Directory recordings are saved into
    #[arg(long, default_value = "./ring_videos/")]
    pub download_dir: String,

    /// Ring token cache
    #[arg(long, env = "RING_TOKEN_CACHE", default_value = "~/.ring_token.cache")]
    pub token_cache: String,

    /// IANA time zone used for the window and filenames, or "local"
    #[arg(long, default_value = "Europe/London")]
    pub timezone: String,

    /// Start of the nightly window (HH:MM, quarter hours)
    #[arg(long, default_value = "00:00")]
    pub window_start: String,

    /// End of the nightly window, exclusive (HH:MM, quarter hours)
    #[arg(long, default_value = "05:30")]
    pub window_end: String,

    /// Leave recordings that are already on disk alone
    #[arg(long)]
    pub skip_existing: bool,

    /// Only authenticate (create/refresh the token cache)
    #[arg(long)]
    pub auth_only: bool,

    /// Retries for rate-limited or failed requests
    #[arg(long, default_value_t = 2)]
    pub max_retries: u32,

    /// Base delay between retries, in seconds
    #[arg(long, default_value_t = 5)]
    pub retry_delay: u64,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}
