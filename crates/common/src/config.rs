//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Backend API configuration.
    pub api: ApiConfig,
    /// Voting and staff-curation rules.
    #[serde(default)]
    pub voting: VotingConfig,
}

/// Backend API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the canteen backend, e.g. `https://canteen.example.com/api`.
    pub base_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

/// Voting and staff-curation rules.
///
/// These mirror server-enforced constraints; the values here are used for
/// client-side pre-checks only, the server remains authoritative.
#[derive(Debug, Clone, Deserialize)]
pub struct VotingConfig {
    /// Minimum elapsed seconds between successive wish reassignments.
    #[serde(default = "default_wish_cooldown_secs")]
    pub wish_cooldown_secs: u64,
    /// Minimum number of distinct dishes in a vote poll.
    #[serde(default = "default_min_poll_dishes")]
    pub min_poll_dishes: usize,
    /// Local hour (0-23) on the day before the meal date at which the staff
    /// submission window closes.
    #[serde(default = "default_submission_deadline_hour")]
    pub submission_deadline_hour: u32,
    /// Refresh interval for the staff live-tally view, in seconds.
    #[serde(default = "default_tally_refresh_secs")]
    pub tally_refresh_secs: u64,
    /// Floor applied to the maximum vote count when computing proportional
    /// chart percentages, preventing division artifacts at all-zero counts.
    #[serde(default = "default_chart_floor")]
    pub chart_floor: i64,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            wish_cooldown_secs: default_wish_cooldown_secs(),
            min_poll_dishes: default_min_poll_dishes(),
            submission_deadline_hour: default_submission_deadline_hour(),
            tally_refresh_secs: default_tally_refresh_secs(),
            chart_floor: default_chart_floor(),
        }
    }
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_connect_timeout_secs() -> u64 {
    10
}

const fn default_wish_cooldown_secs() -> u64 {
    3600
}

const fn default_min_poll_dishes() -> usize {
    3
}

const fn default_submission_deadline_hour() -> u32 {
    6
}

const fn default_tally_refresh_secs() -> u64 {
    5
}

const fn default_chart_floor() -> i64 {
    100
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `CANTEEN_ENV`)
    /// 3. Environment variables with `CANTEEN_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("CANTEEN_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("CANTEEN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("CANTEEN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
