use crate::Result;
use camino::{Utf8Path, Utf8PathBuf};
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

/// Requests per hour granted to an authenticated GitHub token
const HOURLY_REQUEST_QUOTA: u64 = 5000;

/// Requests spent by the cheapest possible crawl: the repository and one contributor page
const REQUESTS_PER_CRAWL: u64 = 2;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Milliseconds between a stored crawl and the recompute it triggers
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    /// Users must score strictly more than this to be ranked
    #[serde(default = "default_min_point_threshold")]
    pub min_point_threshold: f64,

    /// Capacity of the recently crawled buffer
    #[serde(default = "default_max_recently_crawled")]
    pub max_recently_crawled: usize,

    /// Milliseconds between crawl ticks
    #[serde(default = "default_crawl_interval_ms")]
    pub crawl_interval_ms: u64,

    /// Minutes before a repository may be crawled again on request
    #[serde(default = "default_recrawl_cooldown_minutes")]
    pub recrawl_cooldown_minutes: u64,

    /// Number of users on the home page
    #[serde(default = "default_leaderboard_size")]
    pub leaderboard_size: usize,

    /// Ranks shown on either side of a looked-up user
    #[serde(default = "default_rank_window_radius")]
    pub rank_window_radius: usize,

    /// Base URL of the GitHub REST API
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,

    /// Seconds before an API request is abandoned
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Most pages of contributors fetched per repository
    #[serde(default = "default_max_contributor_pages")]
    pub max_contributor_pages: u32,
}

const fn default_refresh_interval_ms() -> u64 {
    2000
}

const fn default_min_point_threshold() -> f64 {
    10.0
}

const fn default_max_recently_crawled() -> usize {
    20
}

const fn default_crawl_interval_ms() -> u64 {
    3000
}

const fn default_recrawl_cooldown_minutes() -> u64 {
    60
}

const fn default_leaderboard_size() -> usize {
    100
}

const fn default_rank_window_radius() -> usize {
    10
}

fn default_api_endpoint() -> String {
    "https://api.github.com".to_string()
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_max_contributor_pages() -> u32 {
    10
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// Without an explicit path, the first of `contrib-rank.{toml,yml,yaml,json}` found in
    /// `base_dir` is used.
    pub fn load(base_dir: &Utf8Path, config_path: Option<&Utf8PathBuf>) -> Result<(Self, Vec<String>)> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading contrib-rank configuration from {path}"))?;
            (path.clone(), text)
        } else {
            let candidates = [
                base_dir.join("contrib-rank.toml"),
                base_dir.join("contrib-rank.yml"),
                base_dir.join("contrib-rank.yaml"),
                base_dir.join("contrib-rank.json"),
            ];

            let mut found = None;
            for path in &candidates {
                match fs::read_to_string(path) {
                    Ok(text) => {
                        found = Some((path.clone(), text));
                        break;
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e).into_app_err_with(|| format!("reading contrib-rank configuration from {path}")),
                }
            }

            let Some(result) = found else {
                return Ok((Self::default(), Vec::new()));
            };
            result
        };

        let extension = final_path.extension().unwrap_or_default();
        let config: Self = match extension {
            "toml" => toml::from_str(&text).into_app_err_with(|| format!("parsing TOML configuration from {final_path}"))?,
            "yml" | "yaml" => serde_yaml::from_str(&text).into_app_err_with(|| format!("parsing YAML configuration from {final_path}"))?,
            "json" => serde_json::from_str(&text).into_app_err_with(|| format!("parsing JSON configuration from {final_path}"))?,
            _ => return Err(app_err!("unsupported configuration file extension: {extension}")),
        };

        config.check()?;

        let mut warnings = Vec::new();
        config.validate(&mut warnings);
        Ok((config, warnings))
    }

    /// Save configuration to a file
    pub fn save(&self, output_path: &Utf8Path) -> Result<()> {
        let extension = output_path.extension().unwrap_or_default();
        let text = match extension {
            "toml" => toml::to_string_pretty(self)
                .into_app_err_with(|| format!("serializing configuration to TOML for saving to {output_path}"))?,
            "yml" | "yaml" => serde_yaml::to_string(self)
                .into_app_err_with(|| format!("serializing configuration to YAML for saving to {output_path}"))?,
            "json" => serde_json::to_string_pretty(self)
                .into_app_err_with(|| format!("serializing configuration to JSON for saving to {output_path}"))?,
            _ => return Err(app_err!("unsupported configuration file extension: {extension}")),
        };

        fs::write(output_path, text).into_app_err_with(|| format!("writing configuration to {output_path}"))?;
        Ok(())
    }

    /// Save the default configuration, keeping its comments when writing TOML
    pub fn save_default_with_comments(output_path: &Utf8Path) -> Result<()> {
        if output_path.extension() == Some("toml") {
            fs::write(output_path, DEFAULT_CONFIG_TOML).into_app_err_with(|| format!("writing configuration to {output_path}"))?;
            return Ok(());
        }

        Self::default().save(output_path)
    }

    /// Reject settings the server cannot run with
    pub fn check(&self) -> Result<()> {
        if self.crawl_interval_ms == 0 {
            return Err(app_err!("crawl_interval_ms must be greater than 0"));
        }

        if self.request_timeout_secs == 0 {
            return Err(app_err!("request_timeout_secs must be greater than 0"));
        }

        if self.max_contributor_pages == 0 {
            return Err(app_err!("max_contributor_pages must be at least 1"));
        }

        if !self.min_point_threshold.is_finite() || self.min_point_threshold < 0.0 {
            return Err(app_err!(
                "min_point_threshold must be a non-negative number, got {}",
                self.min_point_threshold
            ));
        }

        if self.try_recrawl_cooldown().is_none() {
            return Err(app_err!(
                "recrawl_cooldown_minutes of {} is too large to represent",
                self.recrawl_cooldown_minutes
            ));
        }

        match url::Url::parse(&self.api_endpoint) {
            Ok(url) if !matches!(url.scheme(), "http" | "https") => {
                Err(app_err!("api_endpoint '{}' must use http or https", self.api_endpoint))
            }
            Ok(_) => Ok(()),
            Err(e) => Err(app_err!("api_endpoint '{}' is not a valid URL: {e}", self.api_endpoint)),
        }
    }

    /// Collect advisories about settings that work but are probably not what was intended
    pub fn validate(&self, warnings: &mut Vec<String>) {
        if self.refresh_interval_ms == 0 {
            warnings.push("refresh_interval_ms is 0; bursts of crawls will not be coalesced into one recompute".to_string());
        }

        if let Some(crawls_per_hour) = 3_600_000_u64.checked_div(self.crawl_interval_ms)
            && crawls_per_hour * REQUESTS_PER_CRAWL > HOURLY_REQUEST_QUOTA
        {
            warnings.push(format!(
                "crawl_interval_ms of {} allows {crawls_per_hour} crawls per hour, which exceeds the GitHub quota of {HOURLY_REQUEST_QUOTA} requests per hour",
                self.crawl_interval_ms
            ));
        }

        if self.leaderboard_size == 0 {
            warnings.push("leaderboard_size is 0; the home page will show no users".to_string());
        }

        if self.try_recrawl_cooldown().is_none() {
            warnings.push(format!(
                "recrawl_cooldown_minutes of {} is out of range; requested recrawls of stored repositories will always be refused",
                self.recrawl_cooldown_minutes
            ));
        }
    }

    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    #[must_use]
    pub const fn crawl_interval(&self) -> Duration {
        Duration::from_millis(self.crawl_interval_ms)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The recrawl cooldown, saturated at the largest representable span
    #[must_use]
    pub fn recrawl_cooldown(&self) -> chrono::TimeDelta {
        self.try_recrawl_cooldown().unwrap_or(chrono::TimeDelta::MAX)
    }

    fn try_recrawl_cooldown(&self) -> Option<chrono::TimeDelta> {
        i64::try_from(self.recrawl_cooldown_minutes)
            .ok()
            .and_then(chrono::TimeDelta::try_minutes)
    }
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("default_config.toml should be valid TOML that deserializes to Config")
    }
}
