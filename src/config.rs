use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SEARCH_BASE_URL: &str = "https://ya.ru";
pub const DEFAULT_COMPLETION_BASE_URL: &str = "https://llm.api.cloud.yandex.net";
pub const DEFAULT_MODEL: &str = "yandexgpt";

/// Runtime configuration, built once at startup and handed to the clients
/// and the admission controller.
#[derive(Debug, Clone)]
pub struct Config {
    pub search_api_key: String,
    pub completion_api_key: String,
    pub folder_id: String,
    pub search_base_url: String,
    pub completion_base_url: String,
    pub model: String,
    pub max_concurrent_requests: usize,
    /// Admissions per second each slot is paced to. `0` disables pacing.
    pub requests_per_second: f64,
    /// `None` lets waiters queue without bound.
    pub max_queued_requests: Option<usize>,
    pub upstream_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok(); // Load .env file if present

        let max_queued: usize = get_env_parsed("MAX_QUEUED_REQUESTS", 64)?;

        let config = Config {
            search_api_key: get_env("api_token_search")?,
            completion_api_key: get_env("api_token_gpt")?,
            folder_id: get_env("folder_id")?,
            search_base_url: get_env_or_default("SEARCH_BASE_URL", DEFAULT_SEARCH_BASE_URL),
            completion_base_url: get_env_or_default(
                "COMPLETION_BASE_URL",
                DEFAULT_COMPLETION_BASE_URL,
            ),
            model: get_env_or_default("GPT_MODEL", DEFAULT_MODEL),
            max_concurrent_requests: get_env_parsed("MAX_CONCURRENT_REQUESTS", 4)?,
            requests_per_second: get_env_parsed("REQUESTS_PER_SECOND", 1.7)?,
            max_queued_requests: (max_queued > 0).then_some(max_queued),
            upstream_timeout: Duration::from_secs(get_env_parsed("UPSTREAM_TIMEOUT_SECS", 60)?),
        };
        config.pacing_delay()?;
        Ok(config)
    }

    /// Delay each admitted request sleeps inside its slot before running.
    pub fn pacing_delay(&self) -> Result<Duration> {
        if self.requests_per_second > 0.0 {
            Duration::try_from_secs_f64(1.0 / self.requests_per_second).with_context(|| {
                format!(
                    "REQUESTS_PER_SECOND={} gives an unrepresentable pacing delay",
                    self.requests_per_second
                )
            })
        } else {
            Ok(Duration::ZERO)
        }
    }
}

fn get_env(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("Missing required environment variable: {key}"))
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_env_parsed<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {key}: {raw:?}")),
        Err(_) => Ok(default),
    }
}

#[test]
fn test_pacing_delay() {
    let mut config = Config {
        search_api_key: "s".into(),
        completion_api_key: "c".into(),
        folder_id: "f".into(),
        search_base_url: DEFAULT_SEARCH_BASE_URL.into(),
        completion_base_url: DEFAULT_COMPLETION_BASE_URL.into(),
        model: DEFAULT_MODEL.into(),
        max_concurrent_requests: 4,
        requests_per_second: 2.0,
        max_queued_requests: None,
        upstream_timeout: Duration::from_secs(1),
    };
    assert_eq!(config.pacing_delay().unwrap(), Duration::from_millis(500));

    config.requests_per_second = 0.0;
    assert_eq!(config.pacing_delay().unwrap(), Duration::ZERO);

    config.requests_per_second = -1.0;
    assert_eq!(config.pacing_delay().unwrap(), Duration::ZERO);

    config.requests_per_second = 1e-20;
    let err = config.pacing_delay().unwrap_err();
    assert!(err.to_string().contains("REQUESTS_PER_SECOND"));
}
