use std::str::FromStr;
use std::time::Duration;

use daytrader_market_data::provider::massive::DEFAULT_BASE_URL as MASSIVE_BASE_URL;
use daytrader_market_data::provider::DEFAULT_LOCKOUT_SECS;
use daytrader_market_data::BrokerSettings;
use rand::Rng;
use thiserror::Error;

const DEFAULT_SEED_SYMBOLS: &str = "GME,AMC,TSLA,AMD,PLTR,SOFI,NIO,LCID,ATER,BBIG";
const MIN_PROVIDER_TIMEOUT_SECS: u64 = 10;
const MAX_PROVIDER_TIMEOUT_SECS: u64 = 30;
const MAX_CONNECT_ATTEMPTS: u32 = 15;
const MIN_LIVENESS_INTERVAL_SECS: u64 = 1;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },

    #[error("Unknown provider {0:?} in DT_PROVIDER_ORDER")]
    UnknownProvider(String),
}

/// REST tiers that can follow the brokerage in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestProvider {
    SerpApi,
    AlphaVantage,
    Massive,
}

impl FromStr for RestProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', '-'], "").as_str() {
            "serpapi" => Ok(RestProvider::SerpApi),
            "alphavantage" => Ok(RestProvider::AlphaVantage),
            "massive" => Ok(RestProvider::Massive),
            _ => Err(ConfigError::UnknownProvider(s.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` unless `DT_BROKER_HOST` is set
    pub broker: Option<BrokerSettings>,
    pub serpapi_key: Option<String>,
    pub serpapi_monthly_limit: u32,
    pub alphavantage_key: Option<String>,
    pub alphavantage_daily_limit: u32,
    pub massive_key: Option<String>,
    pub massive_per_minute: u32,
    pub massive_base_url: String,
    pub lockout: chrono::Duration,
    pub provider_timeout: Duration,
    pub provider_order: Vec<RestProvider>,
    pub scan_interval: Duration,
    pub seed_symbols: Vec<String>,
    pub log_format: LogFormat,
}

impl Config {
    /// Read the process environment, after loading `.env` when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let broker = match var("DT_BROKER_HOST") {
            Some(host) => {
                let defaults = BrokerSettings::default();
                let client_id = match var("DT_BROKER_CLIENT_ID") {
                    Some(raw) => parse("DT_BROKER_CLIENT_ID", &raw)?,
                    None => rand::thread_rng().gen_range(daytrader_market_data::broker::CLIENT_ID_RANGE),
                };
                Some(BrokerSettings {
                    host,
                    port: parse_or(&var, "DT_BROKER_PORT", defaults.port)?,
                    client_id,
                    max_connect_attempts: parse_or(
                        &var,
                        "DT_BROKER_MAX_CONNECT_ATTEMPTS",
                        defaults.max_connect_attempts,
                    )?
                    .clamp(1, MAX_CONNECT_ATTEMPTS),
                    liveness_interval: Duration::from_secs(
                        parse_or(
                            &var,
                            "DT_LIVENESS_INTERVAL_SECS",
                            defaults.liveness_interval.as_secs(),
                        )?
                        .max(MIN_LIVENESS_INTERVAL_SECS),
                    ),
                    ..defaults
                })
            }
            None => None,
        };

        let provider_order = var("DT_PROVIDER_ORDER")
            .unwrap_or_else(|| "serpapi,alphavantage,massive".to_string())
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(RestProvider::from_str)
            .collect::<Result<Vec<_>, _>>()?;

        let timeout_secs: u64 = parse_or(&var, "DT_PROVIDER_TIMEOUT_SECS", MIN_PROVIDER_TIMEOUT_SECS)?;

        let log_format = match var("DT_LOG_FORMAT") {
            Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(f) if f.eq_ignore_ascii_case("text") => LogFormat::Text,
            None => LogFormat::Text,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "DT_LOG_FORMAT",
                    value: other,
                })
            }
        };

        Ok(Self {
            broker,
            serpapi_key: var("DT_SERPAPI_KEY"),
            serpapi_monthly_limit: parse_or(&var, "DT_SERPAPI_MONTHLY_LIMIT", 250)?,
            alphavantage_key: var("DT_ALPHAVANTAGE_KEY"),
            alphavantage_daily_limit: parse_or(&var, "DT_ALPHAVANTAGE_DAILY_LIMIT", 25)?,
            massive_key: var("DT_MASSIVE_KEY"),
            massive_per_minute: parse_or(&var, "DT_MASSIVE_PER_MINUTE", 5)?,
            massive_base_url: var("DT_MASSIVE_BASE_URL").unwrap_or_else(|| MASSIVE_BASE_URL.to_string()),
            lockout: chrono::Duration::seconds(parse_or(&var, "DT_LOCKOUT_SECS", DEFAULT_LOCKOUT_SECS)?),
            provider_timeout: Duration::from_secs(
                timeout_secs.clamp(MIN_PROVIDER_TIMEOUT_SECS, MAX_PROVIDER_TIMEOUT_SECS),
            ),
            provider_order,
            scan_interval: Duration::from_secs(parse_or(&var, "DT_SCAN_INTERVAL_SECS", 12)?),
            seed_symbols: var("DT_SEED_SYMBOLS")
                .unwrap_or_else(|| DEFAULT_SEED_SYMBOLS.to_string())
                .split(',')
                .map(|s| s.trim().to_ascii_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
            log_format,
        })
    }
}

fn parse<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

fn parse_or<T, V>(var: &V, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    V: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => parse(key, &raw),
        None => Ok(default),
    }
}
