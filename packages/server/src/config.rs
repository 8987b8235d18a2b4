//! Environment-driven application configuration.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised while loading configuration at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Shared secret expected in the `api-key` request header
    pub service_api_key: String,

    /// OpenAI API key for the analyst
    pub openai_api_key: String,

    /// Chat model used for every analyst call
    pub model: String,

    /// Listen address, e.g. `0.0.0.0:5000`
    pub bind_addr: String,

    /// Ceiling on pages selected for any single job
    pub max_pages_per_job: usize,

    /// Run the fallback crawler when discovery found fewer pages than this
    pub min_before_fallback: usize,

    /// Page budget handed to the fallback crawler
    pub fallback_page_budget: usize,

    /// Jobs allowed to run concurrently; the rest queue
    pub max_concurrent_jobs: usize,

    /// Price per one million prompt tokens, USD
    pub input_price_per_million: Decimal,

    /// Price per one million completion tokens, USD
    pub output_price_per_million: Decimal,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_api_key: String::new(),
            openai_api_key: String::new(),
            model: "gpt-4.1-nano-2025-04-14".to_string(),
            bind_addr: "0.0.0.0:5000".to_string(),
            max_pages_per_job: 15,
            min_before_fallback: 20,
            fallback_page_budget: 30,
            max_concurrent_jobs: 4,
            // $0.40 / $1.20 per million tokens
            input_price_per_million: Decimal::new(40, 2),
            output_price_per_million: Decimal::new(120, 2),
        }
    }
}

impl AppConfig {
    /// Load configuration from the environment.
    ///
    /// `SERVICE_API_KEY` and `OPENAI_API_KEY` are required; everything else
    /// has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            service_api_key: require("SERVICE_API_KEY")?,
            openai_api_key: require("OPENAI_API_KEY")?,
            model: optional("OPENAI_MODEL").unwrap_or(defaults.model),
            bind_addr: optional("BIND_ADDR").unwrap_or(defaults.bind_addr),
            max_pages_per_job: parsed("MAX_PAGES_PER_JOB", defaults.max_pages_per_job)?,
            min_before_fallback: parsed("MIN_BEFORE_FALLBACK", defaults.min_before_fallback)?,
            fallback_page_budget: parsed("FALLBACK_PAGE_BUDGET", defaults.fallback_page_budget)?,
            max_concurrent_jobs: parsed("MAX_CONCURRENT_JOBS", defaults.max_concurrent_jobs)?,
            input_price_per_million: parsed(
                "PRICE_INPUT_PER_MILLION",
                defaults.input_price_per_million,
            )?,
            output_price_per_million: parsed(
                "PRICE_OUTPUT_PER_MILLION",
                defaults.output_price_per_million,
            )?,
        })
    }
}

fn require(var: &'static str) -> Result<String, ConfigError> {
    optional(var).ok_or(ConfigError::MissingVar(var))
}

fn optional(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(var) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.max_pages_per_job, 15);
        assert_eq!(config.min_before_fallback, 20);
        assert_eq!(config.input_price_per_million, Decimal::new(40, 2));
        assert_eq!(config.output_price_per_million, Decimal::new(120, 2));
    }
}
