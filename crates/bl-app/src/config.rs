use std::env;
use std::str::FromStr;
use std::time::Duration;

use bl_core::pricing::{DEFAULT_PLATFORM_FEE_BPS, DEFAULT_SHIPPING_FEE, FeeSchedule};
use reqwest::Url;
use thiserror::Error;

const DEFAULT_API_URL: &str = "http://localhost:5000/api";
const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: Url,
    pub api_token: Option<String>,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
    pub fees: FeeSchedule,
}

impl ClientConfig {
    /// Environment variables, with an optional `.env` file filling the gaps
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|var| env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = match lookup("BL_API_URL") {
            Some(value) => parse_api_url(&value)?,
            None => parse_api_url(DEFAULT_API_URL)?,
        };

        let poll_interval_ms = parse_or(&lookup, "BL_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?;
        if poll_interval_ms == 0 {
            return Err(invalid("BL_POLL_INTERVAL_MS", "greater than zero", "0"));
        }

        let shipping_fee = parse_or(&lookup, "BL_SHIPPING_FEE", DEFAULT_SHIPPING_FEE)?;
        if shipping_fee == 0 {
            return Err(invalid("BL_SHIPPING_FEE", "greater than zero", "0"));
        }
        let platform_fee_bps =
            parse_or(&lookup, "BL_PLATFORM_FEE_BPS", DEFAULT_PLATFORM_FEE_BPS)?;

        Ok(Self {
            api_url,
            api_token: lookup("BL_API_TOKEN").filter(|token| !token.is_empty()),
            poll_interval: Duration::from_millis(poll_interval_ms),
            http_timeout: Duration::from_secs(parse_or(
                &lookup,
                "BL_HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
            fees: FeeSchedule {
                platform_fee_bps,
                shipping_fee,
            },
        })
    }
}

pub fn parse_api_url(value: &str) -> Result<Url, ConfigError> {
    match Url::parse(value) {
        Ok(url) if !url.cannot_be_a_base() && matches!(url.scheme(), "http" | "https") => Ok(url),
        _ => Err(invalid("BL_API_URL", "an http(s) URL", value)),
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| invalid(var, "a non-negative integer", &value)),
        None => Ok(default),
    }
}

fn invalid(var: &'static str, expected: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        expected,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| vars.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_url.as_str(), "http://localhost:5000/api");
        assert_eq!(config.api_token, None);
        assert_eq!(config.poll_interval, Duration::from_millis(2000));
        assert_eq!(config.fees, FeeSchedule::default());
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("BL_API_URL", "https://api.buyerslegion.in/api"),
            ("BL_API_TOKEN", "secret"),
            ("BL_POLL_INTERVAL_MS", "500"),
            ("BL_SHIPPING_FEE", "99"),
        ]))
        .unwrap();
        assert_eq!(config.api_url.host_str(), Some("api.buyerslegion.in"));
        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.fees.shipping_fee, 99);
    }

    #[test]
    fn test_rejects_zero_shipping_fee() {
        let err = ClientConfig::from_lookup(lookup(&[("BL_SHIPPING_FEE", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "BL_SHIPPING_FEE", .. }));
    }

    #[test]
    fn test_rejects_garbage() {
        let err =
            ClientConfig::from_lookup(lookup(&[("BL_POLL_INTERVAL_MS", "soon")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "BL_POLL_INTERVAL_MS must be a non-negative integer, got \"soon\""
        );

        let mailto = lookup(&[("BL_API_URL", "mailto:ops@example.com")]);
        assert!(ClientConfig::from_lookup(mailto).is_err());
    }
}
