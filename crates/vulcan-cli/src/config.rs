//! Invocation settings resolved from built-in defaults and the environment.

use std::env;
use std::time::Duration;

use url::Url;

use crate::client::{CliError, CliResult};
use crate::global::DEFAULT_SERVER_ADDRESS;
use crate::telemetry::LogFormat;

pub(crate) const ENV_SERVER_ADDRESS: &str = "VULCAN_URL";
pub(crate) const ENV_HTTP_TIMEOUT_SECS: &str = "VULCANCTL_HTTP_TIMEOUT_SECS";
pub(crate) const ENV_LOG_LEVEL: &str = "VULCANCTL_LOG";
pub(crate) const ENV_LOG_FORMAT: &str = "VULCANCTL_LOG_FORMAT";

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DRAIN_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_LOG_LEVEL: &str = "warn";

/// Settings shared by every command of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CliConfig {
    /// Address used when no `-vulcan` option is given.
    pub(crate) server_address: String,
    pub(crate) http_timeout: Duration,
    pub(crate) drain_poll_interval: Duration,
    pub(crate) log_level: String,
    pub(crate) log_format: LogFormat,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            server_address: DEFAULT_SERVER_ADDRESS.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            drain_poll_interval: DEFAULT_DRAIN_POLL_INTERVAL,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: LogFormat::Compact,
        }
    }
}

impl CliConfig {
    pub(crate) fn from_env() -> CliResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Overlay environment values returned by `lookup` onto the defaults.
    /// Blank values are treated as unset.
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CliResult<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(address) = get(ENV_SERVER_ADDRESS) {
            config.server_address = address;
        }
        if let Some(raw) = get(ENV_HTTP_TIMEOUT_SECS) {
            let secs = raw.parse::<u64>().map_err(|err| {
                CliError::validation(format!(
                    "{ENV_HTTP_TIMEOUT_SECS} must be a whole number of seconds, got '{raw}': {err}"
                ))
            })?;
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Some(level) = get(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(raw) = get(ENV_LOG_FORMAT) {
            config.log_format = LogFormat::from_name(&raw).ok_or_else(|| {
                CliError::validation(format!(
                    "{ENV_LOG_FORMAT} must be 'compact' or 'json', got '{raw}'"
                ))
            })?;
        }
        Ok(config)
    }
}

/// Validate a server address before any request is built from it.
pub(crate) fn parse_server_address(raw: &str) -> CliResult<Url> {
    let url = Url::parse(raw).map_err(|err| {
        CliError::MalformedGlobalOption(format!("invalid server address '{raw}': {err}"))
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(CliError::MalformedGlobalOption(format!(
            "server address '{raw}' uses unsupported scheme '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = CliConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.server_address, "http://localhost:8182");
        assert_eq!(config.http_timeout, Duration::from_secs(10));
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = CliConfig::from_lookup(lookup(&[
            (ENV_SERVER_ADDRESS, "http://vulcan:9000"),
            (ENV_HTTP_TIMEOUT_SECS, "3"),
            (ENV_LOG_LEVEL, "debug"),
            (ENV_LOG_FORMAT, "json"),
        ]))
        .expect("config");
        assert_eq!(config.server_address, "http://vulcan:9000");
        assert_eq!(config.http_timeout, Duration::from_secs(3));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = CliConfig::from_lookup(lookup(&[(ENV_HTTP_TIMEOUT_SECS, "soon")]))
            .expect_err("bad timeout");
        assert!(matches!(err, CliError::Validation(_)));
        let err = CliConfig::from_lookup(lookup(&[(ENV_LOG_FORMAT, "xml")]))
            .expect_err("bad format");
        assert!(matches!(err, CliError::Validation(_)));
    }

    #[test]
    fn blank_values_are_ignored() {
        let config =
            CliConfig::from_lookup(lookup(&[(ENV_SERVER_ADDRESS, "  ")])).expect("config");
        assert_eq!(config.server_address, DEFAULT_SERVER_ADDRESS);
    }

    #[test]
    fn server_address_must_be_http_url() {
        assert!(parse_server_address("http://localhost:8182").is_ok());
        assert!(matches!(
            parse_server_address("localhost:8182"),
            Err(CliError::MalformedGlobalOption(_))
        ));
        assert!(matches!(
            parse_server_address("not a url"),
            Err(CliError::MalformedGlobalOption(_))
        ));
    }
}
