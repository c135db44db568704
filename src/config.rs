use std::time::Duration;

use once_cell::sync::Lazy;
use url::Url;

// ── Defaults ─────────────────────────────────────────────────────────────────

pub const DEFAULT_USER_AGENT: &str = "Wappalyzer/1 CFNetwork/1492.0.1 Darwin/23.3.0";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

pub static DEFAULT_ENDPOINT: Lazy<Url> =
    Lazy::new(|| Url::parse("https://api.wappalyzer.com/v2/lookup/").unwrap());

const API_KEY_VAR: &str = "WAPPALYZER_API_KEY";
const API_URL_VAR: &str = "WAPPALYZER_API_URL";
const USER_AGENT_VAR: &str = "WAPPALYZER_USER_AGENT";
const TIMEOUT_VAR: &str = "WAPPALYZER_TIMEOUT_SECS";
const BIND_ADDR_VAR: &str = "WAPPALYZER_LOOKUP_ADDR";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

#[derive(Debug, Clone)]
pub struct LookupConfig {
    pub api_key: String,
    pub endpoint: Url,
    pub user_agent: String,
    pub timeout: Duration,
    pub bind_addr: String,
}

impl LookupConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.clone(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable source. Empty values count
    /// as unset.
    pub fn from_vars<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| get(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = var(API_KEY_VAR).ok_or(ConfigError::Missing(API_KEY_VAR))?;
        let mut config = Self::new(api_key);

        if let Some(raw) = var(API_URL_VAR) {
            config.endpoint = Url::parse(&raw).map_err(|e| ConfigError::Invalid {
                var: API_URL_VAR,
                reason: e.to_string(),
            })?;
        }
        if let Some(agent) = var(USER_AGENT_VAR) {
            config.user_agent = agent;
        }
        if let Some(raw) = var(TIMEOUT_VAR) {
            let secs: u64 = raw.parse().map_err(|_| ConfigError::Invalid {
                var: TIMEOUT_VAR,
                reason: format!("expected whole seconds, got {:?}", raw),
            })?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    var: TIMEOUT_VAR,
                    reason: "timeout must be at least one second".to_string(),
                });
            }
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(addr) = var(BIND_ADDR_VAR) {
            config.bind_addr = addr;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn api_key_is_required() {
        let err = LookupConfig::from_vars(vars(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(API_KEY_VAR)));

        let err = LookupConfig::from_vars(vars(&[(API_KEY_VAR, "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn defaults_apply() {
        let config = LookupConfig::from_vars(vars(&[(API_KEY_VAR, "secret")])).unwrap();
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.endpoint.as_str(), "https://api.wappalyzer.com/v2/lookup/");
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
    }

    #[test]
    fn overrides_apply() {
        let config = LookupConfig::from_vars(vars(&[
            (API_KEY_VAR, "secret"),
            (API_URL_VAR, "http://127.0.0.1:9000/v2/lookup/"),
            (USER_AGENT_VAR, "custom/1.0"),
            (TIMEOUT_VAR, "5"),
            (BIND_ADDR_VAR, "127.0.0.1:3000"),
        ]))
        .unwrap();
        assert_eq!(config.endpoint.as_str(), "http://127.0.0.1:9000/v2/lookup/");
        assert_eq!(config.user_agent, "custom/1.0");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.bind_addr, "127.0.0.1:3000");
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let err = LookupConfig::from_vars(vars(&[(API_KEY_VAR, "k"), (TIMEOUT_VAR, "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: TIMEOUT_VAR, .. }));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = LookupConfig::from_vars(vars(&[(API_KEY_VAR, "k"), (TIMEOUT_VAR, "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: TIMEOUT_VAR, .. }));
    }
}
