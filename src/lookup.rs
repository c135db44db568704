use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, HOST};
use serde_json::{json, Value};
use url::Url;

use crate::config::{ConfigError, LookupConfig};
use crate::models::{LookupRequest, LookupResult, Targets};

// ── Constants ────────────────────────────────────────────────────────────────

const ICON_BASE_URL: &str = "https://www.wappalyzer.com/images/icons/";
const ICON_KEY: &str = "icon";
const CALLBACK_KEY: &str = "callback_url";
const RESULTS_KEY: &str = "results";
const API_KEY_HEADER: &str = "x-api-key";
const CONNECT_TIMEOUT_SECS: u64 = 5;
const MAX_REDIRECTS: usize = 10;

/// Characters that would split, truncate or re-decode a query value.
const QUERY_VALUE: &AsciiSet = &CONTROLS.add(b' ').add(b'#').add(b'%').add(b'&').add(b'+');

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("Failed to get technologies")]
    Upstream { reason: String },
}

impl LookupError {
    fn upstream(reason: impl Into<String>) -> Self {
        LookupError::Upstream {
            reason: reason.into(),
        }
    }
}

// ── Client ───────────────────────────────────────────────────────────────────

/// Client for the Wappalyzer lookup API.
///
/// Holds one pooled HTTP client. Share it across tasks through an `Arc`.
#[derive(Debug)]
pub struct LookupClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl LookupClient {
    pub fn new(config: &LookupConfig) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();

        let mut api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|e| ConfigError::Client(format!("API key is not a valid header: {}", e)))?;
        api_key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, api_key);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let host = host_header(&config.endpoint)
            .ok_or_else(|| ConfigError::Client("endpoint has no host".to_string()))?;
        headers.insert(
            HOST,
            HeaderValue::from_str(&host).map_err(|e| ConfigError::Client(e.to_string()))?,
        );

        let http = reqwest::ClientBuilder::new()
            .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Looks up the technologies behind `urls`.
    ///
    /// With a callback URL the API answers asynchronously to that address and
    /// the returned tree carries a `callback_url` entry.
    pub async fn analyze(
        &self,
        urls: impl Into<Targets>,
        callback_url: Option<&str>,
    ) -> Result<LookupResult, LookupError> {
        let targets = validate_targets(urls.into())?;
        if let Some(callback) = callback_url {
            validate_callback(callback)?;
        }

        let request_url = build_request_url(&self.endpoint, &targets, callback_url);
        let body = self.fetch(request_url).await?;

        let mut data = parse_response(&body)?;
        rewrite_icons(&mut data);

        Ok(match callback_url {
            Some(callback) => attach_callback(data, callback),
            None => data,
        })
    }

    pub async fn lookup(&self, request: &LookupRequest) -> Result<LookupResult, LookupError> {
        self.analyze(request.urls.clone(), request.callback_url.as_deref())
            .await
    }

    async fn fetch(&self, url: Url) -> Result<String, LookupError> {
        tracing::debug!(url = %url, "requesting technology lookup");

        let response = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                LookupError::upstream(format!("TimeoutError: {}", e))
            } else if e.is_connect() {
                LookupError::upstream(format!("ConnectError: {}", e))
            } else {
                LookupError::upstream(format!("RequestError: {}", e))
            }
        })?;

        tracing::debug!(status = %response.status(), "lookup response received");

        response
            .text()
            .await
            .map_err(|e| LookupError::upstream(e.to_string()))
    }
}

fn host_header(endpoint: &Url) -> Option<String> {
    let host = endpoint.host_str().filter(|h| !h.is_empty())?;
    Some(match endpoint.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

// ── Validation ───────────────────────────────────────────────────────────────

/// True for absolute URLs with a scheme and a non-empty host.
pub fn validate_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| url.host_str().is_some_and(|h| !h.is_empty()))
        .unwrap_or(false)
}

fn validate_targets(targets: Targets) -> Result<Vec<String>, LookupError> {
    let list = targets.into_list();
    if list.is_empty() {
        return Err(invalid_target(""));
    }
    for url in &list {
        if !validate_url(url) {
            return Err(invalid_target(url));
        }
    }
    Ok(list)
}

fn validate_callback(callback_url: &str) -> Result<(), LookupError> {
    if validate_url(callback_url) {
        return Ok(());
    }
    Err(LookupError::InvalidInput(format!(
        "Invalid callback URL {}. Example: https://example.com/callback",
        callback_url
    )))
}

fn invalid_target(value: &str) -> LookupError {
    LookupError::InvalidInput(format!(
        "Invalid URL {}. Example: https://example.com. You can also pass multiple URLs \
         separated by comma. Example: https://example.com,https://example2.com",
        value
    ))
}

// ── Request construction ─────────────────────────────────────────────────────

/// Builds the lookup URL. Target URLs stay readable in the query; only the
/// characters that would split or truncate it are escaped.
pub fn build_request_url(endpoint: &Url, urls: &[String], callback_url: Option<&str>) -> Url {
    let mut query = format!(
        "urls={}&sets=all&icons=true&recursive=true",
        escape_query_value(&urls.join(","))
    );
    if let Some(callback) = callback_url {
        query.push_str(&format!(
            "&callback_url={}&live=true",
            escape_query_value(callback)
        ));
    }

    let mut url = endpoint.clone();
    url.set_query(Some(&query));
    url
}

fn escape_query_value(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

// ── Response handling ────────────────────────────────────────────────────────

/// Parses the upstream body. Only objects and arrays count as a result.
pub fn parse_response(body: &str) -> Result<Value, LookupError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| LookupError::upstream(format!("invalid JSON: {}", e)))?;
    match value {
        Value::Object(_) | Value::Array(_) => Ok(value),
        other => Err(LookupError::upstream(format!(
            "expected a JSON object or array, got {}",
            other
        ))),
    }
}

pub fn icon_url(icon: &str) -> String {
    format!("{}{}", ICON_BASE_URL, icon.replace(' ', "%20"))
}

/// Rewrites every string under an `icon` key, at any depth, into a full
/// image URL.
pub fn rewrite_icons(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if key == ICON_KEY {
                    if let Value::String(name) = child {
                        *name = icon_url(name);
                        continue;
                    }
                }
                rewrite_icons(child);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(rewrite_icons),
        _ => {}
    }
}

/// Adds `callback_url` at the top level. An array result has no place for
/// the key, so it moves under `results` first.
pub fn attach_callback(value: Value, callback_url: &str) -> Value {
    match value {
        Value::Object(mut map) => {
            map.insert(CALLBACK_KEY.to_string(), Value::String(callback_url.to_string()));
            Value::Object(map)
        }
        other => json!({ RESULTS_KEY: other, CALLBACK_KEY: callback_url }),
    }
}
