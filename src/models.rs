use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of a lookup: the upstream JSON tree with icons rewritten.
pub type LookupResult = Value;

/// One URL or a list of URLs to analyze.
///
/// A single string is forwarded as-is, so the comma-separated form
/// (`https://a.com,https://b.com`) reaches the API unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Targets {
    One(String),
    Many(Vec<String>),
}

impl Targets {
    pub fn into_list(self) -> Vec<String> {
        match self {
            Targets::One(url) => vec![url],
            Targets::Many(list) => list,
        }
    }
}

impl From<&str> for Targets {
    fn from(url: &str) -> Self {
        Targets::One(url.to_string())
    }
}

impl From<String> for Targets {
    fn from(url: String) -> Self {
        Targets::One(url)
    }
}

impl From<Vec<String>> for Targets {
    fn from(urls: Vec<String>) -> Self {
        Targets::Many(urls)
    }
}

impl From<Vec<&str>> for Targets {
    fn from(urls: Vec<&str>) -> Self {
        Targets::Many(urls.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Targets {
    fn from(urls: [&str; N]) -> Self {
        Targets::Many(urls.iter().map(|u| u.to_string()).collect())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LookupRequest {
    pub urls: Targets,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

impl LookupRequest {
    pub fn new(urls: impl Into<Targets>) -> Self {
        Self {
            urls: urls.into(),
            callback_url: None,
        }
    }

    pub fn with_callback(mut self, callback_url: impl Into<String>) -> Self {
        self.callback_url = Some(callback_url.into());
        self
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_string_is_kept_whole() {
        let targets = Targets::from("https://a.com/search?tags=a,b");
        assert_eq!(targets.into_list(), vec!["https://a.com/search?tags=a,b"]);
    }

    #[test]
    fn deserializes_string_or_list() {
        let one: LookupRequest = serde_json::from_str(r#"{"urls": "https://a.com"}"#).unwrap();
        assert_eq!(one.urls, Targets::One("https://a.com".into()));
        assert!(one.callback_url.is_none());

        let many: LookupRequest = serde_json::from_str(
            r#"{"urls": ["https://a.com", "https://b.com"], "callback_url": "https://cb.example"}"#,
        )
        .unwrap();
        assert_eq!(
            many.urls,
            Targets::Many(vec!["https://a.com".into(), "https://b.com".into()])
        );
        assert_eq!(many.callback_url.as_deref(), Some("https://cb.example"));
    }
}
