use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A request previously captured by the interception layer.
///
/// Captured requests are treated as templates: they are never edited in place,
/// only cloned and modified through the `with_*` helpers. `Clone` copies the
/// body, so sibling copies never share mutable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedRequest {
    pub url: String,
    pub method: String,
    /// Header names keep the casing they were captured with.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub tab_id: i64,
}

impl CapturedRequest {
    pub fn new(url: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            headers: HashMap::new(),
            body: None,
            timestamp: 0.0,
            request_id: String::new(),
            tab_id: -1,
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(&self, body: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.body = Some(body.into());
        copy
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn without_body(mut self) -> Self {
        self.body = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_ignores_case() {
        let req = CapturedRequest::new("https://example.com", "POST")
            .with_header("Content-Type", "application/json");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("x-missing"), None);
        assert!(req.headers.contains_key("Content-Type"));
    }

    #[test]
    fn test_with_body_leaves_template_untouched() {
        let template = CapturedRequest::new("https://example.com", "POST").with_body("<a/>");
        let copy = template.with_body("<b/>");
        assert_eq!(template.body.as_deref(), Some("<a/>"));
        assert_eq!(copy.body.as_deref(), Some("<b/>"));
    }

    #[test]
    fn test_deserializes_capture_export() {
        let json = r#"{
            "url": "https://example.com/api",
            "method": "POST",
            "headers": {"X-Token": "abc"},
            "body": null,
            "timestamp": 1700000000000.5,
            "requestId": "42.1",
            "tabId": 7
        }"#;
        let req: CapturedRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.request_id, "42.1");
        assert_eq!(req.tab_id, 7);
        assert!(req.body.is_none());
        assert_eq!(req.header("x-token"), Some("abc"));
    }
}
