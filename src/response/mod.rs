//! Normalized view of one HTTP response
//!
//! The engine wraps every raw transport response into a [`ResponseEnvelope`]
//! before handing it to a module. The envelope is read-only: headers, status
//! code, reason phrase, and the decoded body text, plus two derived views
//! that are computed on demand and degrade to `None` instead of erroring:
//!
//! - [`ResponseEnvelope::json`] - body parsed as JSON
//! - [`ResponseEnvelope::html`] - body parsed as an HTML document

use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use crate::transport::RawResponse;

/// Header map preserving repeated headers as ordered value lists.
pub type HeadersMap = BTreeMap<String, Vec<String>>;

static DOC_SHELL: OnceLock<Selector> = OnceLock::new();

fn doc_shell() -> &'static Selector {
    DOC_SHELL.get_or_init(|| {
        Selector::parse("html > head, html > body").expect("static selector is valid")
    })
}

/// Immutable normalized HTTP response handed to module handlers.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    headers: HeadersMap,
    status_code: u16,
    reason_phrase: String,
    content: String,
}

impl ResponseEnvelope {
    pub(crate) fn from_raw(raw: RawResponse) -> Self {
        Self {
            headers: raw.headers,
            status_code: raw.status,
            reason_phrase: raw.reason.unwrap_or_default(),
            content: raw.body,
        }
    }

    /// Response headers; repeated headers keep their values in arrival order.
    pub fn headers(&self) -> &HeadersMap {
        &self.headers
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Reason phrase for the status code (e.g. "OK" for 200). Empty when the
    /// transport did not supply one.
    pub fn reason_phrase(&self) -> &str {
        &self.reason_phrase
    }

    /// Decoded body text, transfer encoding and charset already resolved.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Parse the body as JSON. Returns `None` for anything that is not
    /// well-formed JSON; never errors.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.content).ok()
    }

    /// Parse the body as an HTML document. Returns `None` unless the content
    /// really looks like an HTML document.
    ///
    /// html5ever synthesizes an `html`/`head`/`body` shell around any input,
    /// plain text included, so the parsed tree alone cannot reject non-HTML.
    /// The source must also carry an explicit `<html` tag plus a `<head` or
    /// `<body` tag before the parse is trusted.
    pub fn html(&self) -> Option<Html> {
        let lower = self.content.to_ascii_lowercase();
        if !lower.contains("<html") || !(lower.contains("<head") || lower.contains("<body")) {
            return None;
        }

        let document = Html::parse_document(&self.content);
        if document.select(doc_shell()).next().is_some() {
            Some(document)
        } else {
            None
        }
    }
}

impl fmt::Display for ResponseEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status_code, self.reason_phrase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(body: &str) -> ResponseEnvelope {
        ResponseEnvelope::from_raw(RawResponse {
            status: 200,
            reason: Some("OK".to_string()),
            headers: HeadersMap::new(),
            body: body.to_string(),
        })
    }

    #[test]
    fn test_json_parses_object() {
        let response = envelope("{\"a\":1}");
        let value = response.json().expect("valid json");
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_json_parses_array() {
        let response = envelope("[1, 2, 3]");
        let value = response.json().expect("valid json");
        assert_eq!(value.as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_json_invalid_is_none() {
        assert!(envelope("not json").json().is_none());
    }

    #[test]
    fn test_html_document_is_present() {
        let response = envelope("<html><body>hi</body></html>");
        let document = response.html().expect("html document");

        let body = Selector::parse("body").unwrap();
        let text: String = document.select(&body).next().unwrap().text().collect();
        assert_eq!(text, "hi");
    }

    #[test]
    fn test_html_with_head_is_present() {
        let response = envelope("<html><head><title>t</title></head></html>");
        assert!(response.html().is_some());
    }

    #[test]
    fn test_html_plain_text_is_absent() {
        assert!(envelope("plain text").html().is_none());
    }

    #[test]
    fn test_html_json_body_is_absent() {
        assert!(envelope("{\"a\":1}").html().is_none());
    }

    #[test]
    fn test_html_fragment_without_html_tag_is_absent() {
        assert!(envelope("<body>hi</body>").html().is_none());
    }

    #[test]
    fn test_display_is_status_and_reason() {
        let response = envelope("");
        assert_eq!(response.to_string(), "200 OK");
    }

    #[test]
    fn test_headers_preserve_multi_values() {
        let mut headers = HeadersMap::new();
        headers.insert(
            "set-cookie".to_string(),
            vec!["a=1".to_string(), "b=2".to_string()],
        );
        let response = ResponseEnvelope::from_raw(RawResponse {
            status: 200,
            reason: None,
            headers,
            body: String::new(),
        });

        assert_eq!(response.headers()["set-cookie"], vec!["a=1", "b=2"]);
        assert_eq!(response.reason_phrase(), "");
    }
}
