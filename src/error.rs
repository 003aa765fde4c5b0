//! Per-page failure type
//!
//! Every variant means the same thing to callers: processing this page
//! failed. Harvest entry points turn it into a placeholder record.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PageError {
    #[error("Navigation timeout of {0} ms exceeded")]
    Timeout(u64),

    #[error("Navigation failed ({kind}): {message}")]
    Navigation { kind: &'static str, message: String },

    #[error("Script evaluation failed: {0}")]
    Evaluation(String),

    #[error("Browser error: {0}")]
    Browser(String),
}

impl PageError {
    /// Build a navigation error, classifying the browser's error text
    pub fn navigation(message: impl Into<String>) -> Self {
        let message = message.into();
        PageError::Navigation {
            kind: classify(&message),
            message,
        }
    }
}

impl From<chromiumoxide::error::CdpError> for PageError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        PageError::Browser(e.to_string())
    }
}

/// Chrome net error markers and the kind they map to; first match wins
const NAVIGATION_KINDS: &[(&str, &str)] = &[
    ("ERR_NAME_NOT_RESOLVED", "DNS_FAILED"),
    ("ERR_CONNECTION_REFUSED", "CONNECTION_REFUSED"),
    ("ERR_CONNECTION_TIMED_OUT", "TIMEOUT"),
    ("ERR_CERT", "SSL_ERROR"),
    ("SSL", "SSL_ERROR"),
];

fn classify(error: &str) -> &'static str {
    NAVIGATION_KINDS
        .iter()
        .find(|(marker, _)| error.contains(marker))
        .map_or("NETWORK_ERROR", |&(_, kind)| kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("net::ERR_NAME_NOT_RESOLVED"), "DNS_FAILED");
        assert_eq!(classify("ERR_CONNECTION_REFUSED"), "CONNECTION_REFUSED");
        assert_eq!(classify("net::ERR_CONNECTION_TIMED_OUT"), "TIMEOUT");
        assert_eq!(classify("net::ERR_CERT_DATE_INVALID"), "SSL_ERROR");
        assert_eq!(classify("net::ERR_SSL_PROTOCOL_ERROR"), "SSL_ERROR");
        assert_eq!(classify("random error"), "NETWORK_ERROR");
    }

    #[test]
    fn test_display() {
        assert_eq!(
            PageError::Timeout(45000).to_string(),
            "Navigation timeout of 45000 ms exceeded"
        );
        let err = PageError::navigation("net::ERR_CONNECTION_REFUSED at https://x.test");
        assert_eq!(
            err.to_string(),
            "Navigation failed (CONNECTION_REFUSED): net::ERR_CONNECTION_REFUSED at https://x.test"
        );
    }
}
