//! External-app hand-off with fallback.
//!
//! Opening a deep link is fire-and-forget: there is no confirmation
//! channel back from WhatsApp or a UPI app, and a successful open is a
//! best-effort signal at most (a desktop may accept a `tez:` URI and
//! silently do nothing with it). Callers therefore always get the link
//! back alongside the opened flag, so the frontend can show a clickable
//! fallback plus a copy affordance whenever `opened` is false. A blocked
//! open is a normal outcome here, never an error condition.

use serde_json::Value;
use thiserror::Error;
use tracing::info;

const HANDOFF_URI_MAX_LEN: usize = 2048;

/// Schemes the hand-off gateway will pass to the OS. `https` is only for
/// the WhatsApp web endpoint; everything else a page could ask for is
/// refused before it reaches the opener.
const ALLOWED_SCHEMES: [&str; 4] = ["https", "upi", "paytmmp", "tez"];
const ALLOWED_HTTPS_HOSTS: [&str; 1] = ["wa.me"];

#[derive(Debug, Error, PartialEq)]
pub enum HandoffUriError {
    #[error("Hand-off URI cannot be empty")]
    Empty,
    #[error("Hand-off URI is too long")]
    TooLong,
    #[error("Hand-off URI has no scheme")]
    MissingScheme,
    #[error("Scheme '{0}' is not allowed for hand-off")]
    SchemeNotAllowed(String),
    #[error("Host '{0}' is not allowed for hand-off")]
    HostNotAllowed(String),
}

/// Gate a URI before handing it to the OS opener.
pub fn validate_handoff_uri(uri: &str) -> Result<(), HandoffUriError> {
    let trimmed = uri.trim();
    if trimmed.is_empty() {
        return Err(HandoffUriError::Empty);
    }
    if trimmed.len() > HANDOFF_URI_MAX_LEN {
        return Err(HandoffUriError::TooLong);
    }

    let Some((scheme, rest)) = trimmed.split_once(':') else {
        return Err(HandoffUriError::MissingScheme);
    };
    let scheme = scheme.to_ascii_lowercase();
    if !ALLOWED_SCHEMES.contains(&scheme.as_str()) {
        return Err(HandoffUriError::SchemeNotAllowed(scheme));
    }

    if scheme == "https" {
        let after = rest.trim_start_matches("//");
        let host = after
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !ALLOWED_HTTPS_HOSTS.contains(&host.as_str()) {
            return Err(HandoffUriError::HostNotAllowed(host));
        }
    }

    Ok(())
}

/// Try to open `uri` in the external handler. `false` means definitely
/// blocked (or refused by the gateway) and the caller must surface the
/// fallback; `true` means a handler accepted the URI, which is only
/// "probably launched".
pub fn attempt_open(uri: &str) -> bool {
    if let Err(e) = validate_handoff_uri(uri) {
        info!(error = %e, "Hand-off URI refused by gateway");
        return false;
    }
    match webbrowser::open(uri) {
        Ok(()) => {
            info!(uri_len = uri.len(), "External hand-off opened");
            true
        }
        Err(e) => {
            // Blocked is a normal outcome, surfaced as the fallback UI path
            info!(error = %e, "External hand-off blocked, falling back to visible link");
            false
        }
    }
}

/// JSON outcome every hand-off command returns: the open flag plus the
/// link itself, so the fallback UI always has something actionable.
pub fn outcome(opened: bool, uri: &str) -> Value {
    serde_json::json!({
        "opened": opened,
        "link": uri,
    })
}

/// Validate, attempt, and wrap in one step.
pub fn open_with_fallback(uri: &str) -> Value {
    let opened = attempt_open(uri);
    outcome(opened, uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_known_handoff_schemes() {
        assert_eq!(validate_handoff_uri("upi://pay?pa=a%40b&am=10"), Ok(()));
        assert_eq!(validate_handoff_uri("paytmmp://pay?pa=a%40b"), Ok(()));
        assert_eq!(validate_handoff_uri("tez://upi/pay?pa=a%40b"), Ok(()));
        assert_eq!(validate_handoff_uri("https://wa.me/7973782618?text=hi"), Ok(()));
    }

    #[test]
    fn refuses_unlisted_schemes_and_hosts() {
        assert_eq!(
            validate_handoff_uri("http://wa.me/123"),
            Err(HandoffUriError::SchemeNotAllowed("http".into()))
        );
        assert_eq!(
            validate_handoff_uri("https://example.com/pay"),
            Err(HandoffUriError::HostNotAllowed("example.com".into()))
        );
        assert_eq!(
            validate_handoff_uri("file:///etc/passwd"),
            Err(HandoffUriError::SchemeNotAllowed("file".into()))
        );
        assert_eq!(validate_handoff_uri(""), Err(HandoffUriError::Empty));
        assert_eq!(
            validate_handoff_uri("no-scheme-here"),
            Err(HandoffUriError::MissingScheme)
        );
    }

    #[test]
    fn refuses_overlong_uris() {
        let long = format!("upi://pay?tn={}", "x".repeat(HANDOFF_URI_MAX_LEN));
        assert_eq!(validate_handoff_uri(&long), Err(HandoffUriError::TooLong));
    }

    #[test]
    fn outcome_always_carries_the_link() {
        let blocked = outcome(false, "https://wa.me/123?text=hello");
        assert_eq!(blocked["opened"], false);
        assert_eq!(blocked["link"], "https://wa.me/123?text=hello");

        let opened = outcome(true, "upi://pay?pa=a%40b");
        assert_eq!(opened["opened"], true);
        assert_eq!(opened["link"], "upi://pay?pa=a%40b");
    }

    #[test]
    fn gateway_refusal_is_a_false_not_a_panic() {
        // An invalid URI never reaches the OS opener and reports blocked.
        let result = open_with_fallback("javascript:alert(1)");
        assert_eq!(result["opened"], false);
    }
}
