//! Fixed response header sets.

use axum::http::header::{HeaderMap, HeaderName, HeaderValue};

// header names must be lowercase for HeaderName::from_static
const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("content-type", "application/json"),
    ("access-control-allow-origin", "*"),
    ("access-control-allow-headers", "Content-Type"),
    ("access-control-allow-methods", "POST, OPTIONS"),
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("strict-transport-security", "max-age=31536000; includeSubDomains"),
    ("cache-control", "no-store, no-cache, must-revalidate, private"),
];

const PREFLIGHT_HEADERS: &[(&str, &str)] = &[
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "POST, OPTIONS"),
    ("access-control-allow-headers", "Content-Type, Authorization, X-Amz-Date, X-Api-Key"),
    ("access-control-max-age", "300"),
];

fn to_header_map(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
    pairs
        .iter()
        .map(|&(name, value)| (HeaderName::from_static(name), HeaderValue::from_static(value)))
        .collect()
}

/// Headers attached to every JSON response
pub fn security_headers() -> HeaderMap {
    to_header_map(SECURITY_HEADERS)
}

/// Headers for the CORS preflight response
pub fn preflight_headers() -> HeaderMap {
    to_header_map(PREFLIGHT_HEADERS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{
        ACCESS_CONTROL_MAX_AGE, CONTENT_TYPE, STRICT_TRANSPORT_SECURITY, X_FRAME_OPTIONS,
    };

    #[test]
    fn test_security_headers() {
        let headers = security_headers();
        assert_eq!(headers.len(), 9);
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[STRICT_TRANSPORT_SECURITY], "max-age=31536000; includeSubDomains");
    }

    #[test]
    fn test_preflight_headers() {
        let headers = preflight_headers();
        assert_eq!(headers[ACCESS_CONTROL_MAX_AGE], "300");
        assert!(headers.get(CONTENT_TYPE).is_none());
    }
}
