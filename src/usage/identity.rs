//! Request identity resolution
//!
//! The rate-limiting key for a request: authenticated user id, else browser
//! fingerprint, else client IP, in that precedence order. Authentication
//! itself happens upstream; this only reads what the proxy forwards.

use axum::http::HeaderMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Option<String>,
    pub fingerprint: Option<String>,
    pub ip: String,
}

impl Identity {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            user_id: header_value(headers, "x-user-id"),
            fingerprint: header_value(headers, "x-fingerprint"),
            ip: client_ip(headers),
        }
    }

    /// The metering key: user id over fingerprint over IP
    pub fn key(&self) -> &str {
        self.user_id
            .as_deref()
            .or(self.fingerprint.as_deref())
            .unwrap_or(&self.ip)
    }

    pub fn anonymous(ip: impl Into<String>) -> Self {
        Self {
            user_id: None,
            fingerprint: None,
            ip: ip.into(),
        }
    }
}

/// Client IP from proxy headers, `"unknown"` when nothing is forwarded
pub fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = header_value(headers, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real_ip) = header_value(headers, "x-real-ip") {
        return real_ip;
    }
    if let Some(cf_ip) = header_value(headers, "cf-connecting-ip") {
        return cf_ip;
    }
    "unknown".to_string()
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn mk_headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let headers = mk_headers(&[("x-forwarded-for", "203.0.113.7, 10.0.0.1")]);
        assert_eq!(client_ip(&headers), "203.0.113.7");
    }

    #[test]
    fn test_ip_fallback_chain() {
        let headers = mk_headers(&[("x-real-ip", "198.51.100.4")]);
        assert_eq!(client_ip(&headers), "198.51.100.4");

        let headers = mk_headers(&[("cf-connecting-ip", "192.0.2.33")]);
        assert_eq!(client_ip(&headers), "192.0.2.33");

        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }

    #[test]
    fn test_identity_key_precedence() {
        let headers = mk_headers(&[
            ("x-user-id", "user-7"),
            ("x-fingerprint", "fp-1"),
            ("x-real-ip", "198.51.100.4"),
        ]);
        let identity = Identity::from_headers(&headers);
        assert_eq!(identity.key(), "user-7");

        let headers = mk_headers(&[("x-fingerprint", "fp-1"), ("x-real-ip", "198.51.100.4")]);
        assert_eq!(Identity::from_headers(&headers).key(), "fp-1");

        let headers = mk_headers(&[("x-real-ip", "198.51.100.4")]);
        assert_eq!(Identity::from_headers(&headers).key(), "198.51.100.4");
    }
}
