use axum::http::HeaderMap;
use std::fmt;

/// Header (and attribute/metadata key) that carries the tenant on every transport.
pub const TENANT_HEADER: &str = "x-pg-tenant";

/// Opaque tenant identifier taken from the inbound request.
///
/// Always non-empty visible ASCII, so it can be written into HTTP headers and
/// gRPC ASCII metadata as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tenant(String);

impl Tenant {
    /// Returns `None` for empty values and values that are not visible ASCII.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_graphic() || b == b' ') {
            return None;
        }
        Some(Self(value))
    }

    /// Extract the tenant from inbound request headers.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get(TENANT_HEADER)
            .and_then(|h| h.to_str().ok())
            .and_then(Self::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_tenant_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_HEADER, HeaderValue::from_static("acme"));

        let tenant = Tenant::from_headers(&headers).unwrap();
        assert_eq!(tenant.as_str(), "acme");
    }

    #[test]
    fn test_missing_tenant() {
        assert_eq!(Tenant::from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn test_empty_tenant_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_HEADER, HeaderValue::from_static(""));
        assert_eq!(Tenant::from_headers(&headers), None);
    }

    #[test]
    fn test_non_ascii_tenant_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_HEADER, HeaderValue::from_bytes(&[0xe2, 0x98, 0x83]).unwrap());
        assert_eq!(Tenant::from_headers(&headers), None);
        assert_eq!(Tenant::new("t\u{e9}nant"), None);
    }
}
