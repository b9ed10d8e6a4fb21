use std::sync::Arc;

use http::HeaderMap;
use secrecy::{ExposeSecret, SecretString};

use crate::{KeyDetails, headers};

/// Caller information gathered before a request reaches a handler
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Value of the `key` header
    pub api_key: Option<SecretString>,
    /// Key store details when `api_key` is a valid internal key
    pub key_details: Option<Arc<KeyDetails>>,
    /// Traced end-customer id
    pub trace_customer_id: Option<String>,
    /// Traced session id
    pub trace_session_id: Option<String>,
}

impl RequestContext {
    /// Build a context from request headers, without key resolution
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            api_key: headers::text(headers, headers::KEY).map(SecretString::from),
            key_details: None,
            trace_customer_id: headers::text(headers, headers::TRACE_CUSTOMER_ID),
            trace_session_id: headers::text(headers, headers::TRACE_SESSION_ID),
        }
    }

    /// Whether the caller presented a key carrying the internal prefix
    pub fn has_internal_key(&self, prefix: &str) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|key| key.expose_secret().starts_with(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_gateway_headers() {
        let mut map = HeaderMap::new();
        map.insert(headers::KEY, "tollgate-abc".parse().unwrap());
        map.insert(headers::TRACE_CUSTOMER_ID, "cust-9".parse().unwrap());

        let ctx = RequestContext::from_headers(&map);
        assert!(ctx.has_internal_key("tollgate"));
        assert!(!ctx.has_internal_key("sk-"));
        assert_eq!(ctx.trace_customer_id.as_deref(), Some("cust-9"));
        assert!(ctx.trace_session_id.is_none());
        assert!(ctx.key_details.is_none());
    }

    #[test]
    fn missing_key_is_not_internal() {
        let ctx = RequestContext::from_headers(&HeaderMap::new());
        assert!(!ctx.has_internal_key("tollgate"));
    }
}
