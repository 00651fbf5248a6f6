use crate::server::Response;
use std::fmt;

/// Methods every preflight advertises: the five an operation may declare.
pub const CORS_ALLOWED_METHODS: &str = "DELETE, GET, PATCH, POST, PUT";

/// Request headers browsers may send cross-origin.
pub const CORS_ALLOWED_HEADERS: &str =
    "Accept, Authorization, Content-Type, Cookie, X-Api-Key, X-Api-Version, X-Request-Id";

/// CORS configuration error
///
/// Returned by [`CorsPolicy::new`]. Credentials are always allowed, so the
/// allow-list must name exact origins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsConfigError {
    /// Wildcard origin (`*`) cannot be used with credentials
    WildcardWithCredentials,
    /// The origin is not `scheme://host[:port]`
    InvalidOriginFormat { origin: String },
}

impl fmt::Display for CorsConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorsConfigError::WildcardWithCredentials => write!(
                f,
                "CORS configuration error: Cannot use wildcard origin (*) with credentials."
            ),
            CorsConfigError::InvalidOriginFormat { origin } => write!(
                f,
                "CORS configuration error: Invalid origin format '{origin}'. \
                 Expected format: scheme://host:port (e.g., https://example.com)"
            ),
        }
    }
}

impl std::error::Error for CorsConfigError {}

/// Origin allow-list applied to every response and to `OPTIONS` preflights.
///
/// An empty list disables CORS entirely: no headers are added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorsPolicy {
    origins: Vec<String>,
}

impl CorsPolicy {
    /// # Errors
    ///
    /// Rejects `*` and anything that is not an `http(s)://` origin.
    pub fn new(origins: Vec<String>) -> Result<Self, CorsConfigError> {
        for origin in &origins {
            if origin == "*" {
                return Err(CorsConfigError::WildcardWithCredentials);
            }
            let valid = url::Url::parse(origin)
                .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
                .unwrap_or(false);
            if !valid {
                return Err(CorsConfigError::InvalidOriginFormat {
                    origin: origin.clone(),
                });
            }
        }
        Ok(Self { origins })
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.origins.is_empty()
    }

    #[must_use]
    pub fn origins(&self) -> &[String] {
        &self.origins
    }

    /// The `Access-Control-Allow-Origin` value for a request.
    ///
    /// A request origin matching the list case-insensitively is echoed back
    /// verbatim; anything else gets the first configured origin.
    #[must_use]
    pub fn allow_origin<'a>(&'a self, request_origin: Option<&'a str>) -> Option<&'a str> {
        let first = self.origins.first()?;
        match request_origin {
            Some(o) if self.origins.iter().any(|a| a.eq_ignore_ascii_case(o)) => Some(o),
            _ => Some(first.as_str()),
        }
    }

    /// Add CORS headers to `res` when the policy is enabled.
    pub fn apply(&self, request_origin: Option<&str>, res: &mut Response) {
        let Some(origin) = self.allow_origin(request_origin) else {
            return;
        };
        res.set_header("access-control-allow-origin", origin.to_owned());
        res.set_header("access-control-allow-methods", CORS_ALLOWED_METHODS.to_owned());
        res.set_header("access-control-allow-headers", CORS_ALLOWED_HEADERS.to_owned());
        res.set_header("access-control-allow-credentials", "true".to_owned());
        res.set_header("vary", "Origin".to_owned());
    }

    /// Response to an `OPTIONS` preflight.
    #[must_use]
    pub fn preflight(&self, request_origin: Option<&str>) -> Response {
        let mut res = Response::new(204);
        self.apply(request_origin, &mut res);
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CorsPolicy {
        CorsPolicy::new(vec![
            "https://example.com".into(),
            "https://admin.example.com".into(),
        ])
        .unwrap()
    }

    #[test]
    fn test_echoes_request_casing() {
        let p = policy();
        assert_eq!(p.allow_origin(Some("HTTPS://EXAMPLE.COM")), Some("HTTPS://EXAMPLE.COM"));
    }

    #[test]
    fn test_unknown_origin_gets_first() {
        let p = policy();
        assert_eq!(p.allow_origin(Some("https://evil.test")), Some("https://example.com"));
        assert_eq!(p.allow_origin(None), Some("https://example.com"));
    }

    #[test]
    fn test_disabled_policy_adds_nothing() {
        let mut res = Response::new(200);
        CorsPolicy::default().apply(Some("https://example.com"), &mut res);
        assert!(res.headers.is_empty());
    }

    #[test]
    fn test_preflight_headers() {
        let res = policy().preflight(Some("https://admin.example.com"));
        assert_eq!(res.status, 204);
        assert_eq!(res.header("access-control-allow-methods"), Some(CORS_ALLOWED_METHODS));
        assert_eq!(res.header("access-control-allow-credentials"), Some("true"));
    }

    #[test]
    fn test_rejects_bad_origins() {
        assert_eq!(
            CorsPolicy::new(vec!["*".into()]),
            Err(CorsConfigError::WildcardWithCredentials)
        );
        assert!(matches!(
            CorsPolicy::new(vec!["example.com".into()]),
            Err(CorsConfigError::InvalidOriginFormat { .. })
        ));
    }
}
