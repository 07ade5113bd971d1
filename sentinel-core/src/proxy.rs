//! Transport-agnostic reverse-proxy logic: the route table and header
//! hygiene rules. The HTTP transport itself (streaming the body through
//! `reqwest`/`axum`) lives in the server crate; this module is the part
//! that's pure enough to unit-test without a socket.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::Duration;

use crate::auth::Identity;

/// Read-only after startup: `service_name -> upstream base URL` plus a
/// per-service timeout. Constructed once and passed into the proxy
/// handler explicitly (never a mutable global).
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: BTreeMap<String, RouteEntry>,
    default_timeout: Duration,
}

#[derive(Debug, Clone)]
struct RouteEntry {
    upstream_base: String,
    timeout: Duration,
}

impl RouteTable {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            routes: BTreeMap::new(),
            default_timeout,
        }
    }

    pub fn with_route(mut self, service: impl Into<String>, upstream_base: impl Into<String>) -> Self {
        let timeout = self.default_timeout;
        self.routes.insert(
            service.into(),
            RouteEntry {
                upstream_base: upstream_base.into(),
                timeout,
            },
        );
        self
    }

    pub fn with_route_timeout(
        mut self,
        service: impl Into<String>,
        upstream_base: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        self.routes.insert(
            service.into(),
            RouteEntry {
                upstream_base: upstream_base.into(),
                timeout,
            },
        );
        self
    }

    /// Resolve `service` to `(upstream_base, timeout)`, or `None` if no
    /// such service is configured.
    pub fn resolve(&self, service: &str) -> Option<(&str, Duration)> {
        self.routes
            .get(service)
            .map(|entry| (entry.upstream_base.as_str(), entry.timeout))
    }
}

/// Headers that are always stripped before forwarding, regardless of
/// inbound value.
pub const ALWAYS_STRIPPED_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "x-api-key",
    "x-service-token",
    "connection",
    "keep-alive",
    "te",
    "upgrade",
    "trailer",
    "transfer-encoding",
];

/// A header is hop-by-hop (and thus always stripped) if it's in the
/// fixed list above, or a `proxy-*` header.
pub fn is_always_stripped(header_name: &str) -> bool {
    let lower = header_name.to_ascii_lowercase();
    ALWAYS_STRIPPED_HEADERS.contains(&lower.as_str()) || lower.starts_with("proxy-")
}

/// The canonical identity headers the authenticator writes on every
/// forwarded request, overwriting anything the caller supplied.
#[derive(Debug, Clone)]
pub struct IdentityHeaders {
    pub user_id: String,
    pub user_role: String,
    pub forwarded_for: String,
    pub real_ip: String,
}

impl IdentityHeaders {
    pub fn build(identity: &Identity, socket_ip: IpAddr) -> Self {
        let (user_id, user_role) = match identity {
            Identity::Anonymous => (String::new(), String::new()),
            Identity::User { id, role } => (id.clone(), role.clone().unwrap_or_default()),
            Identity::Service { name } => (String::new(), format!("service:{name}")),
        };
        let ip = socket_ip.to_string();
        Self {
            user_id,
            user_role,
            forwarded_for: ip.clone(),
            real_ip: ip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_table_resolves_configured_service() {
        let table = RouteTable::new(Duration::from_secs(30))
            .with_route("sample", "http://localhost:9000");
        let (base, timeout) = table.resolve("sample").unwrap();
        assert_eq!(base, "http://localhost:9000");
        assert_eq!(timeout, Duration::from_secs(30));
        assert!(table.resolve("unknown").is_none());
    }

    #[test]
    fn identity_headers_use_socket_ip_not_inbound() {
        let identity = Identity::User {
            id: "user-123".into(),
            role: Some("admin".into()),
        };
        let socket_ip: IpAddr = "203.0.113.10".parse().unwrap();
        let headers = IdentityHeaders::build(&identity, socket_ip);
        assert_eq!(headers.user_id, "user-123");
        assert_eq!(headers.user_role, "admin");
        assert_eq!(headers.forwarded_for, "203.0.113.10");
        assert_eq!(headers.real_ip, "203.0.113.10");
    }

    #[test]
    fn anonymous_identity_yields_empty_user_headers() {
        let headers = IdentityHeaders::build(&Identity::Anonymous, "9.9.9.9".parse().unwrap());
        assert!(headers.user_id.is_empty());
        assert!(headers.user_role.is_empty());
    }

    #[test]
    fn stripped_header_set_covers_forgeable_and_hop_by_hop() {
        for h in [
            "Authorization",
            "Cookie",
            "X-API-Key",
            "X-Service-Token",
            "Proxy-Authenticate",
            "Transfer-Encoding",
        ] {
            assert!(is_always_stripped(h), "{h} should be stripped");
        }
        assert!(!is_always_stripped("Content-Type"));
        assert!(!is_always_stripped("X-User-ID"));
    }
}
