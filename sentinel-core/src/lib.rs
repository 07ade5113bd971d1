//! Domain model and request-handling logic for the sentinel gateway:
//! the repository contracts, the API-key and secrets managers, the
//! authenticator, and the transport-agnostic half of the reverse proxy.
//!
//! HTTP binding, configuration loading, and the concrete in-memory
//! repository live in sibling crates; this crate depends on nothing
//! beyond [`sentinel_envelope`] and the repository traits it defines.

pub mod apikey;
pub mod auth;
pub mod error;
pub mod model;
pub mod proxy;
pub mod repo;
pub mod secrets;

pub use apikey::{ApiKeyManager, IssuedApiKey};
pub use auth::{Authenticator, Identity, RequestContext, ServiceTokens};
pub use error::{GatewayError, RepoError};
pub use proxy::{IdentityHeaders, RouteTable};
pub use repo::{ApiKeyRepo, AuditRepo, Repository, SecretRepo, SessionRepo, UserRepo};
pub use secrets::SecretsManager;
