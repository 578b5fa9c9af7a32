//! The v2 registry client: authentication, the TTL-bucketed auth cache, and the
//! request/pull/push operations built on top of them.

pub mod auth;
pub mod auth_cache;
pub mod client;
pub mod dockerhub;

pub use auth::{Authenticator, BasicAuth, DockerHubAuth, NoAuth};
pub use client::{Manifest, ManifestVersion, Registry};
pub use dockerhub::DockerRegistry;