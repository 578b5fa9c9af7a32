//! Configuration: credential pairs and `scheme://host/repository:tag` URL parsing.

use crate::error::{RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Username/password pair used by [`crate::registry::auth::BasicAuth`] and by the
/// Docker Hub token exchange. Either field may be absent, in which case the registry
/// client sends no `Authorization` header (spec: "If authentication is null, no header
/// is added").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl AuthConfig {
    pub fn is_set(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Reads `DOCKER_USERNAME`/`DOCKER_PASSWORD` from the environment (spec §6).
    pub fn from_env() -> Self {
        Self {
            username: env::var("DOCKER_USERNAME").ok(),
            password: env::var("DOCKER_PASSWORD").ok(),
        }
    }
}

/// The parsed parts of a `[scheme://]host[:port]/repository[:tag]` reference, as typed
/// by a CLI user or an operator's config file. `tag` defaults to `latest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub hostname: String,
    pub repository: String,
    pub tag: String,
}

impl RegistryConfig {
    pub fn parse_url(reference: &str) -> Result<Self> {
        let (scheme, remaining) = match reference.find("://") {
            Some(pos) => (&reference[..pos + 3], &reference[pos + 3..]),
            None => ("https://", reference),
        };

        let (host, path) = remaining.split_once('/').ok_or_else(|| {
            RegistryError::Format(format!(
                "invalid registry reference '{}': expected scheme://host/repository[:tag]",
                reference
            ))
        })?;

        let (repository, tag) = match path.rfind(':') {
            Some(pos) => (&path[..pos], &path[pos + 1..]),
            None => (path, "latest"),
        };

        if repository.is_empty() {
            return Err(RegistryError::Format(
                "repository name cannot be empty".to_string(),
            ));
        }

        Ok(RegistryConfig {
            hostname: format!("{}{}", scheme, host),
            repository: repository.to_string(),
            tag: tag.to_string(),
        })
    }
}
