//! `DockerRegistry`, a Docker Hub convenience wrapper around [`super::client::Registry`].
//!
//! Supplemented from `provider.py` (dropped in the distillation): defaults the hostname
//! to Docker Hub's registry endpoint, defaults authentication to a bearer-token
//! exchange seeded from `DOCKER_USERNAME`/`DOCKER_PASSWORD`, and prefixes a bare image
//! name with `library/` before pulling or pushing, Docker Hub's convention for
//! official images. No new core behavior: the same `Registry` does the work.

use super::auth::{Authenticator, DockerHubAuth};
use super::client::Registry;
use crate::config::AuthConfig;
use crate::error::Result;
use crate::image::Image;
use std::sync::Arc;

const DOCKERHUB_HOSTNAME: &str = "https://registry-1.docker.io";

pub struct DockerRegistry {
    inner: Registry,
}

impl DockerRegistry {
    /// Uses `DOCKER_USERNAME`/`DOCKER_PASSWORD` from the environment, if set, to
    /// authenticate the token exchange, anonymous otherwise.
    pub fn new() -> Self {
        Self::with_credentials(AuthConfig::from_env())
    }

    pub fn with_credentials(credentials: AuthConfig) -> Self {
        let client = reqwest::Client::new();
        let auth: Arc<dyn Authenticator> =
            Arc::new(DockerHubAuth::new(client, credentials));
        DockerRegistry {
            inner: Registry::new(DOCKERHUB_HOSTNAME, Some(auth)),
        }
    }

    fn qualify(image: &str) -> String {
        if image.contains('/') {
            image.to_string()
        } else {
            format!("library/{}", image)
        }
    }

    pub async fn pull_image(&self, image: &str, tag: &str, lazy: bool) -> Result<Image> {
        self.inner.pull_image(&Self::qualify(image), tag, lazy).await
    }

    pub async fn push_image(&self, image: &Image) -> Result<()> {
        self.inner.push_image(image).await
    }
}

impl Default for DockerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualifies_bare_image_names() {
        assert_eq!(DockerRegistry::qualify("busybox"), "library/busybox");
        assert_eq!(DockerRegistry::qualify("library/busybox"), "library/busybox");
        assert_eq!(DockerRegistry::qualify("myorg/myimage"), "myorg/myimage");
    }
}
