//! Authentication providers: produce the headers a [`super::client::Registry`] request
//! should carry, given the image and action being performed.

use crate::config::AuthConfig;
use crate::error::{RegistryError, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::Deserialize;

/// Produces the `Authorization` header (if any) for a request against `image`
/// performing `action` ("pull" or "push"). Implementations own whatever caching they
/// need beyond the TTL-bucketed cache `Registry` already wraps them in.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn headers(&self, image: &str, action: &str) -> Result<HeaderMap>;
}

/// No authentication: every request goes out with no `Authorization` header.
pub struct NoAuth;

#[async_trait]
impl Authenticator for NoAuth {
    async fn headers(&self, _image: &str, _action: &str) -> Result<HeaderMap> {
        Ok(HeaderMap::new())
    }
}

/// `Authorization: Basic <base64(user:pass)>` on every request, regardless of image or
/// action.
pub struct BasicAuth {
    username: String,
    password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        BasicAuth {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Option<Self> {
        match (&config.username, &config.password) {
            (Some(u), Some(p)) => Some(BasicAuth::new(u.clone(), p.clone())),
            _ => None,
        }
    }
}

#[async_trait]
impl Authenticator for BasicAuth {
    async fn headers(&self, _image: &str, _action: &str) -> Result<HeaderMap> {
        let credentials = BASE64.encode(format!("{}:{}", self.username, self.password));
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Basic {}", credentials))
            .map_err(|e| RegistryError::Auth(e.to_string()))?;
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

/// Fetches a bearer token from the Docker Hub token endpoint per image/action, per the
/// registry token authentication spec. Credentials are optional: an anonymous pull
/// token is requested when none are set.
pub struct DockerHubAuth {
    client: Client,
    username: Option<String>,
    password: Option<String>,
}

impl DockerHubAuth {
    pub fn new(client: Client, config: AuthConfig) -> Self {
        DockerHubAuth {
            client,
            username: config.username,
            password: config.password,
        }
    }
}

#[async_trait]
impl Authenticator for DockerHubAuth {
    async fn headers(&self, image: &str, action: &str) -> Result<HeaderMap> {
        let scope = format!("repository:{}:{}", image, action);
        let mut request = self
            .client
            .get("https://auth.docker.io/token")
            .query(&[("service", "registry.docker.io"), ("scope", scope.as_str())]);

        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            request = request.basic_auth(username, Some(password));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(RegistryError::Auth(format!(
                "token request failed with status {}",
                response.status()
            )));
        }

        let parsed: TokenResponse = response.json().await?;
        let token = parsed
            .token
            .or(parsed.access_token)
            .ok_or_else(|| RegistryError::Auth("token response had no token field".to_string()))?;

        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| RegistryError::Auth(e.to_string()))?;
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }
}

/// One element of a `WWW-Authenticate: Bearer realm="...",service="...",scope="..."`
/// challenge, as sent by a registry in response to an unauthenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerChallenge {
    pub realm: String,
    pub service: Option<String>,
    pub scope: Option<String>,
}

/// Parses a `WWW-Authenticate` header value, returning `None` if it isn't a `Bearer`
/// challenge (e.g. `Basic realm="..."`, which this crate doesn't need to act on).
pub fn parse_bearer_challenge(header_value: &str) -> Option<BearerChallenge> {
    let params = header_value.strip_prefix("Bearer ")?;
    let mut realm = None;
    let mut service = None;
    let mut scope = None;

    for param in params.split(',') {
        let param = param.trim();
        let (key, value) = param.split_once('=')?;
        let value = value.trim().trim_matches('"').to_string();
        match key.trim() {
            "realm" => realm = Some(value),
            "service" => service = Some(value),
            "scope" => scope = Some(value),
            _ => {}
        }
    }

    Some(BearerChallenge {
        realm: realm?,
        service,
        scope,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_bearer_challenge() {
        let header = r#"Bearer realm="https://auth.docker.io/token",service="registry.docker.io",scope="repository:library/busybox:pull""#;
        let challenge = parse_bearer_challenge(header).unwrap();
        assert_eq!(challenge.realm, "https://auth.docker.io/token");
        assert_eq!(challenge.service.as_deref(), Some("registry.docker.io"));
        assert_eq!(
            challenge.scope.as_deref(),
            Some("repository:library/busybox:pull")
        );
    }

    #[test]
    fn non_bearer_challenge_is_none() {
        assert!(parse_bearer_challenge(r#"Basic realm="registry""#).is_none());
    }

    #[tokio::test]
    async fn basic_auth_encodes_credentials() {
        let auth = BasicAuth::new("user", "pass");
        let headers = auth.headers("library/busybox", "pull").await.unwrap();
        let value = headers.get(AUTHORIZATION).unwrap().to_str().unwrap();
        assert_eq!(value, format!("Basic {}", BASE64.encode("user:pass")));
    }

    #[tokio::test]
    async fn no_auth_adds_no_header() {
        let headers = NoAuth.headers("library/busybox", "pull").await.unwrap();
        assert!(headers.get(AUTHORIZATION).is_none());
    }
}
