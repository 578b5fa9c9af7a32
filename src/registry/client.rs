//! The v2 registry client: `request()`, the public operations table, and pull/push.

use super::auth::Authenticator;
use super::auth_cache::AuthCache;
use crate::digest;
use crate::error::{RegistryError, Result};
use crate::image::{Image, Layer, LayerMetadata};
use crate::schema::config_doc::Config;
use crate::schema::manifest::{
    ManifestV1, ManifestV2, MEDIA_TYPE_MANIFEST_V1, MEDIA_TYPE_MANIFEST_V2,
};
use crate::schema::registry_error::RegistryErrorBody;
use futures::future::try_join_all;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Response};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// The manifest schema a caller wants back from [`Registry::get_manifest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestVersion {
    V1,
    V2,
}

/// Either manifest schema, returned by [`Registry::get_manifest`].
#[derive(Debug, Clone)]
pub enum Manifest {
    V1(ManifestV1),
    V2(ManifestV2),
}

/// A v2 distribution registry client. `hostname` is the base URL
/// (`https://registry-1.docker.io`, `http://localhost:5000`, ...); `authentication` is
/// an optional [`Authenticator`] wrapped in a TTL-bucketed single-flight cache.
pub struct Registry {
    hostname: String,
    http: reqwest::Client,
    auth: AuthCache,
}

impl Registry {
    pub fn new(hostname: impl Into<String>, authentication: Option<Arc<dyn Authenticator>>) -> Self {
        Self::with_ttl(hostname, authentication, 60)
    }

    pub fn with_ttl(
        hostname: impl Into<String>,
        authentication: Option<Arc<dyn Authenticator>>,
        ttl: u64,
    ) -> Self {
        Registry {
            hostname: hostname.into(),
            http: reqwest::Client::new(),
            auth: AuthCache::new(authentication, ttl),
        }
    }

    /// Same construction, but with a per-call request timeout applied to the underlying
    /// transport (spec §5: cancellation/timeouts are delegated to the HTTP transport).
    pub fn with_timeout(
        hostname: impl Into<String>,
        authentication: Option<Arc<dyn Authenticator>>,
        ttl: u64,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::ClientBuilder::new().timeout(timeout).build()?;
        Ok(Registry {
            hostname: hostname.into(),
            http,
            auth: AuthCache::new(authentication, ttl),
        })
    }

    /// Resolves `path` against `hostname`, attaches auth headers for `(image, action)`
    /// when given, merges in `extra_headers`, and dispatches `method`. Returns the raw
    /// response; callers decide how to interpret non-2xx statuses.
    async fn request(
        &self,
        path: &str,
        method: Method,
        extra_headers: HeaderMap,
        query: &[(&str, String)],
        body: Option<Vec<u8>>,
        image: Option<&str>,
        action: Option<&str>,
    ) -> Result<Response> {
        let url = format!("{}{}", self.hostname, path);
        let mut request = self.http.request(method, &url);

        if let (Some(image), Some(action)) = (image, action) {
            let auth_headers = self.auth.headers(image, action).await?;
            request = request.headers(auth_headers);
        }
        request = request.headers(extra_headers);

        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        Ok(request.send().await?)
    }

    fn header_map(pairs: &[(HeaderName, &str)]) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(
                name.clone(),
                HeaderValue::from_str(value).map_err(|e| RegistryError::Format(e.to_string()))?,
            );
        }
        Ok(headers)
    }

    async fn require_success(response: Response, context: &str) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.bytes().await.unwrap_or_default();
        let message = RegistryErrorBody::parse(&body, status)
            .and_then(|b| b.errors.into_iter().next())
            .map(|e| e.message)
            .unwrap_or_else(|| String::from_utf8_lossy(&body).to_string());
        Err(RegistryError::protocol(context, status, message))
    }

    /// `GET /v2/`: returns whether the registry considers us authenticated, never
    /// raises.
    pub async fn authenticated(&self) -> Result<bool> {
        let response = self
            .request("/v2/", Method::GET, HeaderMap::new(), &[], None, None, None)
            .await?;
        Ok(response.status().as_u16() != 401)
    }

    fn manifest_media_type(version: ManifestVersion) -> &'static str {
        match version {
            ManifestVersion::V1 => MEDIA_TYPE_MANIFEST_V1,
            ManifestVersion::V2 => MEDIA_TYPE_MANIFEST_V2,
        }
    }

    /// `GET /v2/{image}/manifests/{tag}`, parsed as the requested schema version.
    pub async fn get_manifest(&self, image: &str, tag: &str, version: ManifestVersion) -> Result<Manifest> {
        let headers = Self::header_map(&[(ACCEPT, Self::manifest_media_type(version))])?;
        let response = self
            .request(
                &format!("/v2/{}/manifests/{}", image, tag),
                Method::GET,
                headers,
                &[],
                None,
                Some(image),
                Some("pull"),
            )
            .await?;
        let response = Self::require_success(response, "get manifest").await?;
        let bytes = response.bytes().await?;
        match version {
            ManifestVersion::V1 => Ok(Manifest::V1(serde_json::from_slice(&bytes)?)),
            ManifestVersion::V2 => Ok(Manifest::V2(serde_json::from_slice(&bytes)?)),
        }
    }

    async fn get_manifest_v2(&self, image: &str, tag: &str) -> Result<ManifestV2> {
        match self.get_manifest(image, tag, ManifestVersion::V2).await? {
            Manifest::V2(manifest) => Ok(manifest),
            Manifest::V1(_) => Err(RegistryError::Format(
                "registry returned a v1 manifest for a v2 request".to_string(),
            )),
        }
    }

    /// `HEAD /v2/{image}/manifests/{tag}`: returns the `Docker-Content-Digest` header.
    pub async fn get_manifest_digest(&self, image: &str, tag: &str) -> Result<String> {
        let headers = Self::header_map(&[(ACCEPT, MEDIA_TYPE_MANIFEST_V2)])?;
        let response = self
            .request(
                &format!("/v2/{}/manifests/{}", image, tag),
                Method::HEAD,
                headers,
                &[],
                None,
                Some(image),
                Some("pull"),
            )
            .await?;
        let response = Self::require_success(response, "get manifest digest").await?;
        response
            .headers()
            .get("Docker-Content-Digest")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| RegistryError::Format("response had no Docker-Content-Digest header".to_string()))
    }

    /// Fetches the v2 manifest, then its config blob, parsed as a [`Config`] document.
    pub async fn get_manifest_configuration(&self, image: &str, tag: &str) -> Result<Config> {
        let manifest = self.get_manifest_v2(image, tag).await?;
        let config_bytes = self.get_blob(image, &manifest.config.digest).await?;
        Ok(serde_json::from_slice(&config_bytes)?)
    }

    /// `HEAD /v2/{image}/blobs/{blobsum}`: true iff the blob is present.
    pub async fn check_blob(&self, image: &str, blobsum: &str) -> Result<bool> {
        let response = self
            .request(
                &format!("/v2/{}/blobs/{}", image, blobsum),
                Method::HEAD,
                HeaderMap::new(),
                &[],
                None,
                Some(image),
                Some("pull"),
            )
            .await?;
        Ok(response.status().as_u16() == 200)
    }

    /// `GET /v2/{image}/blobs/{blobsum}`: raw bytes, gzip retained for layer blobs.
    pub async fn get_blob(&self, image: &str, blobsum: &str) -> Result<Vec<u8>> {
        let response = self
            .request(
                &format!("/v2/{}/blobs/{}", image, blobsum),
                Method::GET,
                HeaderMap::new(),
                &[],
                None,
                Some(image),
                Some("pull"),
            )
            .await?;
        let response = Self::require_success(response, "get blob").await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// `POST /v2/{image}/blobs/uploads/`: returns the upload location's path and query
    /// parameters, parsed out of the `Location` header.
    async fn begin_upload(&self, image: &str) -> Result<(String, HashMap<String, String>)> {
        let response = self
            .request(
                &format!("/v2/{}/blobs/uploads/", image),
                Method::POST,
                HeaderMap::new(),
                &[],
                None,
                Some(image),
                Some("push"),
            )
            .await?;
        let response = Self::require_success(response, "begin blob upload").await?;
        let location = response
            .headers()
            .get("Location")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| RegistryError::Format("upload response had no Location header".to_string()))?
            .to_string();

        let parsed = if location.starts_with("http://") || location.starts_with("https://") {
            url::Url::parse(&location)?
        } else {
            url::Url::parse(&self.hostname)?.join(&location)?
        };
        let path = parsed.path().to_string();
        let query = parsed
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Ok((path, query))
    }

    /// Begins an upload then `PUT`s `data` to it with `?digest=sha256:<checksum>`.
    pub async fn upload_blob(&self, image: &str, data: Vec<u8>, checksum: &str) -> Result<()> {
        let (path, mut query) = self.begin_upload(image).await?;
        query.insert("digest".to_string(), format!("sha256:{}", checksum));
        let query_pairs: Vec<(&str, String)> =
            query.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();

        let headers = Self::header_map(&[(CONTENT_TYPE, "application/octet-stream")])?;
        let response = self
            .request(&path, Method::PUT, headers, &query_pairs, Some(data), Some(image), Some("push"))
            .await?;
        Self::require_success(response, "upload blob").await?;
        Ok(())
    }

    /// If the config blob isn't already present, uploads it; then `PUT`s the manifest.
    pub async fn upload_manifest(
        &self,
        image: &str,
        tag: &str,
        config_bytes: Vec<u8>,
        config_digest: &str,
        manifest_bytes: Vec<u8>,
    ) -> Result<()> {
        let config_blob_digest = format!("sha256:{}", config_digest);
        if !self.check_blob(image, &config_blob_digest).await? {
            self.upload_blob(image, config_bytes, config_digest).await?;
        }

        let headers = Self::header_map(&[(CONTENT_TYPE, MEDIA_TYPE_MANIFEST_V2)])?;
        let response = self
            .request(
                &format!("/v2/{}/manifests/{}", image, tag),
                Method::PUT,
                headers,
                &[],
                Some(manifest_bytes),
                Some(image),
                Some("push"),
            )
            .await?;
        Self::require_success(response, "upload manifest").await?;
        Ok(())
    }

    /// `GET /v2/_catalog`: the registry's repository list.
    pub async fn list_images(&self, n: Option<u32>, last: Option<&str>) -> Result<Vec<String>> {
        let mut query = Vec::new();
        if let Some(n) = n {
            query.push(("n", n.to_string()));
        }
        if let Some(last) = last {
            query.push(("last", last.to_string()));
        }
        let response = self
            .request("/v2/_catalog", Method::GET, HeaderMap::new(), &query, None, None, None)
            .await?;
        let response = Self::require_success(response, "list images").await?;
        let parsed: CatalogResponse = response.json().await?;
        Ok(parsed.repositories)
    }

    /// `GET /v2/{image}/tags/list`: may return `None` when the registry reports `tags:
    /// null` (e.g. immediately after the last tag was deleted).
    pub async fn list_image_tags(
        &self,
        image: &str,
        n: Option<u32>,
        last: Option<&str>,
    ) -> Result<Option<Vec<String>>> {
        let mut query = Vec::new();
        if let Some(n) = n {
            query.push(("n", n.to_string()));
        }
        if let Some(last) = last {
            query.push(("last", last.to_string()));
        }
        let response = self
            .request(
                &format!("/v2/{}/tags/list", image),
                Method::GET,
                HeaderMap::new(),
                &query,
                None,
                Some(image),
                Some("pull"),
            )
            .await?;
        let response = Self::require_success(response, "list image tags").await?;
        let parsed: TagsResponse = response.json().await?;
        Ok(parsed.tags)
    }

    /// Resolves the manifest digest, then `DELETE`s the manifest by digest.
    pub async fn delete_image(&self, image: &str, tag: &str) -> Result<()> {
        let digest = self.get_manifest_digest(image, tag).await?;
        let response = self
            .request(
                &format!("/v2/{}/manifests/{}", image, digest),
                Method::DELETE,
                HeaderMap::new(),
                &[],
                None,
                Some(image),
                Some("push"),
            )
            .await?;
        Self::require_success(response, "delete image").await?;
        Ok(())
    }

    /// Pulls `image:tag`. In lazy mode, no layer blob is fetched until its content is
    /// actually read; in eager mode every layer is fetched and gunzipped immediately.
    ///
    /// `Config.rootfs.diff_ids` and `manifest.layers` are walked in reverse (base-first
    /// input, top-first output) so each layer's `parent` is set to the id of the layer
    /// that precedes it on disk.
    pub async fn pull_image(&self, image: &str, tag: &str, lazy: bool) -> Result<Image> {
        let manifest = self.get_manifest_v2(image, tag).await?;
        let config_bytes = self.get_blob(image, &manifest.config.digest).await?;
        let config: Config = serde_json::from_slice(&config_bytes)?;

        if config.rootfs.diff_ids.len() != manifest.layers.len() {
            return Err(RegistryError::Format(format!(
                "config.rootfs.diff_ids has {} entries but manifest.layers has {}",
                config.rootfs.diff_ids.len(),
                manifest.layers.len()
            )));
        }

        let mut layers = Vec::with_capacity(manifest.layers.len());
        let mut parent: Option<String> = None;

        for (diff_id, mlayer) in config
            .rootfs
            .diff_ids
            .iter()
            .rev()
            .zip(manifest.layers.iter().rev())
        {
            let checksum = digest::strip_digest_prefix(diff_id).to_string();
            let compressed_checksum = digest::strip_digest_prefix(&mlayer.digest).to_string();
            let compressed_size = mlayer.size;
            let metadata = LayerMetadata {
                architecture: Some(config.architecture.clone()),
                os: Some(config.os.clone()),
                created: Some(config.created.clone()),
                author: None,
                config: Some(config.config.clone()),
            };

            let layer = if lazy {
                let image_name = image.to_string();
                let blob_digest = mlayer.digest.clone();
                let fetcher = LazyFetcher {
                    http: self.http.clone(),
                    hostname: self.hostname.clone(),
                    auth_headers: self.auth.headers(image, "pull").await?,
                };
                Layer::from_lazy(
                    checksum.clone(),
                    parent.clone(),
                    checksum.clone(),
                    compressed_checksum,
                    compressed_size,
                    metadata,
                    move || async move { fetcher.fetch(&image_name, &blob_digest).await },
                )
            } else {
                let compressed = self.get_blob(image, &mlayer.digest).await?;
                let actual_compressed = digest::sha256_hex(&compressed);
                if actual_compressed != compressed_checksum {
                    return Err(RegistryError::Integrity {
                        expected: compressed_checksum,
                        actual: actual_compressed,
                    });
                }
                let content = digest::gunzip(&compressed)?;
                let actual_checksum = digest::sha256_hex(&content);
                if actual_checksum != checksum {
                    return Err(RegistryError::Integrity {
                        expected: checksum,
                        actual: actual_checksum,
                    });
                }
                Layer::from_known(
                    checksum.clone(),
                    parent.clone(),
                    content,
                    checksum.clone(),
                    compressed_checksum,
                    compressed_size,
                    metadata,
                )
            };

            parent = Some(checksum);
            layers.insert(0, layer);
        }

        Ok(Image::with_layers(image, tag, layers))
    }

    /// Pushes every layer whose compressed blob isn't already present, then the
    /// manifest. Blob-existence checks and uploads for distinct layers may run
    /// concurrently (spec §5: "MAY parallelize blob uploads across layers"); all of
    /// them complete before the manifest `PUT`. A layer whose content is a thunk and
    /// whose blob is already present is never forced.
    pub async fn push_image(&self, image: &Image) -> Result<()> {
        let uploads = image.layers_top_first().iter().map(|layer| async move {
            let compressed_checksum = layer.compressed_checksum().await?;
            let blob_digest = format!("sha256:{}", compressed_checksum);
            if self.check_blob(&image.name, &blob_digest).await? {
                return Ok::<(), RegistryError>(());
            }
            let compressed = layer.compressed_content().await?;
            self.upload_blob(&image.name, (*compressed).clone(), &compressed_checksum)
                .await
        });
        try_join_all(uploads).await?;

        let bundle = image.manifest_v2().await?;
        self.upload_manifest(
            &image.name,
            &image.tag,
            bundle.config_bytes,
            &bundle.config_digest,
            bundle.manifest_bytes,
        )
        .await
    }
}

/// The pieces a lazy-pulled layer's thunk needs to fetch its own blob, without holding a
/// borrow of the `Registry` that pulled it. Returns the blob's raw (compressed) bytes,
/// `Layer::from_lazy` gunzips them itself the first time `.content()` is asked for.
struct LazyFetcher {
    http: reqwest::Client,
    hostname: String,
    auth_headers: HeaderMap,
}

impl LazyFetcher {
    async fn fetch(&self, image: &str, blob_digest: &str) -> Result<Vec<u8>> {
        let url = format!("{}/v2/{}/blobs/{}", self.hostname, image, blob_digest);
        let response = self
            .http
            .get(&url)
            .headers(self.auth_headers.clone())
            .send()
            .await?;
        let response = Registry::require_success(response, "get blob (lazy)").await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[derive(serde::Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    repositories: Vec<String>,
}

#[derive(serde::Deserialize)]
struct TagsResponse {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_media_types_match_spec() {
        assert_eq!(
            Registry::manifest_media_type(ManifestVersion::V1),
            MEDIA_TYPE_MANIFEST_V1
        );
        assert_eq!(
            Registry::manifest_media_type(ManifestVersion::V2),
            MEDIA_TYPE_MANIFEST_V2
        );
    }
}
