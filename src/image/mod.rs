//! The in-memory `Image`/`Layer` model: an ordered layer chain plus the operations that
//! build, inspect, and serialize it.

pub mod content;
pub mod manifest;

use crate::digest;
use crate::error::{RegistryError, Result};
use crate::schema::config_doc::ConfigConfig;
use crate::tarcodec;
use content::LazyBytes;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// A single content-addressed filesystem layer.
///
/// `content` (the uncompressed tar, "diff") and `compressed_content` (gzip of that tar,
/// mtime forced to zero) are each a [`LazyBytes`]: for a layer built locally both are
/// known immediately or cheaply derived, for a lazily pulled layer both are thunks that
/// hit the network on first use. `checksum`, `compressed_checksum`, and
/// `compressed_size` are filled in immediately for any layer whose identity is already
/// known (parsed from an archive, pulled from a registry) so reading them never forces
/// a thunk; for a layer built fresh from content they're computed, and cached, on first
/// access.
pub struct Layer {
    pub id: String,
    pub parent: Option<String>,
    pub architecture: Option<String>,
    pub os: Option<String>,
    pub created: Option<String>,
    pub author: Option<String>,
    pub config: Option<ConfigConfig>,
    content: LazyBytes,
    compressed_content: LazyBytes,
    checksum: OnceCell<String>,
    compressed_checksum: OnceCell<String>,
    compressed_size: OnceCell<u64>,
}

/// Metadata carried by a layer but not derivable from its bytes.
#[derive(Debug, Clone, Default)]
pub struct LayerMetadata {
    pub architecture: Option<String>,
    pub os: Option<String>,
    pub created: Option<String>,
    pub author: Option<String>,
    pub config: Option<ConfigConfig>,
}

impl Layer {
    /// Builds a layer from known uncompressed bytes. `compressed_content` and every
    /// checksum are derived lazily the first time something asks for them.
    pub fn from_content(
        id: String,
        parent: Option<String>,
        content_bytes: Vec<u8>,
        metadata: LayerMetadata,
    ) -> Self {
        let content = LazyBytes::from_bytes(content_bytes);
        let content_for_gzip = content.clone();
        let compressed_content = LazyBytes::from_thunk(move || async move {
            let bytes = content_for_gzip.force().await?;
            Ok(digest::gzip_compress_deterministic(&bytes)?)
        });
        Layer {
            id,
            parent,
            architecture: metadata.architecture,
            os: metadata.os,
            created: metadata.created,
            author: metadata.author,
            config: metadata.config,
            content,
            compressed_content,
            checksum: OnceCell::new(),
            compressed_checksum: OnceCell::new(),
            compressed_size: OnceCell::new(),
        }
    }

    /// Builds a layer whose identity (checksum, compressed checksum, compressed size)
    /// is already known, from a parsed archive or a registry manifest, paired with
    /// eager content bytes.
    pub fn from_known(
        id: String,
        parent: Option<String>,
        content_bytes: Vec<u8>,
        checksum: String,
        compressed_checksum: String,
        compressed_size: u64,
        metadata: LayerMetadata,
    ) -> Self {
        let mut layer = Self::from_content(id, parent, content_bytes, metadata);
        layer.checksum = OnceCell::new_with(Some(checksum));
        layer.compressed_checksum = OnceCell::new_with(Some(compressed_checksum));
        layer.compressed_size = OnceCell::new_with(Some(compressed_size));
        layer
    }

    /// Builds a layer whose bytes are not yet fetched: `fetch_compressed` is called at
    /// most once, on whichever of `content()`/`compressed_content()` is asked for first.
    pub fn from_lazy<F, Fut>(
        id: String,
        parent: Option<String>,
        checksum: String,
        compressed_checksum: String,
        compressed_size: u64,
        metadata: LayerMetadata,
        fetch_compressed: F,
    ) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<Vec<u8>>> + Send + 'static,
    {
        let expected_compressed_checksum = compressed_checksum.clone();
        let compressed_content = LazyBytes::from_thunk(move || async move {
            let bytes = fetch_compressed().await?;
            let actual = digest::sha256_hex(&bytes);
            if actual != expected_compressed_checksum {
                return Err(RegistryError::Integrity {
                    expected: expected_compressed_checksum,
                    actual,
                });
            }
            Ok(bytes)
        });
        let compressed_for_content = compressed_content.clone();
        let expected_checksum = checksum.clone();
        let content = LazyBytes::from_thunk(move || async move {
            let compressed = compressed_for_content.force().await?;
            let bytes = digest::gunzip(&compressed)?;
            let actual = digest::sha256_hex(&bytes);
            if actual != expected_checksum {
                return Err(RegistryError::Integrity {
                    expected: expected_checksum,
                    actual,
                });
            }
            Ok(bytes)
        });
        Layer {
            id,
            parent,
            architecture: metadata.architecture,
            os: metadata.os,
            created: metadata.created,
            author: metadata.author,
            config: metadata.config,
            content,
            compressed_content,
            checksum: OnceCell::new_with(Some(checksum)),
            compressed_checksum: OnceCell::new_with(Some(compressed_checksum)),
            compressed_size: OnceCell::new_with(Some(compressed_size)),
        }
    }

    pub async fn content(&self) -> Result<Arc<Vec<u8>>> {
        self.content.force().await
    }

    pub async fn compressed_content(&self) -> Result<Arc<Vec<u8>>> {
        self.compressed_content.force().await
    }

    /// True once content has been fetched/computed, without forcing it.
    pub async fn content_resolved(&self) -> bool {
        self.content.is_resolved().await
    }

    pub async fn compressed_content_resolved(&self) -> bool {
        self.compressed_content.is_resolved().await
    }

    /// `SHA-256(content)`, the diffID.
    pub async fn checksum(&self) -> Result<String> {
        self.checksum
            .get_or_try_init(|| async {
                let bytes = self.content().await?;
                Ok::<_, RegistryError>(digest::sha256_hex(&bytes))
            })
            .await
            .cloned()
    }

    /// `SHA-256(gzip(content, mtime=0))`, the registry blob digest.
    pub async fn compressed_checksum(&self) -> Result<String> {
        self.compressed_checksum
            .get_or_try_init(|| async {
                let bytes = self.compressed_content().await?;
                Ok::<_, RegistryError>(digest::sha256_hex(&bytes))
            })
            .await
            .cloned()
    }

    /// `len(compressed_content)`, never `len(content)`.
    pub async fn compressed_size(&self) -> Result<u64> {
        self.compressed_size
            .get_or_try_init(|| async {
                let bytes = self.compressed_content().await?;
                Ok::<_, RegistryError>(bytes.len() as u64)
            })
            .await
            .copied()
    }

    /// Lists the entry names inside this layer's tar, without writing a temp file.
    /// Supplemented from the original implementation's `Layer.list_files()`, dropped in
    /// the distillation but useful for inspecting a layer without materializing it.
    pub async fn list_files(&self) -> Result<Vec<String>> {
        let content = self.content().await?;
        let mut archive = tar::Archive::new(std::io::Cursor::new(content.as_slice()));
        let mut names = Vec::new();
        for entry in archive.entries()? {
            let entry = entry?;
            names.push(entry.path()?.to_string_lossy().to_string());
        }
        Ok(names)
    }
}

/// An ordered layer chain plus `(name, tag)`. Layers are stored top-first: index 0 is
/// the newest. Wire formats (v1 archive, v2 manifest) want base-first; use
/// [`Image::layers_base_first`] at every serialization boundary rather than reversing
/// ad hoc, so the rule lives in one place.
pub struct Image {
    pub name: String,
    pub tag: String,
    layers: Vec<Layer>,
}

impl Image {
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Image {
            name: name.into(),
            tag: tag.into(),
            layers: Vec::new(),
        }
    }

    pub fn with_layers(name: impl Into<String>, tag: impl Into<String>, layers: Vec<Layer>) -> Self {
        Image {
            name: name.into(),
            tag: tag.into(),
            layers,
        }
    }

    /// Top-first: index 0 is the newest layer.
    pub fn layers_top_first(&self) -> &[Layer] {
        &self.layers
    }

    /// Base-first: the order every wire format wants.
    pub fn layers_base_first(&self) -> Vec<&Layer> {
        self.layers.iter().rev().collect()
    }

    pub fn top_layer_id(&self) -> Option<&str> {
        self.layers.first().map(|l| l.id.as_str())
    }

    /// Appends a layer built from a single filesystem path, inserted at index 0 with
    /// `parent` set to the current top layer's id.
    pub fn add_layer_path(
        &mut self,
        path: impl AsRef<Path>,
        arcname: impl AsRef<str>,
        recursive: bool,
        base_id: Option<String>,
    ) -> Result<()> {
        let tar_bytes =
            tarcodec::layer_tar::write_tar_from_path(path.as_ref(), arcname.as_ref(), recursive, None)?;
        self.push_layer_content(tar_bytes, base_id);
        Ok(())
    }

    /// Appends a layer built from multiple `(source_path, archive_path)` pairs.
    pub fn add_layer_paths(
        &mut self,
        entries: &[(std::path::PathBuf, String)],
        base_id: Option<String>,
    ) -> Result<()> {
        let tar_bytes = tarcodec::layer_tar::write_tar_from_paths(entries, None)?;
        self.push_layer_content(tar_bytes, base_id);
        Ok(())
    }

    /// Appends a layer synthesized from in-memory `archive_path -> content` pairs.
    pub fn add_layer_contents(
        &mut self,
        contents: &[(String, Vec<u8>)],
        base_id: Option<String>,
    ) -> Result<()> {
        let tar_bytes = tarcodec::layer_tar::write_tar_from_contents(contents, None)?;
        self.push_layer_content(tar_bytes, base_id);
        Ok(())
    }

    fn push_layer_content(&mut self, tar_bytes: Vec<u8>, base_id: Option<String>) {
        let id = base_id.unwrap_or_else(digest::random_id_hex);
        let parent = self.top_layer_id().map(|s| s.to_string());
        let layer = Layer::from_content(id, parent, tar_bytes, LayerMetadata::default());
        self.layers.insert(0, layer);
    }

    /// Drops the top layer.
    pub fn remove_layer(&mut self) -> Option<Layer> {
        if self.layers.is_empty() {
            None
        } else {
            Some(self.layers.remove(0))
        }
    }

    /// Loads every image described by a v1 `docker save` archive.
    pub fn from_filename(path: impl AsRef<Path>) -> Result<Vec<Image>> {
        let bytes = std::fs::read(path)?;
        tarcodec::parse_v1(&bytes)
    }

    /// Writes this image as a v1 `docker save` archive. Only `version == "v1"` is
    /// implemented; any other value is rejected before any I/O happens.
    pub async fn write_filename(&self, path: impl AsRef<Path>, version: &str) -> Result<()> {
        if version != "v1" {
            return Err(RegistryError::Unsupported(format!(
                "image archive version '{}' is not supported",
                version
            )));
        }
        tarcodec::write_v1(self, path.as_ref()).await
    }
}
