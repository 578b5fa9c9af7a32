//! Assembles the v2 manifest/config pair from an [`Image`]'s layer chain.

use super::Image;
use crate::error::Result;
use crate::schema::canonical::to_canonical_bytes;
use crate::schema::config_doc::{Config, ConfigHistory};
use crate::schema::manifest::{
    ManifestV2, ManifestV2Descriptor, MEDIA_TYPE_CONFIG, MEDIA_TYPE_LAYER,
};
use crate::digest::sha256_hex;

/// The four byte/digest pairs a push uploads: the config blob and its digest, and the
/// manifest document and its own digest (computed over the manifest bytes themselves).
pub struct ManifestBundle {
    pub manifest_bytes: Vec<u8>,
    pub manifest_digest: String,
    pub config_bytes: Vec<u8>,
    pub config_digest: String,
}

impl Image {
    /// Builds the image configuration document: one [`ConfigHistory`] entry and one
    /// `rootfs.diff_ids` entry per layer, base-first. `architecture`/`os`/`created` are
    /// inherited from the top (newest) layer's metadata when present.
    pub async fn build_config_document(&self) -> Result<(Config, Vec<u8>, String)> {
        let mut config = Config::default();
        if let Some(top) = self.layers_top_first().first() {
            if let Some(architecture) = &top.architecture {
                config.architecture = architecture.clone();
            }
            if let Some(os) = &top.os {
                config.os = os.clone();
            }
            if let Some(created) = &top.created {
                config.created = created.clone();
            }
            if let Some(layer_config) = &top.config {
                config.config = layer_config.clone();
                config.container_config = layer_config.clone();
            }
        }

        for layer in self.layers_base_first() {
            let checksum = layer.checksum().await?;
            config.rootfs.diff_ids.push(format!("sha256:{}", checksum));
            config.history.push(ConfigHistory {
                created: layer.created.clone().unwrap_or_else(|| config.created.clone()),
                created_by: None,
            });
        }

        let config_bytes = to_canonical_bytes(&config)?;
        let config_digest = sha256_hex(&config_bytes);
        Ok((config, config_bytes, config_digest))
    }

    /// Assembles the `(manifest_bytes, manifest_digest, config_bytes, config_digest)`
    /// bundle a push uploads. Every size/digest in the manifest refers to the
    /// *compressed* form of its layer.
    pub async fn manifest_v2(&self) -> Result<ManifestBundle> {
        let (_config, config_bytes, config_digest) = self.build_config_document().await?;

        let mut layer_descriptors = Vec::with_capacity(self.layers_top_first().len());
        for layer in self.layers_base_first() {
            let compressed_size = layer.compressed_size().await?;
            let compressed_checksum = layer.compressed_checksum().await?;
            layer_descriptors.push(ManifestV2Descriptor {
                media_type: MEDIA_TYPE_LAYER.to_string(),
                size: compressed_size,
                digest: format!("sha256:{}", compressed_checksum),
            });
        }

        let manifest = ManifestV2::new(
            ManifestV2Descriptor {
                media_type: MEDIA_TYPE_CONFIG.to_string(),
                size: config_bytes.len() as u64,
                digest: format!("sha256:{}", config_digest),
            },
            layer_descriptors,
        );

        let manifest_bytes = to_canonical_bytes(&manifest)?;
        let manifest_digest = sha256_hex(&manifest_bytes);

        Ok(ManifestBundle {
            manifest_bytes,
            manifest_digest,
            config_bytes,
            config_digest,
        })
    }
}
