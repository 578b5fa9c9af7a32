//! Manifest v1 and v2 records (Docker distribution schemas 1 and 2).

use serde::{Deserialize, Serialize};

/// A single `history` entry in a v1 manifest: an embedded v1-compatibility JSON blob,
/// carried as an opaque string rather than parsed further.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestV1History {
    #[serde(rename = "v1Compatibility")]
    pub v1_compatibility: String,
}

/// A `fsLayers` entry in a v1 manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestV1Layer {
    #[serde(rename = "blobSum")]
    pub blob_sum: String,
}

/// `application/vnd.docker.distribution.manifest.v1+json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestV1 {
    pub name: String,
    pub tag: String,
    pub architecture: String,
    #[serde(rename = "fsLayers")]
    pub fs_layers: Vec<ManifestV1Layer>,
    pub history: Vec<ManifestV1History>,
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
}

/// A content descriptor shared by `ManifestV2::config` and each entry of
/// `ManifestV2::layers`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestV2Descriptor {
    #[serde(rename = "mediaType")]
    pub media_type: String,
    pub size: u64,
    pub digest: String,
}

pub const MEDIA_TYPE_CONFIG: &str = "application/vnd.docker.container.image.v1+json";
pub const MEDIA_TYPE_LAYER: &str = "application/vnd.docker.image.rootfs.diff.tar.gzip";
pub const MEDIA_TYPE_MANIFEST_V1: &str = "application/vnd.docker.distribution.manifest.v1+json";
pub const MEDIA_TYPE_MANIFEST_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";

/// `application/vnd.docker.distribution.manifest.v2+json`. `layers` is base-first,
/// parallel to a [`super::config_doc::ConfigRootFS::diff_ids`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestV2 {
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
    #[serde(rename = "mediaType")]
    pub media_type: String,
    pub config: ManifestV2Descriptor,
    pub layers: Vec<ManifestV2Descriptor>,
}

impl ManifestV2 {
    pub fn new(config: ManifestV2Descriptor, layers: Vec<ManifestV2Descriptor>) -> Self {
        ManifestV2 {
            schema_version: 2,
            media_type: MEDIA_TYPE_MANIFEST_V2.to_string(),
            config,
            layers,
        }
    }
}
