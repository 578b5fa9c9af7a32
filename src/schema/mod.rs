//! Typed manifest/config/error records and the canonical JSON serializer that turns any
//! of them into the bytes that get hashed and transmitted.

pub mod canonical;
pub mod config_doc;
pub mod manifest;
pub mod registry_error;

pub use canonical::to_canonical_bytes;
pub use config_doc::{Config, ConfigConfig, ConfigHistory, ConfigRootFS};
pub use manifest::{
    ManifestV1, ManifestV1History, ManifestV1Layer, ManifestV2, ManifestV2Descriptor,
    MEDIA_TYPE_CONFIG, MEDIA_TYPE_LAYER, MEDIA_TYPE_MANIFEST_V1, MEDIA_TYPE_MANIFEST_V2,
};
pub use registry_error::{RegistryErrorBody, RegistryErrorCode, RegistryErrorEntry};
