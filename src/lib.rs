//! ferroxide
//!
//! A client library for OCI/Docker container images: building, inspecting,
//! transferring, and serializing them against a v2 distribution registry.
//!
//! ## Modules
//! - [`schema`]: typed manifest/config/error records and canonical JSON serialization.
//! - [`tarcodec`]: the legacy "docker save" v1 archive codec and layer-tar builders.
//! - [`image`]: the in-memory `Image`/`Layer` model: layer chains, lazy content,
//!   manifest assembly.
//! - [`registry`]: the v2 registry client: auth, pull (eager or lazy), push, delete,
//!   catalog/tag listing.
//! - [`config`]: credential loading and registry reference parsing.
//! - [`logging`]: the ambient output surface, silent by default for library use.
//! - [`cli`]: a thin command-line shell over the above.
//!
//! ## Example
//!
//! ```no_run
//! # async fn example() -> ferroxide::error::Result<()> {
//! use ferroxide::image::Image;
//! use ferroxide::registry::Registry;
//!
//! let registry = Registry::new("https://registry-1.docker.io", None);
//! let image = registry.pull_image("library/busybox", "latest", true).await?;
//! image.write_filename("busybox.tar", "v1").await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod digest;
pub mod error;
pub mod image;
pub mod logging;
pub mod registry;
pub mod schema;
pub mod tarcodec;

pub use config::AuthConfig;
pub use error::{RegistryError, Result};
pub use image::{Image, Layer};
pub use registry::Registry;
