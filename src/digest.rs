//! SHA-256 digest and gzip helpers shared by the image model and tar codec.
//!
//! Every digest this crate computes is a plain lowercase hex SHA-256, written either
//! bare (diffID storage, archive ids) or prefixed `sha256:` (registry/manifest wire
//! format). Keeping the two forms in separate functions avoids the copy-paste prefix
//! bugs that show up when callers improvise `format!("sha256:{}", ...)` ad hoc.

use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use std::io::Write;

/// Lowercase hex SHA-256 of `data`, no prefix.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// `sha256:<hex>` as used in manifests, config `rootfs.diff_ids`, and blob URLs.
pub fn sha256_digest(data: &[u8]) -> String {
    format!("sha256:{}", sha256_hex(data))
}

/// Strips a leading `sha256:` prefix, if any, returning the bare hex digest.
pub fn strip_digest_prefix(digest: &str) -> &str {
    digest.strip_prefix("sha256:").unwrap_or(digest)
}

/// Gzip-compresses `data` with the mtime field forced to 0, so that compressing the
/// same bytes twice always produces the same blob digest (determinism contract).
pub fn gzip_compress_deterministic(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    let mut compressed = encoder.finish()?;
    zero_gzip_mtime(&mut compressed);
    Ok(compressed)
}

/// The gzip mtime lives at a fixed byte offset (bytes 4..8) of the 10-byte header.
/// Zeroing it directly after compression is simpler and more robust across flate2
/// versions than relying on the encoder's default never changing upstream.
fn zero_gzip_mtime(compressed: &mut [u8]) {
    if compressed.len() >= 8 {
        compressed[4..8].copy_from_slice(&[0, 0, 0, 0]);
    }
}

/// Decompresses a gzip stream produced by [`gzip_compress_deterministic`] or any
/// standard gzip encoder.
pub fn gunzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    use flate2::read::GzDecoder;
    use std::io::Read;

    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// A fresh 32-byte random id, hex-encoded, used for layer ids when the caller doesn't
/// supply one (`base_id`) on a path that doesn't claim determinism.
pub fn random_id_hex() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
