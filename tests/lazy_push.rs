//! Pushing an image never forces a lazily-pulled layer's content when the registry
//! already has that layer's blob: `push_image` must check before it forces.

use ferroxide::image::{Image, Layer, LayerMetadata};
use ferroxide::registry::Registry;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn checksum64(byte: u8) -> String {
    std::iter::repeat(format!("{:02x}", byte)).take(32).collect()
}

/// A layer whose thunk panics if ever forced, paired with a pre-known identity. Stands
/// in for a lazily pulled layer being re-pushed to a registry that already has its blob.
fn layer_with_known_identity_and_panicking_thunk(id: &str, parent: Option<String>) -> Layer {
    let checksum = id.to_string();
    let compressed_checksum = id.to_string();
    Layer::from_lazy(
        id.to_string(),
        parent,
        checksum,
        compressed_checksum,
        123,
        LayerMetadata::default(),
        || async { panic!("layer content forced despite blob already present on registry") },
    )
}

#[tokio::test]
async fn push_skips_upload_and_never_forces_content_when_blob_already_present() {
    let server = MockServer::start().await;

    let layer_id = checksum64(0xaa);
    let layer = layer_with_known_identity_and_panicking_thunk(&layer_id, None);
    let image = Image::with_layers("library/demo", "latest", vec![layer]);

    // HEAD on the blob always succeeds: the registry already has it.
    Mock::given(method("HEAD"))
        .and(path_regex(r"^/v2/library/demo/blobs/.*$"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    // Config blob also already present.
    Mock::given(method("PUT"))
        .and(path("/v2/library/demo/manifests/latest"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let registry = Registry::new(server.uri(), None);
    registry.push_image(&image).await.unwrap();
}

#[tokio::test]
async fn push_uploads_blob_when_missing_then_puts_manifest() {
    let server = MockServer::start().await;

    let layer = Layer::from_content(
        checksum64(0xbb),
        None,
        b"fresh layer content".to_vec(),
        LayerMetadata::default(),
    );
    let image = Image::with_layers("library/demo", "latest", vec![layer]);

    Mock::given(method("HEAD"))
        .and(path_regex(r"^/v2/library/demo/blobs/.*$"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v2/library/demo/blobs/uploads/"))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Location", "/v2/library/demo/blobs/uploads/abc123"),
        )
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path_regex(r"^/v2/library/demo/blobs/uploads/abc123$"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/v2/library/demo/manifests/latest"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let registry = Registry::new(server.uri(), None);
    registry.push_image(&image).await.unwrap();
}
