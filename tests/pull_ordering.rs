//! Pulls a two-layer image from a mocked v2 registry and checks that both the eager and
//! lazy paths produce the same base-first-input -> top-first-output layer chain, with
//! `parent` links set correctly in both directions.

use ferroxide::registry::Registry;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use std::io::Write;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Stands up a mock registry serving one v2 manifest, one config blob, and two layer
/// blobs ("base" and "top") for `library/demo:latest`.
async fn mock_two_layer_registry() -> (MockServer, String, String) {
    let base_tar = b"base-layer-contents".to_vec();
    let top_tar = b"top-layer-contents".to_vec();
    let base_gz = gzip(&base_tar);
    let top_gz = gzip(&top_tar);

    let base_diff_id = format!("sha256:{}", sha256_hex(&base_tar));
    let top_diff_id = format!("sha256:{}", sha256_hex(&top_tar));
    let base_blob_digest = format!("sha256:{}", sha256_hex(&base_gz));
    let top_blob_digest = format!("sha256:{}", sha256_hex(&top_gz));

    let config_doc = serde_json::json!({
        "architecture": "amd64",
        "os": "linux",
        "config": {},
        "container_config": {},
        "created": "2020-01-01T00:00:00Z",
        "docker_version": "",
        "history": [],
        "rootfs": {
            "type": "layers",
            "diff_ids": [base_diff_id, top_diff_id],
        },
    });
    let config_bytes = serde_json::to_vec(&config_doc).unwrap();
    let config_digest = format!("sha256:{}", sha256_hex(&config_bytes));

    let manifest = serde_json::json!({
        "schemaVersion": 2,
        "mediaType": "application/vnd.docker.distribution.manifest.v2+json",
        "config": {
            "mediaType": "application/vnd.docker.container.image.v1+json",
            "size": config_bytes.len(),
            "digest": config_digest,
        },
        "layers": [
            {
                "mediaType": "application/vnd.docker.image.rootfs.diff.tar.gzip",
                "size": base_gz.len(),
                "digest": base_blob_digest,
            },
            {
                "mediaType": "application/vnd.docker.image.rootfs.diff.tar.gzip",
                "size": top_gz.len(),
                "digest": top_blob_digest,
            },
        ],
    });

    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/library/demo/manifests/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&manifest))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/v2/library/demo/blobs/{}", config_digest)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(config_bytes.clone()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/v2/library/demo/blobs/{}", base_blob_digest)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(base_gz.clone()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/v2/library/demo/blobs/{}", top_blob_digest)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(top_gz.clone()))
        .mount(&server)
        .await;

    (server, base_diff_id, top_diff_id)
}

#[tokio::test]
async fn eager_pull_orders_layers_top_first_with_correct_parents() {
    let (server, base_diff_id, top_diff_id) = mock_two_layer_registry().await;
    let registry = Registry::new(server.uri(), None);

    let image = registry.pull_image("library/demo", "latest", false).await.unwrap();
    let layers = image.layers_top_first();
    assert_eq!(layers.len(), 2);

    let base_checksum = ferroxide::digest::strip_digest_prefix(&base_diff_id).to_string();
    let top_checksum = ferroxide::digest::strip_digest_prefix(&top_diff_id).to_string();

    assert_eq!(layers[1].id, base_checksum);
    assert_eq!(layers[0].id, top_checksum);
    assert_eq!(layers[1].parent, None);
    assert_eq!(layers[0].parent.as_deref(), Some(base_checksum.as_str()));

    assert_eq!(layers[1].content().await.unwrap().as_slice(), b"base-layer-contents");
    assert_eq!(layers[0].content().await.unwrap().as_slice(), b"top-layer-contents");
}

#[tokio::test]
async fn lazy_pull_matches_eager_pull_without_forcing_content_up_front() {
    let (server, ..) = mock_two_layer_registry().await;
    let registry = Registry::new(server.uri(), None);

    let image = registry.pull_image("library/demo", "latest", true).await.unwrap();
    let layers = image.layers_top_first();
    assert_eq!(layers.len(), 2);

    assert!(!layers[0].content_resolved().await);
    assert!(!layers[1].content_resolved().await);

    assert_eq!(layers[1].content().await.unwrap().as_slice(), b"base-layer-contents");
    assert_eq!(layers[0].content().await.unwrap().as_slice(), b"top-layer-contents");
    assert_eq!(layers[0].parent.as_deref(), Some(layers[1].id.as_str()));
}
