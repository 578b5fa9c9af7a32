//! The named scenarios from spec.md §8. S1/S2 run against a synthesized archive built
//! with this crate's own tar writer rather than checked-in binary fixtures: real
//! busybox layer bytes that hash to the spec's literal digests aren't part of this
//! pack, so these assert the same shape (name, tag, layer count, checksum linkage)
//! against content this crate controls instead of the literal digest values. S3-S6 need
//! a reachable, unauthenticated v2 registry and are `#[ignore]`d, matching the teacher's
//! pattern of gating live-network tests behind an explicit opt-in.

use ferroxide::image::Image;
use ferroxide::registry::Registry;

fn busybox_shaped_image() -> Image {
    let mut image = Image::new("busybox", "latest");
    image
        .add_layer_contents(&[("bin/busybox".to_string(), b"#!/bin/sh\necho hi\n".to_vec())], None)
        .unwrap();
    image
}

#[tokio::test]
async fn s1_read_single_layer_archive() {
    let image = busybox_shaped_image();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("busybox.tar");
    image.write_filename(&path, "v1").await.unwrap();

    let mut loaded = Image::from_filename(&path).unwrap();
    assert_eq!(loaded.len(), 1);
    let loaded = loaded.pop().unwrap();

    assert_eq!(loaded.name, "busybox");
    assert_eq!(loaded.tag, "latest");
    assert_eq!(loaded.layers_top_first().len(), 1);
    // compressed_checksum is whatever this run's gzip of the synthesized content
    // hashes to, not the spec's literal busybox digest; the property under test is
    // that it round-trips, not that it equals a specific pinned value.
    let original_checksum = image.layers_top_first()[0].compressed_checksum().await.unwrap();
    let loaded_checksum = loaded.layers_top_first()[0].compressed_checksum().await.unwrap();
    assert_eq!(original_checksum, loaded_checksum);
}

#[tokio::test]
async fn s2_write_then_read_preserves_identity() {
    let image = busybox_shaped_image();
    let dir = tempfile::tempdir().unwrap();
    let first_path = dir.path().join("first.tar");
    image.write_filename(&first_path, "v1").await.unwrap();

    let mut loaded = Image::from_filename(&first_path).unwrap();
    let loaded = loaded.pop().unwrap();

    let second_path = dir.path().join("second.tar");
    loaded.write_filename(&second_path, "v1").await.unwrap();
    let mut reloaded = Image::from_filename(&second_path).unwrap();
    let reloaded = reloaded.pop().unwrap();

    assert_eq!(loaded.name, reloaded.name);
    assert_eq!(loaded.tag, reloaded.tag);
    assert_eq!(loaded.layers_top_first().len(), reloaded.layers_top_first().len());
    assert_eq!(
        loaded.layers_top_first()[0].checksum().await.unwrap(),
        reloaded.layers_top_first()[0].checksum().await.unwrap()
    );
    assert_eq!(
        loaded.layers_top_first()[0].compressed_checksum().await.unwrap(),
        reloaded.layers_top_first()[0].compressed_checksum().await.unwrap()
    );
}

#[tokio::test]
#[ignore = "needs network access to registry-1.docker.io"]
async fn s3_dockerhub_pull_yields_consistent_checksums() {
    let registry = Registry::new("https://registry-1.docker.io", None);
    let image = registry.pull_image("library/busybox", "latest", false).await.unwrap();
    assert_eq!(image.name, "library/busybox");
    assert_eq!(image.tag, "latest");
    assert!(!image.layers_top_first().is_empty());

    for layer in image.layers_top_first() {
        let content = layer.content().await.unwrap();
        let computed = ferroxide::digest::sha256_hex(&content);
        assert_eq!(computed, layer.checksum().await.unwrap());
    }
}

#[tokio::test]
#[ignore = "needs a reachable unauthenticated registry at localhost:5000"]
async fn s4_add_content_push_pull_verify() {
    let mut image = busybox_shaped_image();
    image
        .add_layer_contents(&[("a/b/c/d.txt".to_string(), b"a layer".to_vec())], None)
        .unwrap();

    let registry = Registry::new("http://localhost:5000", None);
    image.name = "scenario-s4".to_string();
    image.tag = "t1".to_string();
    registry.push_image(&image).await.unwrap();

    let pulled = registry.pull_image("scenario-s4", "t1", false).await.unwrap();
    let top = &pulled.layers_top_first()[0];
    let files = top.list_files().await.unwrap();
    assert!(files.iter().any(|f| f.contains("a/b/c/d.txt")));
}

#[tokio::test]
#[ignore = "needs a reachable unauthenticated registry at localhost:5000"]
async fn s5_lazy_push_preserves_laziness_across_round_trip() {
    let image = busybox_shaped_image();
    let registry = Registry::new("http://localhost:5000", None);

    let mut first = Image::with_layers("scenario-s5", "t1", Vec::new());
    first.add_layer_contents(&[("seed.txt".to_string(), b"seed".to_vec())], None).unwrap();
    registry.push_image(&first).await.unwrap();

    let mut pulled = registry.pull_image("scenario-s5", "t1", true).await.unwrap();
    for layer in pulled.layers_top_first() {
        assert!(!layer.content_resolved().await);
    }
    pulled
        .add_layer_contents(&[("new.txt".to_string(), b"fresh".to_vec())], None)
        .unwrap();
    pulled.tag = "t2".to_string();
    registry.push_image(&pulled).await.unwrap();

    for layer in pulled.layers_top_first().iter().skip(1) {
        assert!(!layer.content_resolved().await);
    }
    let _ = image;
}

#[tokio::test]
#[ignore = "needs a reachable unauthenticated registry at localhost:5000"]
async fn s6_delete_removes_tag() {
    let registry = Registry::new("http://localhost:5000", None);
    let image = busybox_shaped_image();
    let mut image = image;
    image.name = "scenario-s6".to_string();
    image.tag = "to-delete".to_string();
    registry.push_image(&image).await.unwrap();

    registry.delete_image("scenario-s6", "to-delete").await.unwrap();

    match registry.list_image_tags("scenario-s6", None, None).await.unwrap() {
        None => {}
        Some(tags) => assert!(!tags.contains(&"to-delete".to_string())),
    }
}
