//! Reads and writes the legacy "docker save" v1 archive layout: `manifest.json`,
//! `repositories`, a per-layer `<hexid>/{VERSION,json,layer.tar}` directory, and a
//! top-level `<config-hexid>.json` document.

pub mod layer_tar;

use crate::error::{RegistryError, Result};
use crate::image::{Image, Layer, LayerMetadata};
use crate::schema::canonical::to_canonical_bytes;
use crate::schema::config_doc::ConfigConfig;
use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;
use std::path::Path;
use tar::{Builder, EntryType, Header};

const LEGACY_VERSION: &str = "1.0";

#[derive(serde::Deserialize, serde::Serialize)]
struct ManifestJsonEntry {
    #[serde(rename = "Config")]
    config: String,
    #[serde(rename = "RepoTags")]
    repo_tags: Vec<String>,
    #[serde(rename = "Layers")]
    layers: Vec<String>,
}

#[derive(serde::Deserialize, serde::Serialize, Default)]
struct LayerJson {
    id: String,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    created: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    architecture: Option<String>,
    #[serde(default)]
    os: Option<String>,
    #[serde(default)]
    config: Option<ConfigConfig>,
}

/// Reads every entry of `tar_bytes` into memory, keyed by archive path. The legacy
/// layout requires random access (`manifest.json` names the layer files it needs), and
/// `tar::Archive` only iterates forward once, so this buffers the whole archive up
/// front rather than seeking.
fn read_all_entries(tar_bytes: &[u8]) -> Result<HashMap<String, Vec<u8>>> {
    let mut archive = tar::Archive::new(Cursor::new(tar_bytes));
    let mut entries = HashMap::new();
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.to_string_lossy().to_string();
        let mut data = Vec::new();
        std::io::Read::read_to_end(&mut entry, &mut data)?;
        entries.insert(path, data);
    }
    Ok(entries)
}

fn require<'a>(entries: &'a HashMap<String, Vec<u8>>, path: &str) -> Result<&'a Vec<u8>> {
    entries
        .get(path)
        .ok_or_else(|| RegistryError::Format(format!("archive is missing '{}'", path)))
}

/// Parses a v1 `docker save` archive into one [`Image`] per `manifest.json` entry.
pub fn parse_v1(tar_bytes: &[u8]) -> Result<Vec<Image>> {
    let entries = read_all_entries(tar_bytes)?;
    let manifest_bytes = require(&entries, "manifest.json")?;
    let manifest: Vec<ManifestJsonEntry> = serde_json::from_slice(manifest_bytes)?;

    let mut images = Vec::with_capacity(manifest.len());
    for image_entry in manifest {
        let (name, tag) = match image_entry.repo_tags.first() {
            Some(reference) => match reference.rsplit_once(':') {
                Some((name, tag)) => (name.to_string(), tag.to_string()),
                None => (reference.clone(), "latest".to_string()),
            },
            None => (String::new(), "latest".to_string()),
        };

        // `Layers` is base-first; build in that order, then reverse to top-first.
        let mut layers_base_first = Vec::with_capacity(image_entry.layers.len());
        for layer_path in &image_entry.layers {
            let hexid = layer_path
                .strip_suffix("/layer.tar")
                .ok_or_else(|| {
                    RegistryError::Format(format!("unexpected layer path '{}'", layer_path))
                })?
                .to_string();

            let json_bytes = require(&entries, &format!("{}/json", hexid))?;
            let layer_json: LayerJson = serde_json::from_slice(json_bytes)?;
            let tar_bytes = require(&entries, &format!("{}/layer.tar", hexid))?.clone();

            let metadata = LayerMetadata {
                architecture: layer_json.architecture,
                os: layer_json.os,
                created: layer_json.created,
                author: layer_json.author,
                config: layer_json.config,
            };
            layers_base_first.push(Layer::from_content(
                layer_json.id,
                layer_json.parent,
                tar_bytes,
                metadata,
            ));
        }
        layers_base_first.reverse();

        images.push(Image::with_layers(name, tag, layers_base_first));
    }

    Ok(images)
}

fn tar_header(entry_type: EntryType, mode: u32, size: u64) -> Header {
    let mut header = Header::new_gnu();
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header.set_username("root").ok();
    header.set_groupname("root").ok();
    header.set_mode(mode);
    header.set_size(size);
    header.set_entry_type(entry_type);
    header.set_cksum();
    header
}

fn append_regular(builder: &mut Builder<Vec<u8>>, path: &str, data: &[u8]) -> Result<()> {
    let mut header = tar_header(EntryType::Regular, 0o644, data.len() as u64);
    builder.append_data(&mut header, path, Cursor::new(data))?;
    Ok(())
}

/// Writes `image` as a single-entry v1 `docker save` archive at `path`. Directory and
/// `manifest.json`/`repositories` entries are written in a fixed order and every tar
/// entry gets mtime 0, so re-writing an unchanged image produces byte-identical output.
pub async fn write_v1(image: &Image, path: &Path) -> Result<()> {
    let bytes = write_v1_bytes(image).await?;
    std::fs::write(path, bytes)?;
    Ok(())
}

async fn write_v1_bytes(image: &Image) -> Result<Vec<u8>> {
    let base_first = image.layers_base_first();
    let reference = format!("{}:{}", image.name, image.tag);

    let mut layer_paths = Vec::with_capacity(base_first.len());
    let mut per_layer_json: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    let mut per_layer_tar: BTreeMap<String, Vec<u8>> = BTreeMap::new();

    for layer in &base_first {
        let content = layer.content().await?;
        let layer_json = LayerJson {
            id: layer.id.clone(),
            parent: layer.parent.clone(),
            created: layer.created.clone(),
            author: layer.author.clone(),
            architecture: layer.architecture.clone(),
            os: layer.os.clone(),
            config: layer.config.clone(),
        };
        per_layer_json.insert(layer.id.clone(), to_canonical_bytes(&layer_json)?);
        per_layer_tar.insert(layer.id.clone(), (*content).clone());
        layer_paths.push(format!("{}/layer.tar", layer.id));
    }

    let (_config, config_bytes, config_digest) = image.build_config_document().await?;
    let config_name = format!("{}.json", config_digest);

    let manifest = vec![ManifestJsonEntry {
        config: config_name.clone(),
        repo_tags: vec![reference.clone()],
        layers: layer_paths,
    }];
    let manifest_bytes = to_canonical_bytes(&manifest)?;

    let mut repositories = serde_json::Map::new();
    if let Some(top_id) = image.top_layer_id() {
        let mut tags = serde_json::Map::new();
        tags.insert(image.tag.clone(), serde_json::Value::String(top_id.to_string()));
        repositories.insert(image.name.clone(), serde_json::Value::Object(tags));
    }
    let repositories_bytes = serde_json::to_vec(&serde_json::Value::Object(repositories))?;

    let mut builder = Builder::new(Vec::new());
    append_regular(&mut builder, "manifest.json", &manifest_bytes)?;
    append_regular(&mut builder, "repositories", &repositories_bytes)?;
    append_regular(&mut builder, &config_name, &config_bytes)?;

    for (id, json) in &per_layer_json {
        let mut version_header =
            tar_header(EntryType::Regular, 0o644, LEGACY_VERSION.len() as u64);
        builder.append_data(
            &mut version_header,
            format!("{}/VERSION", id),
            Cursor::new(LEGACY_VERSION.as_bytes()),
        )?;
        append_regular(&mut builder, &format!("{}/json", id), json)?;
        let tar_bytes = per_layer_tar.get(id).expect("every id has a tar entry");
        append_regular(&mut builder, &format!("{}/layer.tar", id), tar_bytes)?;
    }

    Ok(builder.into_inner()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Image;

    #[tokio::test]
    async fn archive_round_trip_preserves_identity() {
        let mut image = Image::new("demo", "latest");
        image
            .add_layer_contents(&[("a.txt".to_string(), b"hello".to_vec())], Some("a".repeat(64)))
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.tar");
        write_v1(&image, &path).await.unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let parsed = parse_v1(&bytes).unwrap();
        assert_eq!(parsed.len(), 1);
        let reparsed = &parsed[0];
        assert_eq!(reparsed.name, "demo");
        assert_eq!(reparsed.tag, "latest");
        assert_eq!(reparsed.layers_top_first().len(), 1);
        assert_eq!(
            reparsed.layers_top_first()[0].checksum().await.unwrap(),
            image.layers_top_first()[0].checksum().await.unwrap()
        );
    }
}
