//! Builds the uncompressed tar bytes that become a [`crate::image::Layer`]'s `content`.
//!
//! Every entry gets mtime 0, uid/gid 0, and owner/group `root` so that two builds of the
//! same inputs produce byte-identical tars: this is what gives layer digests their
//! reproducibility. Entries are always written in path-sorted order for the same reason.

use crate::error::Result;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tar::{Builder, EntryType, Header};

/// A tar entry's metadata, as seen by a [`Filter`]. Regular-file data is not exposed to
/// the filter: only path, mode, and whether it's a directory can be rewritten or
/// dropped.
#[derive(Debug, Clone)]
pub struct EntryMeta {
    pub path: String,
    pub mode: u32,
    pub is_dir: bool,
}

pub type Filter<'a> = dyn Fn(EntryMeta) -> Option<EntryMeta> + 'a;

struct PendingEntry {
    meta: EntryMeta,
    data: Vec<u8>,
}

fn apply_filter(meta: EntryMeta, filter: Option<&Filter>) -> Option<EntryMeta> {
    match filter {
        Some(f) => f(meta),
        None => Some(meta),
    }
}

fn write_header(builder: &mut Builder<Vec<u8>>, entry: &PendingEntry) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header.set_username("root").ok();
    header.set_groupname("root").ok();
    header.set_mode(entry.meta.mode);
    header.set_size(entry.data.len() as u64);
    header.set_entry_type(if entry.meta.is_dir {
        EntryType::Directory
    } else {
        EntryType::Regular
    });
    header.set_cksum();
    builder.append_data(&mut header, &entry.meta.path, Cursor::new(&entry.data))?;
    Ok(())
}

fn finish(builder: Builder<Vec<u8>>) -> Result<Vec<u8>> {
    Ok(builder.into_inner()?)
}

/// Recursively collects `(source_path, archive_relative_path, mode, is_dir)` under
/// `root`, sorted by archive path.
fn walk(root: &Path, arc_prefix: &str, recursive: bool) -> Result<Vec<(PathBuf, String, u32, bool)>> {
    let mut out = Vec::new();
    collect(root, arc_prefix, recursive, &mut out)?;
    out.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(out)
}

fn collect(
    path: &Path,
    arc_path: &str,
    recursive: bool,
    out: &mut Vec<(PathBuf, String, u32, bool)>,
) -> Result<()> {
    let metadata = std::fs::symlink_metadata(path)?;
    let mode = file_mode(&metadata);

    if metadata.is_dir() {
        out.push((path.to_path_buf(), arc_path.to_string(), mode, true));
        if !recursive {
            return Ok(());
        }
        let mut children: Vec<_> = std::fs::read_dir(path)?.collect::<std::io::Result<_>>()?;
        children.sort_by_key(|e| e.file_name());
        for child in children {
            let child_path = child.path();
            let name = child.file_name().to_string_lossy().to_string();
            let child_arc = format!("{}/{}", arc_path, name);
            collect(&child_path, &child_arc, recursive, out)?;
        }
    } else {
        out.push((path.to_path_buf(), arc_path.to_string(), mode, false));
    }
    Ok(())
}

#[cfg(unix)]
fn file_mode(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(metadata: &std::fs::Metadata) -> u32 {
    if metadata.is_dir() {
        0o755
    } else {
        0o644
    }
}

/// Walks a single filesystem path, emitting tar entries under `arcname`.
pub fn write_tar_from_path(
    path: &Path,
    arcname: &str,
    recursive: bool,
    filter: Option<&Filter>,
) -> Result<Vec<u8>> {
    write_tar_from_paths_recursive(
        &[(path.to_path_buf(), arcname.to_string())],
        recursive,
        filter,
    )
}

/// Walks multiple `(source, archive_path)` roots, merging them into one sorted archive.
/// Each root is walked recursively, matching `write_tar_from_path`'s default.
pub fn write_tar_from_paths(
    entries: &[(PathBuf, String)],
    filter: Option<&Filter>,
) -> Result<Vec<u8>> {
    write_tar_from_paths_recursive(entries, true, filter)
}

fn write_tar_from_paths_recursive(
    entries: &[(PathBuf, String)],
    recursive: bool,
    filter: Option<&Filter>,
) -> Result<Vec<u8>> {
    let mut pending = Vec::new();
    for (src, arcname) in entries {
        for (src_path, arc_path, mode, is_dir) in walk(src, arcname, recursive)? {
            let meta = EntryMeta {
                path: arc_path,
                mode,
                is_dir,
            };
            let Some(meta) = apply_filter(meta, filter) else {
                continue;
            };
            let data = if is_dir {
                Vec::new()
            } else {
                std::fs::read(&src_path)?
            };
            pending.push(PendingEntry { meta, data });
        }
    }
    pending.sort_by(|a, b| a.meta.path.cmp(&b.meta.path));

    let mut builder = Builder::new(Vec::new());
    for entry in &pending {
        write_header(&mut builder, entry)?;
    }
    finish(builder)
}

/// Synthesizes regular-file entries from in-memory `archive_path -> bytes` pairs.
pub fn write_tar_from_contents(
    contents: &[(String, Vec<u8>)],
    filter: Option<&Filter>,
) -> Result<Vec<u8>> {
    let mut sorted: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    for (path, data) in contents {
        sorted.insert(path.clone(), data.clone());
    }

    let mut builder = Builder::new(Vec::new());
    for (path, data) in sorted {
        let meta = EntryMeta {
            path,
            mode: 0o644,
            is_dir: false,
        };
        let Some(meta) = apply_filter(meta, filter) else {
            continue;
        };
        let entry = PendingEntry { meta, data };
        write_header(&mut builder, &entry)?;
    }
    finish(builder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn contents_round_trip_sorted_and_deterministic() {
        let contents = vec![
            ("b.txt".to_string(), b"second".to_vec()),
            ("a/a.txt".to_string(), b"first".to_vec()),
        ];
        let a = write_tar_from_contents(&contents, None).unwrap();
        let b = write_tar_from_contents(&contents, None).unwrap();
        assert_eq!(a, b);

        let mut archive = tar::Archive::new(Cursor::new(&a));
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a/a.txt".to_string(), "b.txt".to_string()]);
    }

    #[test]
    fn path_walk_is_recursive_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/z.txt"), b"z").unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();

        let tar_bytes = write_tar_from_path(dir.path(), "root", true, None).unwrap();
        let mut archive = tar::Archive::new(Cursor::new(&tar_bytes));
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().to_string())
            .collect();
        assert!(names.contains(&"root/a.txt".to_string()));
        assert!(names.contains(&"root/sub/z.txt".to_string()));
    }

    #[test]
    fn filter_can_drop_entries() {
        let contents = vec![
            ("keep.txt".to_string(), b"1".to_vec()),
            ("drop.txt".to_string(), b"2".to_vec()),
        ];
        let filter = |meta: EntryMeta| if meta.path == "drop.txt" { None } else { Some(meta) };
        let bytes = write_tar_from_contents(&contents, Some(&filter)).unwrap();
        let mut archive = tar::Archive::new(Cursor::new(&bytes));
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["keep.txt".to_string()]);
        let _ = Write::flush(&mut std::io::sink());
    }
}
