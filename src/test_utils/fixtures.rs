//! Archive fixtures.
//!
//! All builders panic on I/O failure; they are only meant for tests.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Write a ZIP at `path` with the given `(name, content)` entries.
///
/// Names ending in `/` become directory entries.
pub fn write_archive(path: &Path, entries: &[(&str, &[u8])]) -> PathBuf {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let file = File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    for (name, content) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, options).unwrap();
        } else {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content).unwrap();
        }
    }
    zip.finish().unwrap();
    path.to_path_buf()
}

/// `<dir>/root_map.zip` with `level.dat` and `region/` at the archive root.
pub fn root_map_archive(dir: &Path) -> PathBuf {
    write_archive(
        &dir.join("root_map.zip"),
        &[
            ("level.dat", b"level".as_slice()),
            ("region/", b"".as_slice()),
            ("region/r.0.0.mca", b"region".as_slice()),
            ("data/raids.dat", b"raids".as_slice()),
        ],
    )
}

/// `<dir>/<folder>.zip` with the world inside the single top-level `folder`.
pub fn nested_map_archive(dir: &Path, folder: &str) -> PathBuf {
    let level = format!("{folder}/level.dat");
    let region_dir = format!("{folder}/region/");
    let region = format!("{folder}/region/r.0.0.mca");
    let top = format!("{folder}/");
    write_archive(
        &dir.join(format!("{folder}.zip")),
        &[
            (top.as_str(), b"".as_slice()),
            (level.as_str(), b"level".as_slice()),
            (region_dir.as_str(), b"".as_slice()),
            (region.as_str(), b"region".as_slice()),
        ],
    )
}

/// `<dir>/invalid_map.zip`: a valid ZIP that is not a world save.
pub fn invalid_archive(dir: &Path) -> PathBuf {
    write_archive(
        &dir.join("invalid_map.zip"),
        &[("readme.txt", b"not a world".as_slice()), ("screenshots/1.png", b"png".as_slice())],
    )
}

/// `<dir>/content.zip` holding two mod jars.
pub fn content_archive(dir: &Path) -> PathBuf {
    write_archive(
        &dir.join("content.zip"),
        &[("ExtraGuns-1.0.jar", b"guns".as_slice()), ("ExtraPerks-2.1.jar", b"perks".as_slice())],
    )
}

/// Bytes of a small ZIP archive, for serving from a mock HTTP server.
pub fn archive_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    let path = write_archive(&dir.path().join("payload.zip"), entries);
    std::fs::read(path).unwrap()
}
