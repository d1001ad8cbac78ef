//! Tests for bundle discovery and archive packaging.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;
use zip::write::FileOptions;

use super::{ArchiveBuilder, ArchiveError, SymbolArchive};

/// Creates a plausible bundle layout under `root`.
fn make_bundle(root: &Path, name: &str) {
    let dwarf_dir = root.join(name).join("Contents/Resources/DWARF");
    fs::create_dir_all(&dwarf_dir).unwrap_or_else(|err| panic!("create bundle dirs: {err}"));
    fs::write(dwarf_dir.join("App"), b"dwarf bytes")
        .unwrap_or_else(|err| panic!("write dwarf file: {err}"));
    fs::write(root.join(name).join("Contents/Info.plist"), b"<plist/>")
        .unwrap_or_else(|err| panic!("write plist: {err}"));
}

fn utf8(path: &Path) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(path.to_path_buf())
        .unwrap_or_else(|lossy| panic!("non-utf8 path: {lossy:?}"))
}

/// Lists the entry names inside a produced archive.
fn archive_entries(archive: &SymbolArchive) -> Vec<String> {
    let file = File::open(archive.path.as_std_path())
        .unwrap_or_else(|err| panic!("open archive: {err}"));
    let mut entries = Vec::new();
    let mut reader = tar::Archive::new(GzDecoder::new(file));
    for entry in reader
        .entries()
        .unwrap_or_else(|err| panic!("read entries: {err}"))
    {
        let tar_entry = entry.unwrap_or_else(|err| panic!("read entry: {err}"));
        let path = tar_entry
            .path()
            .unwrap_or_else(|err| panic!("entry path: {err}"));
        entries.push(path.to_string_lossy().into_owned());
    }
    entries
}

fn subdirectory_count(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap_or_else(|err| panic!("read dir: {err}"))
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .count()
}

#[test]
fn directory_scan_packages_all_bundles() {
    let source = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let output = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
    make_bundle(source.path(), "Alpha.dSYM");
    make_bundle(source.path(), "Beta.dSYM");
    fs::write(source.path().join("notes.txt"), b"not a bundle")
        .unwrap_or_else(|err| panic!("write notes: {err}"));

    let archive = ArchiveBuilder::new()
        .with_output_dir(output.path())
        .build(&utf8(source.path()))
        .unwrap_or_else(|err| panic!("build: {err}"));

    let entries = archive_entries(&archive);
    assert!(entries.iter().any(|entry| entry.starts_with("Alpha.dSYM")));
    assert!(entries.iter().any(|entry| entry.starts_with("Beta.dSYM")));
    assert!(entries.iter().all(|entry| !entry.contains("notes.txt")));
    assert!(archive.size_bytes > 0);
    assert!(archive.path.as_str().ends_with(".tgz"));
}

#[test]
fn bundle_path_ignores_sibling_bundles() {
    let source = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let output = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
    make_bundle(source.path(), "Alpha.dSYM");
    make_bundle(source.path(), "Beta.dSYM");

    let archive = ArchiveBuilder::new()
        .with_output_dir(output.path())
        .build(&utf8(&source.path().join("Alpha.dSYM")))
        .unwrap_or_else(|err| panic!("build: {err}"));

    let entries = archive_entries(&archive);
    assert!(entries.iter().any(|entry| entry.starts_with("Alpha.dSYM")));
    assert!(entries.iter().all(|entry| !entry.starts_with("Beta.dSYM")));
}

#[test]
fn flattened_bundle_file_is_packaged_as_single_entry() {
    let source = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let output = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
    fs::write(source.path().join("Flat.dSYM"), b"flattened symbols")
        .unwrap_or_else(|err| panic!("write flat bundle: {err}"));

    let archive = ArchiveBuilder::new()
        .with_output_dir(output.path())
        .build(&utf8(source.path()))
        .unwrap_or_else(|err| panic!("build: {err}"));

    assert_eq!(archive_entries(&archive), vec![String::from("Flat.dSYM")]);
}

#[test]
fn empty_directory_is_rejected() {
    let source = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let output = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));

    let err = ArchiveBuilder::new()
        .with_output_dir(output.path())
        .build(&utf8(source.path()))
        .expect_err("empty directory should be rejected");

    assert!(
        matches!(err, ArchiveError::NoBundlesFound { .. }),
        "unexpected error: {err}"
    );
}

#[test]
fn missing_directory_reports_scan_error() {
    let err = ArchiveBuilder::new()
        .build(Utf8Path::new("/nonexistent/dsyms"))
        .expect_err("missing directory should error");

    assert!(matches!(err, ArchiveError::Scan { .. }), "unexpected: {err}");
}

/// Builds a zip containing one bundle directory and one loose file.
fn write_fixture_zip(path: &Path, include_bundle: bool) {
    let file = File::create(path).unwrap_or_else(|err| panic!("create zip: {err}"));
    let mut writer = zip::ZipWriter::new(file);
    let options = FileOptions::default();
    if include_bundle {
        writer
            .add_directory("Packed.dSYM/Contents", options)
            .unwrap_or_else(|err| panic!("zip dir: {err}"));
        writer
            .start_file("Packed.dSYM/Contents/Info.plist", options)
            .unwrap_or_else(|err| panic!("zip entry: {err}"));
        writer
            .write_all(b"<plist/>")
            .unwrap_or_else(|err| panic!("zip write: {err}"));
    }
    writer
        .start_file("readme.txt", options)
        .unwrap_or_else(|err| panic!("zip entry: {err}"));
    writer
        .write_all(b"not a bundle")
        .unwrap_or_else(|err| panic!("zip write: {err}"));
    writer
        .finish()
        .unwrap_or_else(|err| panic!("finish zip: {err}"));
}

#[test]
fn packaged_archive_is_extracted_and_scratch_removed() {
    let source = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let output = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let zip_path = source.path().join("connect-export.zip");
    write_fixture_zip(&zip_path, true);

    let archive = ArchiveBuilder::new()
        .with_output_dir(output.path())
        .build(&utf8(&zip_path))
        .unwrap_or_else(|err| panic!("build: {err}"));

    let entries = archive_entries(&archive);
    assert!(entries.iter().any(|entry| entry.starts_with("Packed.dSYM")));
    assert!(entries.iter().all(|entry| !entry.contains("readme.txt")));
    assert_eq!(
        subdirectory_count(output.path()),
        0,
        "extraction scratch should be removed"
    );
}

#[test]
fn packaged_archive_without_bundles_cleans_scratch() {
    let source = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let output = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let zip_path = source.path().join("empty-export.zip");
    write_fixture_zip(&zip_path, false);

    let err = ArchiveBuilder::new()
        .with_output_dir(output.path())
        .build(&utf8(&zip_path))
        .expect_err("bundle-free zip should be rejected");

    assert!(
        matches!(err, ArchiveError::NoBundlesFound { .. }),
        "unexpected error: {err}"
    );
    assert_eq!(
        subdirectory_count(output.path()),
        0,
        "extraction scratch should be removed on failure too"
    );
}

#[test]
fn working_directory_is_preserved() {
    let source = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let output = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
    make_bundle(source.path(), "Alpha.dSYM");

    let before = std::env::current_dir().unwrap_or_else(|err| panic!("cwd: {err}"));
    ArchiveBuilder::new()
        .with_output_dir(output.path())
        .build(&utf8(source.path()))
        .unwrap_or_else(|err| panic!("build: {err}"));
    let after = std::env::current_dir().unwrap_or_else(|err| panic!("cwd: {err}"));

    assert_eq!(before, after);
}
