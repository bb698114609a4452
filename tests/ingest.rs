mod common;

use unity_registry::digest;
use unity_registry::ingest;

#[test]
fn ingests_single_version_with_readme() {
    let dir = tempfile::tempdir().unwrap();
    let package_json = r#"{"name":"com.x.y","version":"1.2.3","description":"d"}"#;
    let path = common::write_package_tarball(dir.path(), "com.x.y-1.2.3.tgz", package_json, Some("# hello"));

    let expected_shasum = digest::sha1_hex(std::fs::File::open(&path).unwrap()).unwrap();

    let ingested = ingest::ingest_file(&path).unwrap();
    assert_eq!(ingested.name, "com.x.y");
    assert_eq!(ingested.version, "1.2.3");
    assert_eq!(ingested.doc["_id"], "com.x.y@1.2.3");
    assert_eq!(ingested.doc["category"], "");
    assert_eq!(ingested.doc["readmeFilename"], "README.md");
    assert_eq!(ingested.doc["readme"], "# hello");
    assert_eq!(ingested.doc["dist"]["shasum"], expected_shasum);
    assert_eq!(expected_shasum.len(), 40);
    assert_eq!(ingested.doc["dist"]["tarball"], "com.x.y-1.2.3.tgz");
}

#[test]
fn missing_manifest_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.tgz");
    let archive = common::TarBuilder::new().add_file("package/other.txt", b"hi").finish();
    std::fs::write(&path, common::gzip(&archive)).unwrap();

    assert!(ingest::ingest_file(&path).is_err());
}

#[test]
fn missing_name_field_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_package_tarball(dir.path(), "bad.tgz", r#"{"version":"1.0.0"}"#, None);
    assert!(ingest::ingest_file(&path).is_err());
}

#[test]
fn scan_selects_latest_and_drops_invalid_versions() {
    let dir = tempfile::tempdir().unwrap();
    common::write_package_tarball(dir.path(), "a-1.0.0.tgz", r#"{"name":"pkg","version":"1.0.0"}"#, None);
    common::write_package_tarball(dir.path(), "a-2.0.0.tgz", r#"{"name":"pkg","version":"2.0.0"}"#, None);
    common::write_package_tarball(dir.path(), "a-bad.tgz", r#"{"name":"pkg","version":"not-a-version"}"#, None);

    let extensions = vec![".tgz".to_string()];
    let (catalog, report) = ingest::scan(dir.path(), &extensions);

    assert_eq!(catalog.len(), 1);
    let entry = catalog.get("pkg").unwrap();
    assert_eq!(entry.latest, "2.0.0");
    assert_eq!(entry.versions.len(), 2);
    assert!(report.errors.iter().any(|e| e.contains("not-a-version")));
}

#[test]
fn duplicate_version_is_rejected_keeping_the_first() {
    let dir = tempfile::tempdir().unwrap();
    common::write_package_tarball(dir.path(), "a-1.0.0.tgz", r#"{"name":"pkg","version":"1.0.0","description":"first"}"#, None);
    common::write_package_tarball(dir.path(), "b-1.0.0.tgz", r#"{"name":"pkg","version":"1.0.0","description":"second"}"#, None);

    let extensions = vec![".tgz".to_string()];
    let (catalog, report) = ingest::scan(dir.path(), &extensions);

    let entry = catalog.get("pkg").unwrap();
    assert_eq!(entry.versions.len(), 1);
    assert_eq!(entry.versions[0].1["description"], "first");
    assert!(report.errors.iter().any(|e| e.contains("duplicate version")));
}

#[test]
fn non_manifest_entries_are_counted_as_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let archive = common::TarBuilder::new()
        .add_file("package/package.json", br#"{"name":"pkg","version":"1.0.0"}"#)
        .add_file("package/LICENSE", b"MIT")
        .add_file("package/src/index.js", b"export default {}")
        .finish();
    let path = dir.path().join("pkg-1.0.0.tgz");
    std::fs::write(&path, common::gzip(&archive)).unwrap();

    let ingested = ingest::ingest_file(&path).unwrap();
    assert_eq!(ingested.skipped_entries, 2);
}

#[test]
fn symlink_entries_are_counted_as_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let archive = common::TarBuilder::new()
        .add_file("package/package.json", br#"{"name":"pkg","version":"1.0.0"}"#)
        .add_symlink("package/current -> ./1.0.0")
        .finish();
    let path = dir.path().join("pkg-1.0.0.tgz");
    std::fs::write(&path, common::gzip(&archive)).unwrap();

    let ingested = ingest::ingest_file(&path).unwrap();
    assert_eq!(ingested.skipped_entries, 1);
}

#[test]
fn scan_report_accumulates_skipped_entries() {
    let dir = tempfile::tempdir().unwrap();
    let archive = common::TarBuilder::new()
        .add_file("package/package.json", br#"{"name":"pkg","version":"1.0.0"}"#)
        .add_file("package/LICENSE", b"MIT")
        .finish();
    std::fs::write(dir.path().join("pkg-1.0.0.tgz"), common::gzip(&archive)).unwrap();

    let extensions = vec![".tgz".to_string()];
    let (_, report) = ingest::scan(dir.path(), &extensions);
    assert_eq!(report.skipped_entries, 1);
}

#[test]
fn extension_matching_is_case_insensitive() {
    let dir = tempfile::tempdir().unwrap();
    common::write_package_tarball(dir.path(), "pkg-1.0.0.TGZ", r#"{"name":"pkg","version":"1.0.0"}"#, None);
    let extensions = vec![".tgz".to_string()];
    let (catalog, _) = ingest::scan(dir.path(), &extensions);
    assert_eq!(catalog.len(), 1);
}
