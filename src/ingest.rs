//! Package ingester: for each candidate tarball, compute its content
//! digest, stream-decode it through gzip + the tar reader, extract
//! `package/package.json` and `package/README.md`, validate, and produce a
//! version document.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use flate2::read::GzDecoder;
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::catalog::{Catalog, PackageEntry, VersionDocument};
use crate::digest;
use crate::docmap;
use crate::error::IngestError;
use crate::semver::SemVer;
use crate::tario::header::TypeFlag;
use crate::tario::TarReader;

const MANIFEST_ENTRY: &str = "package/package.json";
const README_ENTRY: &str = "package/readme.md"; // compared case-insensitively

pub struct IngestedVersion {
    pub name: String,
    pub version: String,
    pub doc: VersionDocument,
    pub file_name: String,
    pub mtime: String,
    /// Count of directory/symlink/other regular-file entries in this
    /// archive that were neither `package/package.json` nor
    /// `package/README.md` — drained but otherwise ignored.
    pub skipped_entries: usize,
}

/// Counts of what a scan observed, for the `list`/`scan` CLI commands.
#[derive(Debug, Default, Clone)]
pub struct ScanReport {
    pub candidate_files: usize,
    pub ingested_versions: usize,
    pub skipped_entries: usize,
    pub errors: Vec<String>,
}

/// Ingests a single tarball file: digest + gzip + tar + package.json +
/// README extraction. Never panics; all failure is reported as `Err`.
pub fn ingest_file(path: &Path) -> Result<IngestedVersion, IngestError> {
    let shasum = digest::sha1_hex(BufReader::new(File::open(path)?))?;

    let file = File::open(path)?;
    let gz = GzDecoder::new(BufReader::new(file));
    let mut tar = TarReader::new(gz);

    let mut manifest: Option<Map<String, Value>> = None;
    let mut readme: Option<String> = None;
    let mut skipped = 0usize;

    while let Some(entry) = tar.next_entry()? {
        let lower = entry.name.to_ascii_lowercase();
        match entry.typeflag {
            TypeFlag::Regular if lower == MANIFEST_ENTRY => {
                let data = tar.read_entry_payload(entry.size)?;
                manifest = Some(docmap::parse_object(&data)?);
            }
            TypeFlag::Regular if lower == README_ENTRY => {
                let data = tar.read_entry_payload(entry.size)?;
                readme = Some(String::from_utf8(data).map_err(|_| IngestError::ReadmeNotUtf8)?);
            }
            _ => {
                skipped += 1;
            }
        }
    }
    // Symlinks, hardlinks, and any other typeflag the tar reader doesn't
    // surface as an entry are still counted against this archive's total.
    skipped += tar.other_entries();

    let mut manifest = manifest.ok_or(IngestError::MissingManifest)?;

    let name = required_nonempty_string(&manifest, "name")?;
    let version = required_nonempty_string(&manifest, "version")?;

    manifest.insert("category".to_string(), Value::String(String::new()));
    manifest.insert("readmeFilename".to_string(), Value::String("README.md".to_string()));
    manifest.insert("_id".to_string(), Value::String(format!("{name}@{version}")));

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut dist = Map::new();
    dist.insert("shasum".to_string(), Value::String(shasum));
    dist.insert("tarball".to_string(), Value::String(file_name.clone()));
    manifest.insert("dist".to_string(), Value::Object(dist));

    if let Some(readme) = readme {
        manifest.insert("readme".to_string(), Value::String(readme));
    }

    let mtime = file_mtime_rfc3339(path)?;

    Ok(IngestedVersion { name, version, doc: manifest, file_name, mtime, skipped_entries: skipped })
}

fn required_nonempty_string(map: &Map<String, Value>, field: &'static str) -> Result<String, IngestError> {
    match map.get(field) {
        None => Err(IngestError::MissingField(field)),
        Some(Value::String(s)) if s.is_empty() => Err(IngestError::EmptyField(field)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(IngestError::MissingField(field)),
    }
}

fn file_mtime_rfc3339(path: &Path) -> Result<String, std::io::Error> {
    let meta = std::fs::metadata(path)?;
    let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    let dt: OffsetDateTime = modified.into();
    let dt = dt.to_offset(time::UtcOffset::UTC);
    // yyyy-MM-ddTHH:mm:ssZ
    Ok(format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        dt.year(),
        u8::from(dt.month()),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second()
    ))
}

fn has_candidate_extension(path: &Path, extensions: &[String]) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n.to_ascii_lowercase(),
        None => return false,
    };
    extensions.iter().any(|ext| {
        let ext = ext.to_ascii_lowercase();
        let ext = if let Some(stripped) = ext.strip_prefix('.') { stripped.to_string() } else { ext };
        name.ends_with(&format!(".{ext}"))
    })
}

/// Rebuilds the whole catalog from scratch by scanning `packages_dir` for
/// files matching `extensions`. Never fails outright: bad tarballs and
/// invalid versions are dropped and recorded in the returned report.
pub fn scan(packages_dir: &Path, extensions: &[String]) -> (Catalog, ScanReport) {
    let mut report = ScanReport::default();
    let mut staged: HashMap<String, (String, Vec<(String, VersionDocument)>, HashMap<String, String>)> = HashMap::new();

    let entries = match std::fs::read_dir(packages_dir) {
        Ok(it) => it,
        Err(e) => {
            report.errors.push(format!("cannot read packages directory: {e}"));
            return (Catalog::new(), report);
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| has_candidate_extension(p, extensions))
        .collect();
    files.sort();

    for path in files {
        report.candidate_files += 1;
        match ingest_file(&path) {
            Ok(version) => {
                let key = version.name.to_ascii_lowercase();
                let bucket = staged.entry(key).or_insert_with(|| (version.name.clone(), Vec::new(), HashMap::new()));
                let already_present = bucket.1.iter().any(|(v, _)| v.eq_ignore_ascii_case(&version.version));
                if already_present {
                    report.errors.push(format!(
                        "{}: duplicate version {:?} for package {:?}, ignoring",
                        path.display(),
                        version.version,
                        version.name
                    ));
                    continue;
                }
                bucket.2.insert(version.version.clone(), version.mtime.clone());
                bucket.1.push((version.version, version.doc));
                report.ingested_versions += 1;
                report.skipped_entries += version.skipped_entries;
            }
            Err(e) => {
                report.errors.push(format!("{}: {e}", path.display()));
            }
        }
    }

    let mut catalog = Catalog::new();
    for (_, (name, versions, time)) in staged {
        let valid: Vec<(String, VersionDocument)> = versions
            .into_iter()
            .filter(|(v, _)| {
                let ok = SemVer::parse(v).is_ok();
                if !ok {
                    report.errors.push(format!("{name}: dropping invalid version {v:?}"));
                }
                ok
            })
            .collect();

        if valid.is_empty() {
            continue;
        }

        let latest = match Catalog::select_latest(&valid) {
            Some(l) => l,
            None => continue,
        };

        catalog.insert(PackageEntry { name, versions: valid, latest, time });
    }

    (catalog, report)
}
