//! In-memory registry catalog: package id -> { versions, latest, time }.
//! Rebuilt wholesale by each scan; never mutated incrementally.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::semver::SemVer;

/// An ordered mapping materialized from a tarball's `package.json` plus
/// synthesized registry fields. Field order is insertion order, matching
/// the data model's requirement for stable JSON output.
pub type VersionDocument = Map<String, Value>;

#[derive(Debug, Clone)]
pub struct PackageEntry {
    pub name: String,
    /// Keyed by the version string exactly as it appears in `package.json`
    /// (case preserved); lookups are case-insensitive via `versions_get`.
    pub versions: Vec<(String, VersionDocument)>,
    pub latest: String,
    /// version string -> RFC-3339-like UTC timestamp, from the tarball's
    /// mtime.
    pub time: HashMap<String, String>,
}

impl PackageEntry {
    pub fn version(&self, version: &str) -> Option<&VersionDocument> {
        self.versions
            .iter()
            .find(|(v, _)| v.eq_ignore_ascii_case(version))
            .map(|(_, doc)| doc)
    }

    pub fn latest_doc(&self) -> &VersionDocument {
        self.version(&self.latest).expect("latest always references a present version")
    }
}

/// The read-only snapshot the HTTP dispatcher serves from. Package ids are
/// keyed case-insensitively (lowercased); `PackageEntry::name` retains the
/// first-seen casing for display.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    packages: HashMap<String, PackageEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog { packages: HashMap::new() }
    }

    pub fn insert(&mut self, entry: PackageEntry) {
        self.packages.insert(entry.name.to_ascii_lowercase(), entry);
    }

    pub fn get(&self, name: &str) -> Option<&PackageEntry> {
        self.packages.get(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PackageEntry> {
        self.packages.values()
    }

    /// Selects `latest` as the version whose SemVer strictly exceeds all
    /// others; returns `None` if `versions` is empty.
    pub fn select_latest(versions: &[(String, VersionDocument)]) -> Option<String> {
        let mut best: Option<(&str, SemVer<'_>)> = None;
        for (v, _) in versions {
            let parsed = match SemVer::parse(v) {
                Ok(p) => p,
                Err(_) => continue,
            };
            best = match best {
                None => Some((v.as_str(), parsed)),
                Some((_, ref b)) if parsed.compare(b) == std::cmp::Ordering::Greater => Some((v.as_str(), parsed)),
                some => some,
            };
        }
        best.map(|(v, _)| v.to_string())
    }
}
