//! Renders catalog data into the npm-registry-shaped JSON responses, and
//! resolves the absolute tarball URL from the incoming request's origin.

use std::collections::VecDeque;

use serde_json::{Map, Value};

use crate::catalog::{Catalog, PackageEntry, VersionDocument};

/// scheme + host[:non-default-port] + optional userinfo, taken from the
/// incoming request, used to compose absolute `dist.tarball` URLs.
#[derive(Debug, Clone)]
pub struct RequestOrigin {
    pub scheme: String,
    pub authority: String,
}

impl RequestOrigin {
    fn base(&self) -> String {
        format!("{}://{}", self.scheme, self.authority)
    }
}

fn absolute_tarball_url(origin: &RequestOrigin, pkg: &str, file_name: &str) -> String {
    format!("{}/{}/-/{}", origin.base(), pkg, file_name)
}

/// Clones `doc`, rewriting `dist.tarball` from a bare file name to an
/// absolute URL.
pub fn render_version_doc(doc: &VersionDocument, pkg: &str, origin: &RequestOrigin) -> Value {
    let mut doc = doc.clone();
    if let Some(Value::Object(dist)) = doc.get_mut("dist") {
        if let Some(Value::String(file_name)) = dist.get("tarball").cloned() {
            dist.insert("tarball".to_string(), Value::String(absolute_tarball_url(origin, pkg, &file_name)));
        }
    }
    Value::Object(doc)
}

pub fn render_package(entry: &PackageEntry, origin: &RequestOrigin) -> Value {
    let mut out = Map::new();

    let mut dist_tags = Map::new();
    dist_tags.insert("latest".to_string(), Value::String(entry.latest.clone()));
    out.insert("dist-tags".to_string(), Value::Object(dist_tags));

    out.insert("name".to_string(), Value::String(entry.name.clone()));

    let latest_doc = entry.latest_doc();
    let description = latest_doc.get("description").cloned().unwrap_or(Value::Null);
    out.insert("description".to_string(), description);

    let mut versions = Map::new();
    for (version, doc) in &entry.versions {
        versions.insert(version.clone(), render_version_doc(doc, &entry.name, origin));
    }
    out.insert("versions".to_string(), Value::Object(versions));

    let mut time = Map::new();
    for (version, _) in &entry.versions {
        if let Some(ts) = entry.time.get(version) {
            time.insert(version.clone(), Value::String(ts.clone()));
        }
    }
    out.insert("time".to_string(), Value::Object(time));

    if let Some(readme) = latest_doc.get("readme") {
        out.insert("readme".to_string(), readme.clone());
    }

    Value::Object(out)
}

#[derive(Debug, Clone)]
pub struct SearchObject {
    pub name: String,
    pub version: String,
    pub description: Value,
    pub keywords: Value,
}

/// Case-insensitive substring match of `text` against package id, with
/// "last `size` matches among the first `from + size` matches" ring-buffer
/// paging. Matches are produced in a deterministic, case-insensitive-name-
/// sorted order (the catalog itself has no intrinsic ordering).
pub fn search(catalog: &Catalog, text: &str, from: usize, size: usize) -> (Vec<SearchObject>, usize) {
    let needle = text.to_ascii_lowercase();
    let mut matches: Vec<&PackageEntry> =
        catalog.iter().filter(|p| p.name.to_ascii_lowercase().contains(&needle)).collect();
    matches.sort_by(|a, b| a.name.to_ascii_lowercase().cmp(&b.name.to_ascii_lowercase()));

    let total = matches.len();
    if size == 0 {
        return (Vec::new(), total);
    }

    let window = from.saturating_add(size).min(total);
    let mut ring: VecDeque<&PackageEntry> = VecDeque::with_capacity(size);
    for entry in &matches[..window] {
        if ring.len() == size {
            ring.pop_front();
        }
        ring.push_back(entry);
    }

    let objects = ring
        .into_iter()
        .map(|entry| {
            let doc = entry.latest_doc();
            SearchObject {
                name: entry.name.clone(),
                version: entry.latest.clone(),
                description: doc.get("description").cloned().unwrap_or(Value::Null),
                keywords: doc.get("keywords").cloned().unwrap_or(Value::Null),
            }
        })
        .collect();

    (objects, total)
}
