//! Pax extended header record parsing (`x` and `g` typeflags).
//!
//! Record format: `"<length> <key>=<value>\n"`, where `<length>` is the
//! decimal byte count of the entire record including the trailing newline.
//!
//! `hdrcharset` is not honored: every value is decoded as UTF-8
//! unconditionally. This matches the observable default behavior for the
//! archives this server ingests (npm/Unity package tarballs are UTF-8).

use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaxError {
    #[error("malformed pax record length")]
    BadLength,
    #[error("pax record missing '=' separator")]
    MissingEquals,
    #[error("pax record missing trailing newline")]
    MissingNewline,
    #[error("pax block ended before the declared record length")]
    Truncated,
    #[error("pax record value is not valid UTF-8")]
    NotUtf8,
}

/// Accumulated key/value overrides from one or more pax records, applied
/// to a tar entry's header fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaxRecords {
    fields: BTreeMap<String, String>,
}

impl PaxRecords {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Merges records from `other` into `self`, `other`'s values winning —
    /// used so a `g` global header can be refined by a later `x` header on
    /// the same entry.
    pub fn merge_from(&mut self, other: &PaxRecords) {
        for (k, v) in &other.fields {
            self.fields.insert(k.clone(), v.clone());
        }
    }

    pub fn path(&self) -> Option<&str> {
        self.get("path")
    }
    pub fn linkpath(&self) -> Option<&str> {
        self.get("linkpath")
    }
    pub fn mtime(&self) -> Option<i64> {
        self.get("mtime").and_then(|v| v.split('.').next()).and_then(|v| v.parse().ok())
    }
    pub fn size(&self) -> Option<u64> {
        self.get("size").and_then(|v| v.parse().ok())
    }
}

/// Parses the full payload of an `x`/`g` entry into its records.
///
/// On any malformed record the function stops and returns the records
/// parsed so far, plus the error — callers log the error but may keep
/// whatever fields parsed cleanly before the bad byte.
pub fn parse(payload: &[u8]) -> (PaxRecords, Option<PaxError>) {
    let mut records = PaxRecords::default();
    let mut pos = 0usize;

    while pos < payload.len() {
        // Skip a lone trailing newline/whitespace remainder.
        if payload[pos..].iter().all(|&b| b == b'\n' || b == 0) {
            break;
        }

        let len_start = pos;
        while pos < payload.len() && payload[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos == len_start || pos >= payload.len() || payload[pos] != b' ' {
            return (records, Some(PaxError::BadLength));
        }
        let len: usize = match std::str::from_utf8(&payload[len_start..pos]).ok().and_then(|s| s.parse().ok()) {
            Some(n) => n,
            None => return (records, Some(PaxError::BadLength)),
        };
        if len == 0 || len_start + len > payload.len() {
            return (records, Some(PaxError::Truncated));
        }
        let record = &payload[len_start..len_start + len];
        if record.last() != Some(&b'\n') {
            return (records, Some(PaxError::MissingNewline));
        }
        let body = &record[(pos + 1 - len_start)..record.len() - 1];
        let eq = match body.iter().position(|&b| b == b'=') {
            Some(i) => i,
            None => return (records, Some(PaxError::MissingEquals)),
        };
        let key = match std::str::from_utf8(&body[..eq]) {
            Ok(s) => s.to_string(),
            Err(_) => return (records, Some(PaxError::NotUtf8)),
        };
        let value = match std::str::from_utf8(&body[eq + 1..]) {
            Ok(s) => s.to_string(),
            Err(_) => return (records, Some(PaxError::NotUtf8)),
        };
        records.fields.insert(key, value);
        pos = len_start + len;
    }

    (records, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_record() {
        let payload = b"16 path=foo/bar\n";
        let (records, err) = parse(payload);
        assert!(err.is_none());
        assert_eq!(records.path(), Some("foo/bar"));
    }

    #[test]
    fn parses_multiple_records() {
        let mut payload = Vec::new();
        payload.extend_from_slice(b"16 path=foo/bar\n");
        payload.extend_from_slice(b"13 mtime=1.5\n");
        let (records, err) = parse(&payload);
        assert!(err.is_none());
        assert_eq!(records.path(), Some("foo/bar"));
        assert_eq!(records.mtime(), Some(1));
    }

    #[test]
    fn rejects_missing_equals() {
        let payload = b"8 nokey\n";
        let (_, err) = parse(payload);
        assert_eq!(err, Some(PaxError::MissingEquals));
    }

    #[test]
    fn rejects_truncated_length() {
        let payload = b"500 path=short\n";
        let (_, err) = parse(payload);
        assert_eq!(err, Some(PaxError::Truncated));
    }
}
