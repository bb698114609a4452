//! Semantic Versioning 2.0.0 parsing and total ordering.
//!
//! This is a from-scratch implementation, not a wrapper around the
//! `semver` crate: the comparator walks the original input string and
//! never allocates in the hot path, per the design's allocation-free
//! requirement.

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SemverError {
    #[error("version string is empty")]
    Empty,
    #[error("non-ASCII byte in version string")]
    NonAscii,
    #[error("invalid numeric identifier")]
    BadNumber,
    #[error("invalid pre-release identifier")]
    BadLabel,
    #[error("invalid build metadata identifier")]
    BadBuild,
    #[error("trailing characters after version")]
    Trailing,
    #[error("missing numeric component")]
    MissingComponent,
}

/// A parsed version, represented as byte ranges over the original input.
///
/// `major`/`minor`/`patch` are ranges into `input` holding the decimal
/// digits of each numeric component. `label` and `build` are the
/// dot-separated identifier lists, stored as ranges over `input` as well;
/// identifier boundaries within them are recomputed on demand during
/// comparison rather than materialized into a `Vec`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemVer<'a> {
    input: &'a str,
    major: (usize, usize),
    minor: (usize, usize),
    patch: (usize, usize),
    label: Option<(usize, usize)>,
    build: Option<(usize, usize)>,
}

impl<'a> SemVer<'a> {
    pub fn parse(input: &'a str) -> Result<Self, SemverError> {
        if input.is_empty() {
            return Err(SemverError::Empty);
        }
        if !input.is_ascii() {
            return Err(SemverError::NonAscii);
        }
        let bytes = input.as_bytes();
        let mut pos = 0usize;

        let major = parse_number(bytes, &mut pos)?;
        expect_byte(bytes, &mut pos, b'.')?;
        let minor = parse_number(bytes, &mut pos)?;
        expect_byte(bytes, &mut pos, b'.')?;
        let patch = parse_number(bytes, &mut pos)?;

        let mut label = None;
        if pos < bytes.len() && bytes[pos] == b'-' {
            pos += 1;
            let start = pos;
            parse_dotted_identifiers(bytes, &mut pos, false)?;
            if pos == start {
                return Err(SemverError::BadLabel);
            }
            label = Some((start, pos));
        }

        let mut build = None;
        if pos < bytes.len() && bytes[pos] == b'+' {
            pos += 1;
            let start = pos;
            parse_dotted_identifiers(bytes, &mut pos, true)?;
            if pos == start {
                return Err(SemverError::BadBuild);
            }
            build = Some((start, pos));
        }

        if pos != bytes.len() {
            return Err(SemverError::Trailing);
        }

        Ok(SemVer { input, major, minor, patch, label, build })
    }

    fn major_str(&self) -> &'a str {
        &self.input[self.major.0..self.major.1]
    }
    fn minor_str(&self) -> &'a str {
        &self.input[self.minor.0..self.minor.1]
    }
    fn patch_str(&self) -> &'a str {
        &self.input[self.patch.0..self.patch.1]
    }
    fn label_str(&self) -> Option<&'a str> {
        self.label.map(|(s, e)| &self.input[s..e])
    }

    pub fn has_prerelease(&self) -> bool {
        self.label.is_some()
    }

    /// Full precedence comparison per semver.org §11; build metadata is
    /// ignored, matching `1.0.0-a == 1.0.0-a+anything`.
    pub fn compare(&self, other: &SemVer<'_>) -> Ordering {
        compare_numeric_str(self.major_str(), other.major_str())
            .then_with(|| compare_numeric_str(self.minor_str(), other.minor_str()))
            .then_with(|| compare_numeric_str(self.patch_str(), other.patch_str()))
            .then_with(|| compare_prerelease(self.label_str(), other.label_str()))
    }
}

impl<'a> fmt::Display for SemVer<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major_str(), self.minor_str(), self.patch_str())?;
        if let Some((s, e)) = self.label {
            write!(f, "-{}", &self.input[s..e])?;
        }
        if let Some((s, e)) = self.build {
            write!(f, "+{}", &self.input[s..e])?;
        }
        Ok(())
    }
}

impl<'a> PartialOrd for SemVer<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl<'a> Ord for SemVer<'a> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

fn expect_byte(bytes: &[u8], pos: &mut usize, b: u8) -> Result<(), SemverError> {
    if *pos < bytes.len() && bytes[*pos] == b {
        *pos += 1;
        Ok(())
    } else {
        Err(SemverError::MissingComponent)
    }
}

/// Parses one numeric component: ASCII digits, no leading zero unless the
/// value is exactly "0". Returns the byte range of the digits.
fn parse_number(bytes: &[u8], pos: &mut usize) -> Result<(usize, usize), SemverError> {
    let start = *pos;
    while *pos < bytes.len() && bytes[*pos].is_ascii_digit() {
        *pos += 1;
    }
    if *pos == start {
        return Err(SemverError::BadNumber);
    }
    let digits = &bytes[start..*pos];
    if digits.len() > 1 && digits[0] == b'0' {
        return Err(SemverError::BadNumber);
    }
    Ok((start, *pos))
}

/// Parses a dot-separated identifier list in place, validating grammar:
/// non-empty identifiers from `[0-9A-Za-z-]`, with (for `build == false`,
/// i.e. pre-release labels) the numeric-identifier leading-zero rule.
fn parse_dotted_identifiers(bytes: &[u8], pos: &mut usize, build: bool) -> Result<(), SemverError> {
    loop {
        let start = *pos;
        while *pos < bytes.len() && is_ident_byte(bytes[*pos]) {
            *pos += 1;
        }
        if *pos == start {
            return Err(if build { SemverError::BadBuild } else { SemverError::BadLabel });
        }
        let ident = &bytes[start..*pos];
        if !build {
            let all_digits = ident.iter().all(u8::is_ascii_digit);
            if all_digits && ident.len() > 1 && ident[0] == b'0' {
                return Err(SemverError::BadLabel);
            }
        }
        if *pos < bytes.len() && bytes[*pos] == b'.' {
            *pos += 1;
            continue;
        }
        break;
    }
    Ok(())
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-'
}

/// Compares two numeric-component strings (already validated: digits only,
/// no invalid leading zero) as unsigned integers: longer wins, else
/// lexicographic (equivalent once leading zeros are ruled out).
fn compare_numeric_str(a: &str, b: &str) -> Ordering {
    match a.len().cmp(&b.len()) {
        Ordering::Equal => a.cmp(b),
        other => other,
    }
}

fn is_numeric_ident(ident: &str) -> bool {
    !ident.is_empty() && ident.bytes().all(|b| b.is_ascii_digit())
}

fn compare_prerelease(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        // A version with a pre-release label has lower precedence.
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some(a), Some(b)) => {
            let mut ai = a.split('.');
            let mut bi = b.split('.');
            loop {
                match (ai.next(), bi.next()) {
                    (None, None) => return Ordering::Equal,
                    (None, Some(_)) => return Ordering::Less,
                    (Some(_), None) => return Ordering::Greater,
                    (Some(x), Some(y)) => {
                        let ord = compare_identifier(x, y);
                        if ord != Ordering::Equal {
                            return ord;
                        }
                    }
                }
            }
        }
    }
}

fn compare_identifier(a: &str, b: &str) -> Ordering {
    match (is_numeric_ident(a), is_numeric_ident(b)) {
        (true, true) => compare_numeric_str(a, b),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.as_bytes().cmp(b.as_bytes()),
    }
}
