//! Streaming tar reader: decodes a concatenation of 512-byte header blocks
//! from a byte stream, honoring ustar, pax `x`/`g` extended headers, and
//! GNU `L` long-name records, and yields logical entries without
//! buffering the whole archive.

pub mod header;
pub mod pax;

use std::io::{self, Read};

use thiserror::Error;

use header::{padded_len, Header, TypeFlag, BLOCK_SIZE};
use pax::PaxRecords;

#[derive(Debug, Error)]
pub enum TarError {
    #[error("io error reading tar stream: {0}")]
    Io(#[from] io::Error),
}

/// One logical entry: its final (post pax/long-name override) name, type,
/// size, mtime, and a bounded reader over its payload.
pub struct TarEntry {
    pub name: String,
    pub size: u64,
    pub mtime: i64,
    pub typeflag: TypeFlag,
}

pub struct TarReader<R: Read> {
    inner: R,
    pending_long_name: Option<String>,
    pending_pax: PaxRecords,
    global_pax: PaxRecords,
    /// Bytes of the current entry's payload + padding not yet consumed by
    /// the caller; drained before the next header read.
    unread_payload: u64,
    finished: bool,
    /// Entries whose typeflag is neither a regular file nor a directory
    /// (symlinks, hardlinks, contiguous files, ...): these are drained and
    /// logged inside `next_entry` itself rather than yielded as a
    /// `TarEntry`, so the count is exposed here for callers (the ingester)
    /// that want to report them alongside the entries they do see.
    other_entries: usize,
}

impl<R: Read> TarReader<R> {
    pub fn new(inner: R) -> Self {
        TarReader {
            inner,
            pending_long_name: None,
            pending_pax: PaxRecords::default(),
            global_pax: PaxRecords::default(),
            unread_payload: 0,
            finished: false,
            other_entries: 0,
        }
    }

    /// Count of entries skipped inside `next_entry` because their typeflag
    /// was neither a regular file nor a directory (symlinks, hardlinks,
    /// contiguous files, and any other dialect-specific type).
    pub fn other_entries(&self) -> usize {
        self.other_entries
    }

    /// Drains whatever remains of the previous entry's payload + its
    /// padding to the next 512-byte boundary.
    fn skip_remaining(&mut self) -> Result<(), TarError> {
        if self.unread_payload == 0 {
            return Ok(());
        }
        let mut buf = [0u8; BLOCK_SIZE];
        let mut remaining = self.unread_payload;
        while remaining > 0 {
            let chunk = remaining.min(BLOCK_SIZE as u64) as usize;
            self.inner.read_exact(&mut buf[..chunk])?;
            remaining -= chunk as u64;
        }
        self.unread_payload = 0;
        Ok(())
    }

    fn read_block(&mut self) -> Result<Option<[u8; BLOCK_SIZE]>, TarError> {
        let mut block = [0u8; BLOCK_SIZE];
        let mut read = 0usize;
        while read < BLOCK_SIZE {
            let n = self.inner.read(&mut block[read..])?;
            if n == 0 {
                // Truncated header: end the archive cleanly.
                return Ok(None);
            }
            read += n;
        }
        Ok(Some(block))
    }

    fn read_meta_payload(&mut self, size: u64) -> Result<Vec<u8>, TarError> {
        let mut data = vec![0u8; size as usize];
        self.inner.read_exact(&mut data)?;
        let pad = padded_len(size) - size;
        if pad > 0 {
            let mut discard = vec![0u8; pad as usize];
            self.inner.read_exact(&mut discard)?;
        }
        Ok(data)
    }

    /// Reads the next logical entry, applying any chained pax/long-name
    /// state. Returns `Ok(None)` at a clean end of archive.
    pub fn next_entry(&mut self) -> Result<Option<TarEntry>, TarError> {
        loop {
            self.skip_remaining()?;

            let block = match self.read_block()? {
                Some(b) => b,
                None => return Ok(None),
            };
            let header = match header::decode(&block) {
                Some(h) => h,
                None => return Ok(None),
            };

            match header.typeflag {
                TypeFlag::GnuLongName => {
                    let data = self.read_meta_payload(header.size)?;
                    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
                    self.pending_long_name = Some(String::from_utf8_lossy(&data[..end]).into_owned());
                    continue;
                }
                TypeFlag::PaxExtended => {
                    let data = self.read_meta_payload(header.size)?;
                    let (records, err) = pax::parse(&data);
                    if let Some(err) = &err {
                        tracing::warn!(error = %err, "malformed pax extended header, entry skipped");
                    }
                    self.pending_pax = records;
                    continue;
                }
                TypeFlag::PaxGlobalExtended => {
                    let data = self.read_meta_payload(header.size)?;
                    let (records, err) = pax::parse(&data);
                    if let Some(err) = &err {
                        tracing::warn!(error = %err, "malformed pax global header, entry skipped");
                    }
                    self.global_pax.merge_from(&records);
                    continue;
                }
                TypeFlag::Other(other) => {
                    tracing::debug!(typeflag = other, name = %header.name, "skipping unrecognized tar entry type");
                    self.other_entries += 1;
                    self.unread_payload = padded_len(header.size);
                    continue;
                }
                TypeFlag::Regular | TypeFlag::Directory => {
                    let mut name = header.name;
                    let mut mtime = header.mtime;
                    let mut size = header.size;

                    if let Some(long_name) = self.pending_long_name.take() {
                        name = long_name;
                    }

                    let mut effective = self.global_pax.clone();
                    effective.merge_from(&self.pending_pax);
                    self.pending_pax.clear();

                    if let Some(p) = effective.path() {
                        name = p.to_string();
                    }
                    if let Some(m) = effective.mtime() {
                        mtime = m;
                    }
                    if let Some(s) = effective.size() {
                        size = s;
                    }

                    self.unread_payload = padded_len(size);

                    return Ok(Some(TarEntry { name, size, mtime, typeflag: header.typeflag }));
                }
            }
        }
    }

    /// Reads up to `size` bytes of the current entry's payload (the
    /// caller must have just received this entry from `next_entry`).
    /// Unread bytes and padding are discarded automatically before the
    /// next `next_entry` call.
    pub fn read_entry_payload(&mut self, size: u64) -> Result<Vec<u8>, TarError> {
        let to_read = size.min(self.unread_payload) as usize;
        let mut data = vec![0u8; to_read];
        self.inner.read_exact(&mut data)?;
        self.unread_payload -= to_read as u64;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn write_header(
        out: &mut Vec<u8>,
        name: &str,
        size: u64,
        typeflag: u8,
        mtime: u64,
    ) {
        let mut block = [0u8; BLOCK_SIZE];
        block[0..name.len()].copy_from_slice(name.as_bytes());
        let mode = format!("{:07o}\0", 0o644);
        block[100..100 + mode.len()].copy_from_slice(mode.as_bytes());
        let size_oct = format!("{size:011o}\0");
        block[124..124 + size_oct.len()].copy_from_slice(size_oct.as_bytes());
        let mtime_oct = format!("{mtime:011o}\0");
        block[136..136 + mtime_oct.len()].copy_from_slice(mtime_oct.as_bytes());
        block[156] = typeflag;
        block[257..263].copy_from_slice(b"ustar\0");
        out.extend_from_slice(&block);
    }

    fn write_payload(out: &mut Vec<u8>, payload: &[u8]) {
        out.extend_from_slice(payload);
        let pad = padded_len(payload.len() as u64) - payload.len() as u64;
        out.extend(std::iter::repeat(0u8).take(pad as usize));
    }

    #[test]
    fn reads_single_regular_entry() {
        let mut archive = Vec::new();
        write_header(&mut archive, "package/package.json", 13, b'0', 0);
        write_payload(&mut archive, b"{\"a\":\"b\"}xyz");
        archive.extend(std::iter::repeat(0u8).take(BLOCK_SIZE * 2));

        let mut reader = TarReader::new(Cursor::new(archive));
        let entry = reader.next_entry().unwrap().unwrap();
        assert_eq!(entry.name, "package/package.json");
        assert_eq!(entry.size, 13);
        let payload = reader.read_entry_payload(entry.size).unwrap();
        assert_eq!(payload, b"{\"a\":\"b\"}xyz");
        assert!(reader.next_entry().unwrap().is_none());
    }

    #[test]
    fn gnu_long_name_overrides_next_entry() {
        let mut archive = Vec::new();
        let long_name = "package/a/very/long/nested/path/that/exceeds/the/classic/hundred/byte/field/package.json";
        write_header(&mut archive, "", long_name.len() as u64 + 1, b'L', 0);
        write_payload(&mut archive, format!("{long_name}\0").as_bytes());
        write_header(&mut archive, "truncated-name", 3, b'0', 0);
        write_payload(&mut archive, b"xyz");
        archive.extend(std::iter::repeat(0u8).take(BLOCK_SIZE * 2));

        let mut reader = TarReader::new(Cursor::new(archive));
        let entry = reader.next_entry().unwrap().unwrap();
        assert_eq!(entry.name, long_name);
    }

    #[test]
    fn pax_extended_header_overrides_path() {
        let mut archive = Vec::new();
        let record = b"26 path=package/README.md\n";
        write_header(&mut archive, "PaxHeader/whatever", record.len() as u64, b'x', 0);
        write_payload(&mut archive, record);
        write_header(&mut archive, "ignored", 5, b'0', 0);
        write_payload(&mut archive, b"hello");
        archive.extend(std::iter::repeat(0u8).take(BLOCK_SIZE * 2));

        let mut reader = TarReader::new(Cursor::new(archive));
        let entry = reader.next_entry().unwrap().unwrap();
        assert_eq!(entry.name, "package/README.md");
    }

    #[test]
    fn unread_payload_is_skipped() {
        let mut archive = Vec::new();
        write_header(&mut archive, "skip-me", 5, b'0', 0);
        write_payload(&mut archive, b"hello");
        write_header(&mut archive, "next", 3, b'0', 0);
        write_payload(&mut archive, b"abc");
        archive.extend(std::iter::repeat(0u8).take(BLOCK_SIZE * 2));

        let mut reader = TarReader::new(Cursor::new(archive));
        let first = reader.next_entry().unwrap().unwrap();
        assert_eq!(first.name, "skip-me");
        // Don't read its payload at all; next_entry must skip it + padding.
        let second = reader.next_entry().unwrap().unwrap();
        assert_eq!(second.name, "next");
        let payload = reader.read_entry_payload(second.size).unwrap();
        assert_eq!(payload, b"abc");
    }

    #[test]
    fn symlink_entries_are_counted_but_not_yielded() {
        let mut archive = Vec::new();
        // typeflag '2' is a symlink: neither regular file nor directory.
        write_header(&mut archive, "package/link-to-somewhere", 0, b'2', 0);
        write_header(&mut archive, "package/package.json", 2, b'0', 0);
        write_payload(&mut archive, b"{}");
        archive.extend(std::iter::repeat(0u8).take(BLOCK_SIZE * 2));

        let mut reader = TarReader::new(Cursor::new(archive));
        let entry = reader.next_entry().unwrap().unwrap();
        assert_eq!(entry.name, "package/package.json");
        assert_eq!(reader.other_entries(), 1);
        assert!(reader.next_entry().unwrap().is_none());
    }

    #[test]
    fn truncated_header_ends_archive_cleanly() {
        let mut archive = Vec::new();
        write_header(&mut archive, "only-header", 0, b'0', 0);
        archive.truncate(300); // chop the header short
        let mut reader = TarReader::new(Cursor::new(archive));
        assert!(reader.next_entry().unwrap().is_none());
    }
}
