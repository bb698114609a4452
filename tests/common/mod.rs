//! Shared fixture helpers for integration tests: building minimal ustar
//! archives and gzip-compressing them, the way the package ingester
//! expects to find them on disk.

use std::io::Write;

const BLOCK_SIZE: usize = 512;

pub struct TarBuilder {
    buf: Vec<u8>,
}

impl TarBuilder {
    pub fn new() -> Self {
        TarBuilder { buf: Vec::new() }
    }

    pub fn add_file(self, name: &str, payload: &[u8]) -> Self {
        self.add_entry(name, payload, b'0')
    }

    /// Adds a symlink entry (`typeflag == '2'`): no payload, a name only.
    pub fn add_symlink(self, name: &str) -> Self {
        self.add_entry(name, b"", b'2')
    }

    fn add_entry(mut self, name: &str, payload: &[u8], typeflag: u8) -> Self {
        let mut block = [0u8; BLOCK_SIZE];
        let name_bytes = name.as_bytes();
        block[0..name_bytes.len()].copy_from_slice(name_bytes);
        let mode = format!("{:07o}\0", 0o644);
        block[100..100 + mode.len()].copy_from_slice(mode.as_bytes());
        let size_oct = format!("{:011o}\0", payload.len());
        block[124..124 + size_oct.len()].copy_from_slice(size_oct.as_bytes());
        let mtime_oct = format!("{:011o}\0", 0);
        block[136..136 + mtime_oct.len()].copy_from_slice(mtime_oct.as_bytes());
        block[156] = typeflag;
        block[257..263].copy_from_slice(b"ustar\0");
        self.buf.extend_from_slice(&block);
        self.buf.extend_from_slice(payload);
        let pad = (BLOCK_SIZE - (payload.len() % BLOCK_SIZE)) % BLOCK_SIZE;
        self.buf.extend(std::iter::repeat(0u8).take(pad));
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.buf.extend(std::iter::repeat(0u8).take(BLOCK_SIZE * 2));
        self.buf
    }
}

pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

/// Writes a minimal package tarball (package.json + optional README) to
/// `dir/file_name` and returns its path.
pub fn write_package_tarball(
    dir: &std::path::Path,
    file_name: &str,
    package_json: &str,
    readme: Option<&str>,
) -> std::path::PathBuf {
    let mut tar = TarBuilder::new().add_file("package/package.json", package_json.as_bytes());
    if let Some(readme) = readme {
        tar = tar.add_file("package/README.md", readme.as_bytes());
    }
    let archive = tar.finish();
    let compressed = gzip(&archive);
    let path = dir.join(file_name);
    std::fs::write(&path, compressed).unwrap();
    path
}
