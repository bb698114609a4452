//! Streaming SHA-1 digest over a `Read`, without buffering the whole file.

use std::io::{self, Read};

use sha1::{Digest, Sha1};

const CHUNK: usize = 64 * 1024;

/// Computes the lowercase hex SHA-1 digest of everything `reader` yields.
pub fn sha1_hex<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; CHUNK];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
