//! Base64 and checksum services
//!
//! Line-list transforms for base64 encoding/decoding plus file checksums.
//! Decoding failures fall back to the untouched input, in line with the
//! never-throw recovery used elsewhere in the pipeline.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha1::{Digest, Sha1};
use sha2::Sha256;
use std::fs;
use std::io;
use std::path::Path;

/// Classic base64 output wraps at 76 columns
const B64_LINE_WIDTH: usize = 76;

/// Base64-encode the content (lines joined with `\n`).
pub fn encode_lines(lines: &[String]) -> Vec<String> {
    let joined = lines.join("\n");
    let encoded = STANDARD.encode(joined.as_bytes());
    if encoded.is_empty() {
        return Vec::new();
    }
    encoded
        .as_bytes()
        .chunks(B64_LINE_WIDTH)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect()
}

/// Base64-decode the content. Whitespace between lines is ignored; invalid
/// input is returned untouched.
pub fn decode_lines(lines: &[String]) -> Vec<String> {
    let joined: String = lines
        .iter()
        .flat_map(|l| l.chars())
        .filter(|c| !c.is_whitespace())
        .collect();
    match STANDARD.decode(joined.as_bytes()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes)
            .lines()
            .map(|l| l.to_string())
            .collect(),
        Err(_) => lines.to_vec(),
    }
}

/// Checksums of one file's raw bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksums {
    pub crc32: String,
    pub sha1: String,
    pub sha256: String,
}

/// Compute all checksums over a byte slice.
pub fn checksums(bytes: &[u8]) -> Checksums {
    let crc32 = format!("{:08x}", crc32fast::hash(bytes));
    let sha1 = format!("{:x}", Sha1::digest(bytes));
    let sha256 = format!("{:x}", Sha256::digest(bytes));
    Checksums {
        crc32,
        sha1,
        sha256,
    }
}

/// Compute all checksums over a file's raw bytes.
pub fn file_checksums(path: &Path) -> io::Result<Checksums> {
    Ok(checksums(&fs::read(path)?))
}
