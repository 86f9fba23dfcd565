//! Line sources
//!
//! Produces a finite, forward-only sequence of text lines from a file path
//! plus an encoding label. Decoding is lossy; an open failure substitutes a
//! single visible error line into the stream instead of raising.

use encoding_rs::{Encoding, UTF_8};
use std::fs;
use std::io::{self, BufRead};
use std::path::Path;

/// Resolve an `enc=` label to an encoding, if it names one.
pub fn resolve_encoding(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}

/// Decode raw bytes into lines using the given encoding (lossy).
pub fn decode_lines(bytes: &[u8], encoding: &'static Encoding) -> Vec<String> {
    let (text, _, _) = encoding.decode(bytes);
    split_lines(&text)
}

/// Split decoded text into lines, accepting `\n` and `\r\n` endings.
fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.lines().map(|l| l.to_string()).collect()
}

/// Open a file as a forward-only line iterator.
///
/// The iterator is restartable only by re-opening. An open or read failure
/// yields one error line and then ends.
pub fn open_lines(
    path: &Path,
    encoding: Option<&'static Encoding>,
) -> Box<dyn Iterator<Item = String>> {
    let display = path.display().to_string();
    match fs::read(path) {
        Ok(bytes) => {
            let enc = encoding.unwrap_or(UTF_8);
            Box::new(decode_lines(&bytes, enc).into_iter())
        }
        Err(err) => Box::new(std::iter::once(error_line(&display, &err))),
    }
}

/// Read all lines of a file eagerly.
pub fn read_lines(path: &Path, encoding: Option<&'static Encoding>) -> Vec<String> {
    open_lines(path, encoding).collect()
}

/// A forward-only line iterator over standard input (lossy UTF-8).
pub fn stdin_lines() -> Box<dyn Iterator<Item = String>> {
    let stdin = io::stdin();
    Box::new(
        stdin
            .lock()
            .lines()
            .map_while(|res| res.ok()),
    )
}

/// The error line substituted into the content stream on open failure.
pub fn error_line(display: &str, err: &io::Error) -> String {
    format!("catx: cannot open {}: {}", display, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_read_lines_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.txt");
        fs::write(&path, "one\ntwo\nthree\n").unwrap();

        let lines = read_lines(&path, None);
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_read_lines_crlf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crlf.txt");
        fs::write(&path, "a\r\nb\r\n").unwrap();

        let lines = read_lines(&path, None);
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn test_read_lines_latin1() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latin1.txt");
        // "café" in latin-1
        fs::write(&path, [0x63, 0x61, 0x66, 0xe9]).unwrap();

        let enc = resolve_encoding("latin1").unwrap();
        let lines = read_lines(&path, Some(enc));
        assert_eq!(lines, vec!["café"]);
    }

    #[test]
    fn test_open_failure_substitutes_error_line() {
        let lines: Vec<String> = open_lines(Path::new("/nonexistent/file.txt"), None).collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("catx: cannot open /nonexistent/file.txt"));
    }

    #[test]
    fn test_resolve_encoding() {
        assert!(resolve_encoding("utf-8").is_some());
        assert!(resolve_encoding("UTF-8").is_some());
        assert!(resolve_encoding("shift_jis").is_some());
        assert!(resolve_encoding("not-an-encoding").is_none());
    }

    #[test]
    fn test_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.txt");
        fs::write(&path, "").unwrap();
        assert!(read_lines(&path, None).is_empty());
    }
}
