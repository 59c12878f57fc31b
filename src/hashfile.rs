// Hash extraction from line-based hc22000 files.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use crate::error::{Error, Result};

/// Longest line accepted. Real hc22000 lines are a few hundred bytes.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Returns the first line with non-whitespace content, trimmed.
///
/// Bytes that are not valid UTF-8 are dropped rather than rejected. An empty
/// or all-blank file yields `Ok(None)`; a line over [`MAX_LINE_BYTES`] is an
/// I/O error instead of being buffered whole.
pub fn read_first_hash(path: &Path) -> Result<Option<String>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = (&mut reader)
            .take(MAX_LINE_BYTES as u64 + 1)
            .read_until(b'\n', &mut buf)
            .map_err(|e| Error::io(path, e))?;
        if read == 0 {
            return Ok(None);
        }
        if buf.len() > MAX_LINE_BYTES && buf.last() != Some(&b'\n') {
            return Err(Error::io(
                path,
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("line longer than {MAX_LINE_BYTES} bytes"),
                ),
            ));
        }
        let text = decode_ignoring_errors(&buf);
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            return Ok(Some(trimmed.to_string()));
        }
    }
}

/// Like [`read_first_hash`] but treats "no hash" as an error.
pub fn require_first_hash(path: &Path) -> Result<String> {
    read_first_hash(path)?.ok_or_else(|| Error::NoHashFound(path.to_path_buf()))
}

fn decode_ignoring_errors(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

#[cfg(test)]
mod tests {
    use super::decode_ignoring_errors;

    #[test]
    fn invalid_bytes_are_dropped() {
        let bytes = b"WPA*02*\xff\xfeabc";
        assert_eq!(decode_ignoring_errors(bytes), "WPA*02*abc");
    }

    #[test]
    fn valid_multibyte_text_survives() {
        assert_eq!(decode_ignoring_errors("caf\u{e9}".as_bytes()), "caf\u{e9}");
    }
}
