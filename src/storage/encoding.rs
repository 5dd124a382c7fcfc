//! Text decoding for input files
//!
//! Inputs arrive from different tools: UTF-8 with or without a byte-order
//! mark, and the occasional Windows-1252 export. Readers decode through
//! here so every format gets the same treatment.

use crate::error::Result;
use std::path::Path;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Read a file to a string, stripping a UTF-8 BOM and falling back to
/// Windows-1252 when the bytes are not valid UTF-8.
pub fn read_text(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    Ok(decode_bytes(&bytes, path))
}

pub(crate) fn decode_bytes(bytes: &[u8], path: &Path) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            log::debug!(
                "{} is not valid UTF-8, decoding as windows-1252",
                path.display()
            );
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            text.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_bom() {
        let text = decode_bytes(b"\xEF\xBB\xBFname,height", Path::new("a.csv"));
        assert_eq!(text, "name,height");
    }

    #[test]
    fn test_windows_1252_fallback() {
        // "Zoë" with ë as 0xEB
        let text = decode_bytes(b"Zo\xEB,1.6", Path::new("a.csv"));
        assert_eq!(text, "Zoë,1.6");
    }
}
