//! File content decoding.
//!
//! Classifies a file as text or binary from a leading sample, then decodes
//! text through an ordered list of encodings. Decoding problems degrade the
//! file's content to a placeholder string. The one fatal case is a notebook
//! with an unknown cell or output type.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::notebook::{self, NotebookError, TranscodeOptions};

/// Number of leading bytes inspected for binary markers.
pub const SAMPLE_SIZE: u64 = 1024;

/// Content substituted for binary files.
pub const BINARY_PLACEHOLDER: &str = "[Binary file]";

/// Content substituted when no encoding in the fallback list applies.
pub const UNDECODABLE_PLACEHOLDER: &str = "Error: Unable to decode file with available encodings";

/// Text encodings tried, in order, when decoding file content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// UTF-8, with a leading byte-order mark stripped if present.
    Utf8,
    /// UTF-16 with BOM detection, little-endian when no BOM is present.
    Utf16,
    Utf16Le,
    Utf16Be,
    /// ISO-8859-1; maps every byte, so it always succeeds.
    Latin1,
    /// Windows code page 1252.
    Windows1252,
}

#[cfg(not(windows))]
const ENCODINGS: &[Encoding] = &[
    Encoding::Utf8,
    Encoding::Utf16,
    Encoding::Utf16Le,
    Encoding::Utf16Be,
    Encoding::Latin1,
];

#[cfg(windows)]
const ENCODINGS: &[Encoding] = &[
    Encoding::Utf8,
    Encoding::Utf16,
    Encoding::Utf16Le,
    Encoding::Utf16Be,
    Encoding::Latin1,
    Encoding::Windows1252,
];

/// The encoding fallback list for this platform.
pub fn encodings() -> &'static [Encoding] {
    ENCODINGS
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Utf16 => "utf-16",
            Encoding::Utf16Le => "utf-16-le",
            Encoding::Utf16Be => "utf-16-be",
            Encoding::Latin1 => "latin-1",
            Encoding::Windows1252 => "windows-1252",
        };
        f.write_str(name)
    }
}

impl Encoding {
    /// Strictly decode `bytes`, returning `None` on any invalid sequence.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Encoding::Utf8 => {
                let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                std::str::from_utf8(bytes).ok().map(str::to_owned)
            }
            Encoding::Utf16 => match bytes {
                [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
                [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
                _ => decode_utf16(bytes, u16::from_le_bytes),
            },
            Encoding::Utf16Le => decode_utf16(bytes, u16::from_le_bytes),
            Encoding::Utf16Be => decode_utf16(bytes, u16::from_be_bytes),
            Encoding::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
            Encoding::Windows1252 => bytes.iter().map(|&b| cp1252_char(b)).collect(),
        }
    }
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units = bytes.chunks_exact(2).map(|pair| to_unit([pair[0], pair[1]]));
    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

/// Windows-1252 differs from Latin-1 only in 0x80..=0x9F, five of which are unassigned.
fn cp1252_char(byte: u8) -> Option<char> {
    const HIGH: [Option<char>; 32] = [
        Some('\u{20AC}'), None, Some('\u{201A}'), Some('\u{0192}'),
        Some('\u{201E}'), Some('\u{2026}'), Some('\u{2020}'), Some('\u{2021}'),
        Some('\u{02C6}'), Some('\u{2030}'), Some('\u{0160}'), Some('\u{2039}'),
        Some('\u{0152}'), None, Some('\u{017D}'), None,
        None, Some('\u{2018}'), Some('\u{2019}'), Some('\u{201C}'),
        Some('\u{201D}'), Some('\u{2022}'), Some('\u{2013}'), Some('\u{2014}'),
        Some('\u{02DC}'), Some('\u{2122}'), Some('\u{0161}'), Some('\u{203A}'),
        Some('\u{0153}'), None, Some('\u{017E}'), Some('\u{0178}'),
    ];
    match byte {
        0x80..=0x9F => HIGH[usize::from(byte - 0x80)],
        _ => Some(byte as char),
    }
}

/// A sample is binary if it contains a NUL or 0xFF byte.
pub fn is_binary_sample(sample: &[u8]) -> bool {
    sample.iter().any(|&b| b == 0x00 || b == 0xFF)
}

/// Decode with the first encoding in the fallback list that accepts the bytes.
pub fn decode_bytes(bytes: &[u8]) -> Option<(String, Encoding)> {
    encodings()
        .iter()
        .find_map(|&enc| enc.decode(bytes).map(|text| (text, enc)))
}

/// Read a file's content for the digest.
///
/// Binary files, undecodable files, unreadable files and notebooks that do
/// not parse all yield a descriptive placeholder. Only a notebook with an
/// unknown cell or output type is an error.
pub fn read_content(path: &Path) -> Result<String, NotebookError> {
    let bytes = match read_text_bytes(path) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return Ok(BINARY_PLACEHOLDER.to_string()),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot read file");
            return Ok(format!("Error reading file: {e}"));
        }
    };

    let Some((text, encoding)) = decode_bytes(&bytes) else {
        tracing::warn!(path = %path.display(), "no encoding could decode file");
        return Ok(UNDECODABLE_PLACEHOLDER.to_string());
    };
    if encoding != Encoding::Utf8 {
        tracing::debug!(path = %path.display(), %encoding, "decoded with fallback encoding");
    }

    if !notebook::is_notebook(path) {
        return Ok(text);
    }
    match notebook::transcode(&text, &TranscodeOptions::default()) {
        Ok(script) => Ok(script),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot transcode notebook");
            Ok(format!("Error processing notebook: {e}"))
        }
    }
}

/// Read the whole file, or `None` if its leading sample looks binary.
fn read_text_bytes(path: &Path) -> std::io::Result<Option<Vec<u8>>> {
    let mut file = File::open(path)?;
    let mut bytes = Vec::new();
    (&mut file).take(SAMPLE_SIZE).read_to_end(&mut bytes)?;
    if bytes.is_empty() {
        return Ok(Some(bytes));
    }
    if is_binary_sample(&bytes) {
        return Ok(None);
    }
    file.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_plain_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hello.txt");
        fs::write(&path, "Hello, World!").unwrap();
        assert_eq!(read_content(&path).unwrap(), "Hello, World!");
    }

    #[test]
    fn test_empty_file_is_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.txt");
        fs::write(&path, "").unwrap();
        assert_eq!(read_content(&path).unwrap(), "");
    }

    #[test]
    fn test_single_nul_byte_is_binary() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.txt");
        let mut bytes = b"valid utf-8 text ".repeat(20);
        bytes[100] = 0x00;
        fs::write(&path, &bytes).unwrap();
        assert_eq!(read_content(&path).unwrap(), BINARY_PLACEHOLDER);
    }

    #[test]
    fn test_ff_byte_is_binary() {
        assert!(is_binary_sample(&[b'a', 0xFF, b'b']));
        assert!(!is_binary_sample(b"plain"));
    }

    #[test]
    fn test_nul_after_sample_is_not_inspected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("late.txt");
        let mut bytes = vec![b'a'; SAMPLE_SIZE as usize];
        bytes.push(0x00);
        fs::write(&path, &bytes).unwrap();
        // Past the sample, the NUL is valid UTF-8 and decodes as text.
        let content = read_content(&path).unwrap();
        assert_ne!(content, BINARY_PLACEHOLDER);
        assert_eq!(content.len(), SAMPLE_SIZE as usize + 1);
    }

    #[test]
    fn test_latin1_fallback() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("legacy.txt");
        // "café" in Latin-1, odd length so UTF-16 is rejected too.
        fs::write(&path, [b'c', b'a', b'f', 0xE9, b'!']).unwrap();
        assert_eq!(read_content(&path).unwrap(), "café!");
    }

    #[test]
    fn test_utf8_bom_stripped() {
        assert_eq!(Encoding::Utf8.decode(b"\xEF\xBB\xBFhi").as_deref(), Some("hi"));
    }

    #[test]
    fn test_utf16_variants() {
        let be = [0xFE, 0xFF, 0x00, b'h', 0x00, b'i'];
        assert_eq!(Encoding::Utf16.decode(&be).as_deref(), Some("hi"));
        assert_eq!(Encoding::Utf16Le.decode(&[b'h', 0x00]).as_deref(), Some("h"));
        assert_eq!(Encoding::Utf16Be.decode(&[0x00, b'h']).as_deref(), Some("h"));
        assert_eq!(Encoding::Utf16Le.decode(&[b'h']), None);
        // Unpaired surrogate.
        assert_eq!(Encoding::Utf16Le.decode(&[0x00, 0xD8]), None);
    }

    #[test]
    fn test_decode_order() {
        let (_, enc) = decode_bytes("héllo".as_bytes()).unwrap();
        assert_eq!(enc, Encoding::Utf8);
        let (text, enc) = decode_bytes(&[0xE9, 0x00]).unwrap();
        assert_eq!(enc, Encoding::Utf16);
        assert_eq!(text, "é");
    }

    #[test]
    fn test_windows1252() {
        assert_eq!(Encoding::Windows1252.decode(&[0x80, b'5']).as_deref(), Some("€5"));
        assert_eq!(Encoding::Windows1252.decode(&[0x81]), None);
    }

    #[test]
    fn test_notebook_transcoded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nb.ipynb");
        fs::write(
            &path,
            r#"{"cells": [{"cell_type": "code", "source": "x = 1", "outputs": []}]}"#,
        )
        .unwrap();
        let content = read_content(&path).unwrap();
        assert!(content.starts_with(notebook::HEADER));
        assert!(content.contains("x = 1"));
    }

    #[test]
    fn test_broken_notebook_recovered() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.ipynb");
        fs::write(&path, "{ not json").unwrap();
        assert!(read_content(&path).unwrap().starts_with("Error processing notebook:"));
    }

    #[test]
    fn test_unknown_cell_type_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.ipynb");
        fs::write(&path, r#"{"cells": [{"cell_type": "heading", "source": "x"}]}"#).unwrap();
        let err = read_content(&path).unwrap_err();
        assert!(matches!(err, NotebookError::UnknownCellType { .. }));
    }

    #[test]
    fn test_missing_cells_recovered() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.ipynb");
        fs::write(&path, r#"{"metadata": {}}"#).unwrap();
        assert!(read_content(&path).unwrap().starts_with("Error processing notebook:"));
    }

    #[test]
    fn test_missing_file_recovered() {
        let content = read_content(Path::new("/nonexistent/file.txt")).unwrap();
        assert!(content.starts_with("Error reading file:"));
    }
}
