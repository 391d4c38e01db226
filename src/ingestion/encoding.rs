//! Text encodings tried by the raw loader.

use std::fmt;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};
use serde::{Deserialize, Serialize};

/// A text encoding candidate for delimited exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextEncoding {
    /// UTF-8, with an optional leading byte-order mark.
    #[serde(rename = "utf-8-sig")]
    Utf8Sig,
    /// UTF-16; endianness from the byte-order mark, little-endian without one.
    #[serde(rename = "utf-16")]
    Utf16,
    /// Windows-1252 (a superset of printable latin-1). Never fails to decode.
    #[serde(rename = "windows-1252")]
    Windows1252,
}

impl TextEncoding {
    /// Default priority order.
    pub const DEFAULT_ORDER: [TextEncoding; 3] = [
        TextEncoding::Utf8Sig,
        TextEncoding::Utf16,
        TextEncoding::Windows1252,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TextEncoding::Utf8Sig => "utf-8-sig",
            TextEncoding::Utf16 => "utf-16",
            TextEncoding::Windows1252 => "windows-1252",
        }
    }

    /// Strictly decode `bytes`. Malformed input is an error, never replaced.
    pub fn decode(self, bytes: &[u8]) -> Result<String, String> {
        match self {
            TextEncoding::Utf8Sig => {
                let body = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
                let text = strict_decode(UTF_8, body)?;
                // UTF-16 text without a BOM is valid UTF-8 full of NULs.
                if text.contains('\0') {
                    return Err("decoded text contains NUL characters".to_string());
                }
                Ok(text)
            }
            TextEncoding::Utf16 => {
                let (encoding, body, has_bom) = match bytes {
                    [0xFF, 0xFE, rest @ ..] => (UTF_16LE, rest, true),
                    [0xFE, 0xFF, rest @ ..] => (UTF_16BE, rest, true),
                    _ => (UTF_16LE, bytes, false),
                };
                if body.len() % 2 != 0 {
                    return Err(format!("odd byte length {} for utf-16", body.len()));
                }
                let text = strict_decode(encoding, body)?;
                // Single-byte text read as UTF-16 pairs up into non-ASCII code units only.
                if !has_bom && !text.chars().any(|c| c.is_ascii()) {
                    return Err("no byte-order mark and no ascii text for utf-16".to_string());
                }
                Ok(text)
            }
            TextEncoding::Windows1252 => {
                let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
                Ok(text.into_owned())
            }
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn strict_decode(encoding: &'static Encoding, bytes: &[u8]) -> Result<String, String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
        .ok_or_else(|| format!("malformed {} byte sequence", encoding.name()))
}
