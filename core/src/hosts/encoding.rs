//! Text encodings the hosts file is known to come in.
//!
//! Decoding tries, in order: UTF-8 with a byte-order mark, strict UTF-8,
//! then GBK (common on Chinese Windows installs). If none decodes cleanly the
//! bytes are read as lossy UTF-8. Line endings are normalized to `\n`; every
//! write uses `\n`.

use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

use encoding_rs::GBK;
use tracing::{debug, warn};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// UTF-8 with a leading byte-order mark.
    Utf8Sig,
    #[default]
    Utf8,
    Gbk,
}

impl TextEncoding {
    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::Utf8Sig => "utf-8-sig",
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Gbk => "gbk",
        }
    }

    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            TextEncoding::Utf8 => text.as_bytes().to_vec(),
            TextEncoding::Utf8Sig => {
                let mut out = Vec::with_capacity(UTF8_BOM.len() + text.len());
                out.extend_from_slice(UTF8_BOM);
                out.extend_from_slice(text.as_bytes());
                out
            }
            TextEncoding::Gbk => {
                let (bytes, _, unmappable) = GBK.encode(text);
                if unmappable {
                    warn!("some characters cannot be represented in GBK and were escaped");
                }
                bytes.into_owned()
            }
        }
    }

    /// Strict decode; `None` if the bytes are not valid in this encoding.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8Sig => bytes
                .strip_prefix(UTF8_BOM)
                .and_then(|rest| std::str::from_utf8(rest).ok())
                .map(str::to_string),
            TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
            TextEncoding::Gbk => GBK
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(Cow::into_owned),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8-sig" | "utf8-sig" => Ok(TextEncoding::Utf8Sig),
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "gbk" | "cp936" => Ok(TextEncoding::Gbk),
            other => Err(format!("unsupported encoding '{other}'")),
        }
    }
}

/// Decoded file text plus the encoding it was stored in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding: TextEncoding,
}

pub fn decode_bytes(bytes: &[u8]) -> DecodedText {
    let candidates = [TextEncoding::Utf8Sig, TextEncoding::Utf8, TextEncoding::Gbk];
    for encoding in candidates {
        if let Some(text) = encoding.decode(bytes) {
            return DecodedText {
                text: normalize_newlines(text),
                encoding,
            };
        }
    }

    debug!("no strict decoding matched, reading as lossy utf-8");
    DecodedText {
        text: normalize_newlines(String::from_utf8_lossy(bytes).into_owned()),
        encoding: TextEncoding::Utf8,
    }
}

pub fn read_text(path: &Path) -> io::Result<DecodedText> {
    let bytes = fs::read(path)?;
    Ok(decode_bytes(&bytes))
}

/// Reads a file that is known to be in `encoding`, falling back to detection.
pub fn read_text_as(path: &Path, encoding: TextEncoding) -> io::Result<String> {
    let bytes = fs::read(path)?;
    match encoding.decode(&bytes) {
        Some(text) => Ok(normalize_newlines(text)),
        None => Ok(decode_bytes(&bytes).text),
    }
}

fn normalize_newlines(text: String) -> String {
    if text.contains('\r') {
        text.replace("\r\n", "\n")
    } else {
        text
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bom_is_detected_and_preserved_on_encode() {
        let decoded = decode_bytes(b"\xEF\xBB\xBF127.0.0.1 localhost\r\n");
        assert_eq!(decoded.encoding, TextEncoding::Utf8Sig);
        assert_eq!(decoded.text, "127.0.0.1 localhost\n");
        assert_eq!(
            decoded.encoding.encode(&decoded.text),
            b"\xEF\xBB\xBF127.0.0.1 localhost\n".to_vec()
        );
    }

    #[test]
    fn plain_utf8_wins_over_gbk() {
        let decoded = decode_bytes("# 注释\n".as_bytes());
        assert_eq!(decoded.encoding, TextEncoding::Utf8);
        assert_eq!(decoded.text, "# 注释\n");
    }

    #[test]
    fn gbk_bytes_fall_through_to_gbk() {
        let (bytes, _, _) = GBK.encode("# 本地主机\n");
        let decoded = decode_bytes(&bytes);
        assert_eq!(decoded.encoding, TextEncoding::Gbk);
        assert_eq!(decoded.text, "# 本地主机\n");
        assert_eq!(TextEncoding::Gbk.encode(&decoded.text), bytes.into_owned());
    }

    #[test]
    fn names_parse_back() {
        for enc in [TextEncoding::Utf8Sig, TextEncoding::Utf8, TextEncoding::Gbk] {
            assert_eq!(enc.name().parse::<TextEncoding>(), Ok(enc));
        }
        assert_eq!("UTF8".parse::<TextEncoding>(), Ok(TextEncoding::Utf8));
        assert!("latin-1".parse::<TextEncoding>().is_err());
    }
}
