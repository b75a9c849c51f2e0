//! Character encoding detection for delimited-text input

use crate::error::{KoiError, Result, UnreadableKind};
use chardetng::EncodingDetector;
use encoding_rs::Encoding;

/// Fallback encodings tried in order when the detected encoding fails
const FALLBACK_ENCODINGS: [&str; 4] = ["utf-8", "latin-1", "windows-1252", "iso-8859-1"];

/// Statistically detect the most likely character encoding of `bytes`
pub fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}

/// Decode raw bytes to text.
///
/// The detected encoding is tried first; on a lossy decode the fixed
/// fallback list is walked in order and the first clean decode wins.
pub fn decode_text(bytes: &[u8]) -> Result<String> {
    let detected = detect_encoding(bytes);
    let (text, _, had_errors) = detected.decode(bytes);
    if !had_errors {
        return Ok(text.into_owned());
    }

    for label in FALLBACK_ENCODINGS {
        let Some(encoding) = Encoding::for_label(label.as_bytes()) else {
            continue;
        };
        let (text, _, had_errors) = encoding.decode(bytes);
        if !had_errors {
            return Ok(text.into_owned());
        }
    }

    Err(KoiError::unreadable(
        UnreadableKind::UndecodableBytes,
        "no supported character encoding decodes this file cleanly",
    ))
}
