//! Detection and correction of double-encoded ID3 text payloads.
//!
//! Some vendors produced MP3 tags where text that already carried UTF-8
//! bytes was re-read as a single-byte string and encoded to UTF-8 a second
//! time. The result decodes fine, but every decoded code point is really a
//! raw byte value of the intended text. The round trip below undoes that by
//! laying the decoded code points back out as bytes and decoding a second
//! time. Whether the second decode shortens the text is the detection
//! signal.

use std::fmt::Write;

/// Sentinel range base for bytes that stay invalid after the round trip.
/// An undecodable byte `b` is tracked as code point `0xDC00 + b`, one
/// sentinel per byte, so code-point counts stay comparable.
const BYTE_SENTINEL_BASE: u32 = 0xDC00;

/// Outcome of checking one text payload for the double-encoding defect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrectionResult {
    /// The payload is accepted as-is. Also covers payloads that are not
    /// valid UTF-8 at all: those cannot carry this defect.
    NoDefect,
    /// The payload carries the defect; the recovered text is attached.
    Corrected(String),
}

/// Checks a UTF-8-declared text payload for the double-encoding defect and
/// recovers the intended text when it is present.
///
/// This is a heuristic: the recovered byte layout shrinking under a second
/// decode is strong evidence of the defect, but short all-latin-1 payloads
/// whose byte values happen to form valid UTF-8 are flagged too. Callers
/// get an advisory value either way; nothing is ever written back.
pub fn correct(raw: &[u8]) -> CorrectionResult {
    let once_decoded = match std::str::from_utf8(raw) {
        Ok(text) => text,
        Err(_) => return CorrectionResult::NoDefect,
    };

    let as_byte_values = encode_raw_unicode_escape(once_decoded);
    let twice_decoded = decode_utf8_with_byte_sentinels(&as_byte_values);

    // A genuine defect recombines multi-byte UTF-8 sequences on the second
    // decode, so the code-point count drops. Clean text either keeps its
    // length (sentinels are one per byte) or grows through escape text.
    if once_decoded.chars().count() > twice_decoded.len() {
        CorrectionResult::Corrected(render_code_points(&twice_decoded))
    } else {
        CorrectionResult::NoDefect
    }
}

/// Lays text out as the byte values of its code points: points up to 0xFF
/// become one literal byte, higher points become `\u`/`\U` hex escape text.
fn encode_raw_unicode_escape(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    for ch in text.chars() {
        let point = u32::from(ch);
        if point <= 0xFF {
            bytes.push(point as u8);
        } else if point <= 0xFFFF {
            let mut escape = String::with_capacity(6);
            let _ = write!(escape, "\\u{point:04x}");
            bytes.extend_from_slice(escape.as_bytes());
        } else {
            let mut escape = String::with_capacity(10);
            let _ = write!(escape, "\\U{point:08x}");
            bytes.extend_from_slice(escape.as_bytes());
        }
    }
    bytes
}

/// UTF-8 decode that never fails: valid runs become their code points and
/// every invalid byte becomes its own sentinel in 0xDC80..=0xDCFF.
fn decode_utf8_with_byte_sentinels(bytes: &[u8]) -> Vec<u32> {
    let mut points = Vec::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        points.extend(chunk.valid().chars().map(u32::from));
        for &byte in chunk.invalid() {
            points.push(BYTE_SENTINEL_BASE + u32::from(byte));
        }
    }
    points
}

/// Builds the recovered string. Sentinel points sit in the surrogate range
/// and cannot live in a `String`, so they are rendered as literal `\u{..}`
/// escape text to keep the report lossless.
fn render_code_points(points: &[u32]) -> String {
    let mut text = String::with_capacity(points.len());
    for &point in points {
        match char::from_u32(point) {
            Some(ch) => text.push(ch),
            None => {
                let _ = write!(text, "\\u{{{point:x}}}");
            }
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::{
        correct, decode_utf8_with_byte_sentinels, encode_raw_unicode_escape, CorrectionResult,
    };

    #[test]
    fn test_clean_ascii_is_no_defect() {
        assert_eq!(correct(b"Hello, World!"), CorrectionResult::NoDefect);
    }

    #[test]
    fn test_clean_multibyte_utf8_is_no_defect() {
        // "jürgen" re-laid as bytes contains 0xFC, which is invalid UTF-8;
        // the sentinel keeps the count at six, so nothing is flagged.
        assert_eq!(correct("jürgen".as_bytes()), CorrectionResult::NoDefect);
    }

    #[test]
    fn test_empty_input_is_no_defect() {
        assert_eq!(correct(b""), CorrectionResult::NoDefect);
    }

    #[test]
    fn test_invalid_utf8_input_is_no_defect() {
        assert_eq!(correct(b"\xff\xfe broken"), CorrectionResult::NoDefect);
        assert_eq!(correct(b"\xc3"), CorrectionResult::NoDefect);
        assert_eq!(correct(b"ok so far \xf0\x28\x8c"), CorrectionResult::NoDefect);
    }

    #[test]
    fn test_double_encoded_dotless_i_is_corrected() {
        // On disk: UTF-8 for "FazÄ±l Say", the double-encoded form of
        // "Fazıl Say" (U+0131 as bytes 0xC4 0xB1 read as two characters).
        let raw = "Faz\u{c4}\u{b1}l Say".as_bytes();
        assert_eq!(
            correct(raw),
            CorrectionResult::Corrected("Faz\u{131}l Say".to_string())
        );
    }

    #[test]
    fn test_synthetic_double_encoding_round_trips() {
        let original = "Türkü Söyle";
        // Rebuild the vendor defect: treat every UTF-8 byte of the original
        // as its own character, then encode that string as UTF-8.
        let corrupted: String = original.bytes().map(char::from).collect();
        assert_eq!(
            correct(corrupted.as_bytes()),
            CorrectionResult::Corrected(original.to_string())
        );
    }

    #[test]
    fn test_reapplying_to_corrected_text_is_no_defect() {
        let corrected = "Faz\u{131}l Say";
        assert_eq!(correct(corrected.as_bytes()), CorrectionResult::NoDefect);
    }

    #[test]
    fn test_latin1_lookalike_pair_is_flagged() {
        // Known trade-off: a payload that really means "Ä±" is
        // indistinguishable from the defect and gets flagged.
        assert_eq!(
            correct("\u{c4}\u{b1}".as_bytes()),
            CorrectionResult::Corrected("\u{131}".to_string())
        );
    }

    #[test]
    fn test_partial_recovery_renders_sentinel_escapes() {
        // 0xC4 0xB1 recombines to U+0131 but 0xFC stays invalid; the
        // leftover byte shows up as escape text instead of being dropped.
        let result = correct("\u{c4}\u{b1}\u{fc}".as_bytes());
        assert_eq!(
            result,
            CorrectionResult::Corrected("\u{131}\\u{dcfc}".to_string())
        );
    }

    #[test]
    fn test_raw_unicode_escape_latin1_passthrough() {
        assert_eq!(encode_raw_unicode_escape("jürgen"), b"j\xfcrgen".to_vec());
        assert_eq!(encode_raw_unicode_escape(""), Vec::<u8>::new());
    }

    #[test]
    fn test_raw_unicode_escape_bmp_codepoints() {
        assert_eq!(
            encode_raw_unicode_escape("Faz\u{131}l"),
            b"Faz\\u0131l".to_vec()
        );
    }

    #[test]
    fn test_raw_unicode_escape_astral_codepoints() {
        assert_eq!(
            encode_raw_unicode_escape("\u{1f600}"),
            b"\\U0001f600".to_vec()
        );
    }

    #[test]
    fn test_sentinel_decode_maps_each_invalid_byte() {
        assert_eq!(
            decode_utf8_with_byte_sentinels(b"j\xfc\xfdr"),
            vec![0x6A, 0xDCFC, 0xDCFD, 0x72]
        );
    }

    #[test]
    fn test_sentinel_decode_handles_truncated_sequence() {
        assert_eq!(
            decode_utf8_with_byte_sentinels(b"ab\xe2\x82"),
            vec![0x61, 0x62, 0xDCE2, 0xDC82]
        );
    }

    #[test]
    fn test_sentinel_decode_is_length_preserving_per_byte() {
        let garbage: Vec<u8> = (0x80..=0xFFu8).collect();
        assert_eq!(
            decode_utf8_with_byte_sentinels(&garbage).len(),
            garbage.len()
        );
    }
}
