//! Byte decoding and text cleanup shared by the extractor, inferencer and
//! renderer.

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_META_CHARSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?\s*([a-z0-9_\-:.]+)"#).unwrap());

/// How far into the document a `<meta charset>` declaration is looked for.
const CHARSET_SNIFF_LEN: usize = 1024;

/// Decode a fetched HTML body.
///
/// A byte-order mark wins, then a charset declared in the document head,
/// then UTF-8.
pub fn decode_html(bytes: &[u8]) -> String {
    let declared = sniff_charset(bytes).unwrap_or(UTF_8);
    // `decode` performs BOM sniffing before falling back to `declared`.
    let (text, used, had_errors) = declared.decode(bytes);
    if had_errors {
        tracing::debug!(encoding = used.name(), "page contained malformed byte sequences");
    }
    text.into_owned()
}

/// A document that could declare itself in ASCII is not UTF-16, so a
/// UTF-16 (or `replacement`) label maps to its output encoding, UTF-8.
fn sniff_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(CHARSET_SNIFF_LEN)];
    let head = String::from_utf8_lossy(head);
    let label = RE_META_CHARSET.captures(&head)?.get(1)?.as_str().to_string();
    Encoding::for_label(label.as_bytes()).map(Encoding::output_encoding)
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    RE_WHITESPACE.replace_all(s, " ").trim().to_string()
}

/// Normalize a string pulled out of markup: repair mojibake, decode stray
/// entities once, NFKC, drop control characters, collapse whitespace.
pub fn normalize(s: &str) -> String {
    let repaired = repair_mojibake(s);
    let decoded = decode_html_entities(&repaired);
    let normalized = decoded
        .nfkc()
        .map(|c| if c == '\u{00A0}' { ' ' } else { c })
        .collect::<String>();
    collapse_whitespace(&strip_control_chars(&normalized))
}

fn looks_garbled(s: &str) -> bool {
    s.contains('Ã') || s.contains('â') || s.contains('\u{FFFD}')
}

/// Undo UTF-8 text that was decoded as Latin-1/Windows-1252 somewhere
/// upstream. Up to three passes; stops as soon as the markers are gone.
pub fn repair_mojibake(s: &str) -> String {
    if !looks_garbled(s) {
        return s.to_string();
    }

    let mut cur = s.to_string();
    for _ in 0..3 {
        let (bytes, _, unmappable) = WINDOWS_1252.encode(&cur);
        if unmappable {
            break;
        }
        let redecoded = match std::str::from_utf8(&bytes) {
            Ok(text) => text.to_string(),
            Err(_) => break,
        };
        if redecoded == cur {
            break;
        }
        cur = redecoded;
        if !looks_garbled(&cur) {
            break;
        }
    }
    cur
}

/// Remove characters that are not allowed in XML 1.0 text.
/// Tab, LF and CR are kept.
pub fn strip_control_chars(input: &str) -> String {
    input
        .chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || (c >= '\u{20}' && c != '\u{FFFE}' && c != '\u{FFFF}'))
        .collect()
}

/// Truncate to at most `max` characters, respecting char boundaries.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
