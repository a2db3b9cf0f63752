//! ToUnicode CMap parser.
//!
//! CMap (Character Map) streams define the mapping from character codes to
//! Unicode characters. Required for text extraction when fonts use custom
//! or CID encodings.
//!
//! - `begincodespacerange` declares the valid byte widths for character
//!   codes (checked narrowest-first, per the PDF spec's code-space rules).
//! - `beginbfchar` / `beginbfrange` map individual codes or contiguous
//!   ranges to destination Unicode strings.
//! - `beginnotdefrange` supplies a fallback mapping for codes in a range
//!   that have no other mapping.
//!
//! Global caching: identical CMap streams (common across fonts embedded
//! from the same producer) are parsed once and shared via `Arc`.

use crate::error::Result;
use regex::Regex;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

/// A declared codespace range: `start..=end` are valid codes of `width` bytes.
#[derive(Clone, Copy, Debug)]
struct CodespaceRange {
    width: u8,
    start: u32,
    end: u32,
}

/// A parsed character map from character codes to Unicode strings.
#[derive(Clone, Debug)]
pub struct CMap {
    chars: HashMap<u32, String>,
    codespaces: Vec<CodespaceRange>,
}

impl CMap {
    fn new() -> Self {
        CMap {
            chars: HashMap::new(),
            codespaces: Vec::new(),
        }
    }

    fn insert(&mut self, code: u32, unicode: String) {
        self.chars.insert(code, unicode);
    }

    /// Look up the Unicode string for a character code.
    pub fn get(&self, code: &u32) -> Option<&String> {
        self.chars.get(code)
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Byte widths declared by `codespacerange`, narrowest first, used to
    /// decide how many bytes of a content-stream string form one code when
    /// no simpler convention (fixed 1-byte, fixed 2-byte Identity-H) applies.
    /// Falls back to `[1, 2]` when the CMap declared no codespace at all,
    /// which covers CMaps that only ever used single-byte or UTF-16BE-style
    /// codes without bothering to declare it.
    pub fn code_widths(&self) -> Vec<u8> {
        if self.codespaces.is_empty() {
            return vec![1, 2];
        }
        let mut widths: Vec<u8> = self.codespaces.iter().map(|r| r.width).collect();
        widths.sort_unstable();
        widths.dedup();
        widths
    }

    /// Determine the byte width of the code starting at `bytes`, trying
    /// declared codespace ranges narrowest-first. Returns `None` if no
    /// codespace matches and the caller should fall back to a default.
    pub fn code_width_at(&self, bytes: &[u8]) -> Option<u8> {
        for range in &self.codespaces {
            let w = range.width as usize;
            if bytes.len() < w {
                continue;
            }
            let mut value: u32 = 0;
            for &b in &bytes[..w] {
                value = (value << 8) | b as u32;
            }
            if value >= range.start && value <= range.end {
                return Some(range.width);
            }
        }
        None
    }
}

/// Key for indexing into the global CMap cache: the hash of the raw stream
/// bytes, so identical CMaps across fonts share one parsed instance.
#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub struct CMapKey(u64);

fn compute_stream_hash(data: &[u8]) -> CMapKey {
    let mut hasher = DefaultHasher::new();
    data.hash(&mut hasher);
    CMapKey(hasher.finish())
}

lazy_static::lazy_static! {
    static ref CMAP_CACHE: Mutex<HashMap<CMapKey, Arc<CMap>>> = Mutex::new(HashMap::new());
}

/// Lazily parsed ToUnicode CMap, shared across fonts that reference the
/// same stream bytes.
///
/// Two-level cache: a local slot (`parsed`) memoizes this instance's own
/// result, and a global cache (keyed by stream hash) lets multiple fonts
/// embedding the identical CMap stream share one parse.
#[derive(Debug, Clone)]
pub struct LazyCMap {
    raw_stream: Vec<u8>,
    cache_key: CMapKey,
    parsed: Arc<Mutex<Option<Arc<CMap>>>>,
}

impl LazyCMap {
    pub fn new(raw_stream: Vec<u8>) -> Self {
        let cache_key = compute_stream_hash(&raw_stream);
        LazyCMap {
            raw_stream,
            cache_key,
            parsed: Arc::new(Mutex::new(None)),
        }
    }

    /// Parse (or fetch from cache) the underlying CMap.
    pub fn get(&self) -> Option<Arc<CMap>> {
        let mut parsed_guard = self.parsed.lock().unwrap();
        if let Some(cached) = parsed_guard.as_ref() {
            return Some(Arc::clone(cached));
        }

        {
            let global = CMAP_CACHE.lock().unwrap();
            if let Some(cached) = global.get(&self.cache_key) {
                let arc = Arc::clone(cached);
                *parsed_guard = Some(Arc::clone(&arc));
                log::debug!("CMap cache hit for stream hash {:?}", self.cache_key);
                return Some(arc);
            }
        }

        match parse_tounicode_cmap(&self.raw_stream) {
            Ok(cmap) => {
                let cmap_arc = Arc::new(cmap);
                *parsed_guard = Some(Arc::clone(&cmap_arc));
                let mut global = CMAP_CACHE.lock().unwrap();
                global.insert(self.cache_key.clone(), Arc::clone(&cmap_arc));
                log::debug!("CMap parsed and cached (stream hash {:?})", self.cache_key);
                Some(cmap_arc)
            },
            Err(e) => {
                log::warn!("Failed to parse lazy CMap: {}", e);
                None
            },
        }
    }
}

/// Parse an escape sequence token like `<space>`, `<tab>`, etc. These are
/// symbolic names some CMap producers use in place of a hex destination.
fn parse_escape_sequence(token: &str) -> Option<String> {
    let token = token.trim();
    let token = if token.starts_with('<') && token.ends_with('>') {
        &token[1..token.len() - 1]
    } else {
        token
    };
    match token.to_lowercase().trim() {
        "space" => Some(" ".to_string()),
        "tab" => Some("\t".to_string()),
        "newline" => Some("\n".to_string()),
        "carriage return" => Some("\r".to_string()),
        _ => None,
    }
}

/// Decode a UTF-16 surrogate pair encoded as a single 32-bit value (high
/// surrogate in the upper 16 bits, low surrogate in the lower 16 bits).
/// Falls back to treating the value as a direct code point if it isn't a
/// valid surrogate pair.
fn decode_utf16_surrogate_pair(value: u32) -> Option<String> {
    let high = (value >> 16) as u16;
    let low = (value & 0xFFFF) as u16;
    if (0xD800..=0xDBFF).contains(&high) && (0xDC00..=0xDFFF).contains(&low) {
        let codepoint = 0x10000 + (((high & 0x3FF) as u32) << 10) + ((low & 0x3FF) as u32);
        char::from_u32(codepoint).map(|ch| ch.to_string())
    } else {
        char::from_u32(value).map(|ch| ch.to_string())
    }
}

fn hex_to_unicode_string(dst_hex: &str) -> Option<String> {
    if dst_hex.len() <= 4 {
        let code = u32::from_str_radix(dst_hex, 16).ok()?;
        char::from_u32(code).map(|c| c.to_string())
    } else if dst_hex.len() == 8 {
        let code = u32::from_str_radix(dst_hex, 16).ok()?;
        decode_utf16_surrogate_pair(code).or_else(|| {
            let mut s = String::new();
            if let Ok(c1) = u32::from_str_radix(&dst_hex[0..4], 16) {
                if let Some(c) = char::from_u32(c1) {
                    s.push(c);
                }
            }
            if let Ok(c2) = u32::from_str_radix(&dst_hex[4..8], 16) {
                if let Some(c) = char::from_u32(c2) {
                    s.push(c);
                }
            }
            if s.is_empty() {
                None
            } else {
                Some(s)
            }
        })
    } else {
        let mut s = String::new();
        for i in (0..dst_hex.len()).step_by(4) {
            let end = (i + 4).min(dst_hex.len());
            if let Ok(code) = u32::from_str_radix(&dst_hex[i..end], 16) {
                if let Some(c) = char::from_u32(code) {
                    s.push(c);
                }
            }
        }
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }
}

/// Parse a ToUnicode (or CID-keyed) CMap stream.
pub fn parse_tounicode_cmap(data: &[u8]) -> Result<CMap> {
    let mut cmap = CMap::new();
    let content = String::from_utf8_lossy(data);

    for section in extract_sections(&content, "begincodespacerange", "endcodespacerange") {
        for line in section.lines() {
            if let Some(range) = parse_codespacerange_line(line) {
                cmap.codespaces.push(range);
            }
        }
    }

    for section in extract_sections(&content, "beginbfchar", "endbfchar") {
        for line in section.lines() {
            if let Some((src, dst)) = parse_bfchar_line(line) {
                cmap.insert(src, dst);
            }
        }
    }

    for section in extract_sections(&content, "beginbfrange", "endbfrange") {
        for line in section.lines() {
            if let Some(mappings) = parse_bfrange_line(line) {
                for (src, dst) in mappings {
                    cmap.insert(src, dst);
                }
            }
        }
    }

    for section in extract_sections(&content, "beginnotdefrange", "endnotdefrange") {
        for line in section.lines() {
            if let Some(mappings) = parse_notdefrange_line(line) {
                for (src, dst) in mappings {
                    cmap.chars.entry(src).or_insert(dst);
                }
            }
        }
    }

    Ok(cmap)
}

fn extract_sections<'a>(content: &'a str, begin: &str, end: &str) -> Vec<&'a str> {
    let mut sections = Vec::new();
    let mut remaining = content;
    while let Some(begin_pos) = remaining.find(begin) {
        let after_begin = &remaining[begin_pos + begin.len()..];
        if let Some(end_pos) = after_begin.find(end) {
            sections.push(&after_begin[..end_pos]);
            remaining = &after_begin[end_pos + end.len()..];
        } else {
            break;
        }
    }
    sections
}

/// Parse a codespacerange line: `<lo> <hi>`. The hex width of `lo` (which
/// must equal that of `hi`) determines the byte width of this range.
fn parse_codespacerange_line(line: &str) -> Option<CodespaceRange> {
    lazy_static::lazy_static! {
        static ref RE: Regex = Regex::new(r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>").unwrap();
    }
    let caps = RE.captures(line)?;
    let lo_str = &caps[1];
    let hi_str = &caps[2];
    if lo_str.len() != hi_str.len() || lo_str.len() % 2 != 0 {
        return None;
    }
    let width = (lo_str.len() / 2) as u8;
    let start = u32::from_str_radix(lo_str, 16).ok()?;
    let end = u32::from_str_radix(hi_str, 16).ok()?;
    Some(CodespaceRange { width, start, end })
}

/// Parse a bfchar line: `<src> <dst>`.
fn parse_bfchar_line(line: &str) -> Option<(u32, String)> {
    lazy_static::lazy_static! {
        static ref RE: Regex = Regex::new(r"<([^>]*)>\s*<([^>]*)>").unwrap();
    }
    let caps = RE.captures(line)?;
    let src_str = caps[1].trim().replace(char::is_whitespace, "");
    let src = u32::from_str_radix(&src_str, 16).ok()?;

    let dst_str = caps[2].trim();
    let dst = if let Some(escape) = parse_escape_sequence(&format!("<{}>", dst_str)) {
        escape
    } else {
        let dst_hex = dst_str.replace(char::is_whitespace, "");
        hex_to_unicode_string(&dst_hex)?
    };
    Some((src, dst))
}

/// Parse a bfrange line, either `<start> <end> <dst>` (sequential) or
/// `<start> <end> [<dst0> <dst1> ...]` (explicit array).
fn parse_bfrange_line(line: &str) -> Option<Vec<(u32, String)>> {
    lazy_static::lazy_static! {
        static ref RE_SEQ: Regex = Regex::new(r"<([^>]*)>\s*<([^>]*)>\s*<([^>]*)>").unwrap();
        static ref RE_ARRAY: Regex =
            Regex::new(r"<([^>]*)>\s*<([^>]*)>\s*\[((?:\s*<[^>]+>\s*)+)\]").unwrap();
        static ref RE_HEX: Regex = Regex::new(r"<([^>]*)>").unwrap();
    }

    if let Some(caps) = RE_ARRAY.captures(line) {
        let start = u32::from_str_radix(&caps[1].trim().replace(char::is_whitespace, ""), 16).ok()?;
        let end = u32::from_str_radix(&caps[2].trim().replace(char::is_whitespace, ""), 16).ok()?;
        let array_str = &caps[3];

        let dst_hexes: Vec<String> = RE_HEX
            .captures_iter(array_str)
            .filter_map(|c| {
                let s = c.get(1).unwrap().as_str().trim().replace(char::is_whitespace, "");
                if s.is_empty() {
                    None
                } else {
                    Some(s)
                }
            })
            .collect();

        let range_size = (end - start + 1) as usize;
        if dst_hexes.len() != range_size {
            log::warn!(
                "bfrange array size mismatch: expected {} entries for 0x{:X}-0x{:X}, got {}",
                range_size,
                start,
                end,
                dst_hexes.len()
            );
        }

        let mut result = Vec::new();
        for (i, dst_hex) in dst_hexes.iter().take(range_size).enumerate() {
            if let Some(dst) = hex_to_unicode_string(dst_hex) {
                result.push((start + i as u32, dst));
            }
        }
        return Some(result);
    }

    if let Some(caps) = RE_SEQ.captures(line) {
        let start = u32::from_str_radix(&caps[1].trim().replace(char::is_whitespace, ""), 16).ok()?;
        let end = u32::from_str_radix(&caps[2].trim().replace(char::is_whitespace, ""), 16).ok()?;
        let dst_start =
            u32::from_str_radix(&caps[3].trim().replace(char::is_whitespace, ""), 16).ok()?;

        let mut result = Vec::new();
        let range_size = end.saturating_sub(start).min(10_000);
        for i in 0..=range_size {
            let src = start.wrapping_add(i);
            let dst_code = dst_start.wrapping_add(i);
            let unicode_string = if dst_code > 0xFFFF {
                decode_utf16_surrogate_pair(dst_code)
            } else {
                char::from_u32(dst_code).map(|ch| ch.to_string())
            };
            if let Some(s) = unicode_string {
                result.push((src, s));
            }
        }
        return Some(result);
    }

    None
}

/// Parse a notdefrange line: `<start> <end> <dst>`. Only the sequential
/// form is defined for notdefrange in the PDF spec.
fn parse_notdefrange_line(line: &str) -> Option<Vec<(u32, String)>> {
    lazy_static::lazy_static! {
        static ref RE_SEQ: Regex = Regex::new(r"<([^>]*)>\s*<([^>]*)>\s*<([^>]*)>").unwrap();
    }
    let caps = RE_SEQ.captures(line)?;
    let start = u32::from_str_radix(&caps[1].trim().replace(char::is_whitespace, ""), 16).ok()?;
    let end = u32::from_str_radix(&caps[2].trim().replace(char::is_whitespace, ""), 16).ok()?;
    let dst_str = caps[3].trim();

    let dst = if let Some(escape) = parse_escape_sequence(&format!("<{}>", dst_str)) {
        escape
    } else {
        hex_to_unicode_string(&dst_str.replace(char::is_whitespace, ""))?
    };

    let mut result = Vec::new();
    let range_size = end.saturating_sub(start).min(10_000);
    for i in 0..=range_size {
        result.push((start.wrapping_add(i), dst.clone()));
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bfchar_single() {
        let data = b"beginbfchar\n<0041> <0041>\nendbfchar";
        let cmap = parse_tounicode_cmap(data).unwrap();
        assert_eq!(cmap.get(&0x41), Some(&"A".to_string()));
    }

    #[test]
    fn bfchar_multiple() {
        let data = b"beginbfchar\n<0041> <0041>\n<0042> <0042>\nendbfchar";
        let cmap = parse_tounicode_cmap(data).unwrap();
        assert_eq!(cmap.get(&0x42), Some(&"B".to_string()));
    }

    #[test]
    fn bfrange_sequential() {
        let data = b"beginbfrange\n<0041> <0043> <0041>\nendbfrange";
        let cmap = parse_tounicode_cmap(data).unwrap();
        assert_eq!(cmap.get(&0x41), Some(&"A".to_string()));
        assert_eq!(cmap.get(&0x43), Some(&"C".to_string()));
    }

    #[test]
    fn bfrange_array() {
        let data =
            b"beginbfrange\n<005F> <0061> [<00660066> <00660069> <00660066006C>]\nendbfrange";
        let cmap = parse_tounicode_cmap(data).unwrap();
        assert_eq!(cmap.get(&0x5F), Some(&"ff".to_string()));
        assert_eq!(cmap.get(&0x60), Some(&"fi".to_string()));
        assert_eq!(cmap.get(&0x61), Some(&"ffl".to_string()));
    }

    #[test]
    fn notdefrange_does_not_override_bfchar() {
        let data = b"beginbfchar\n<0041> <0041>\nendbfchar\nbeginnotdefrange\n<0000> <00FF> <FFFD>\nendnotdefrange";
        let cmap = parse_tounicode_cmap(data).unwrap();
        assert_eq!(cmap.get(&0x41), Some(&"A".to_string()));
        assert_eq!(cmap.get(&0x20), Some(&"\u{FFFD}".to_string()));
    }

    #[test]
    fn codespacerange_declares_width() {
        let data = b"begincodespacerange\n<00> <FF>\nendcodespacerange\nbeginbfchar\n<41> <0041>\nendbfchar";
        let cmap = parse_tounicode_cmap(data).unwrap();
        assert_eq!(cmap.code_widths(), vec![1]);
        assert_eq!(cmap.code_width_at(&[0x41]), Some(1));
    }

    #[test]
    fn codespacerange_multi_width_narrowest_first() {
        let data =
            b"begincodespacerange\n<00> <80>\n<8140> <FCFC>\nendcodespacerange\nbeginbfchar\nendbfchar";
        let cmap = parse_tounicode_cmap(data).unwrap();
        assert_eq!(cmap.code_widths(), vec![1, 2]);
        assert_eq!(cmap.code_width_at(&[0x20]), Some(1));
        assert_eq!(cmap.code_width_at(&[0x81, 0x40]), Some(2));
    }

    #[test]
    fn surrogate_pair_destination() {
        let data = b"beginbfchar\n<01> <D835DF0C>\nendbfchar";
        let cmap = parse_tounicode_cmap(data).unwrap();
        assert_eq!(cmap.get(&0x01), Some(&"\u{1D70C}".to_string()));
    }

    #[test]
    fn escape_sequence_destination() {
        let data = b"beginbfchar\n<01> <space>\nendbfchar";
        let cmap = parse_tounicode_cmap(data).unwrap();
        assert_eq!(cmap.get(&0x01), Some(&" ".to_string()));
    }
}
