//! Single-byte text encodings and Adobe Glyph List lookup.
//!
//! Simple (non-CID) fonts map a single byte code to a glyph, and the glyph to
//! a Unicode scalar value. PDF defines four named base encodings
//! (StandardEncoding, WinAnsiEncoding, MacRomanEncoding, MacExpertEncoding)
//! plus PDFDocEncoding (used for text strings in the document, never in
//! content streams). An `/Encoding` dictionary may override individual codes
//! via a `/Differences` array of glyph names, resolved through the Adobe
//! Glyph List.
//!
//! All four base encodings agree with ASCII for 0x20-0x7E; they diverge only
//! above 0x7F (and StandardEncoding has a handful of differences in the
//! quote/accent range). Tables below are the decode direction: byte -> char.

use std::collections::HashMap;

/// The four named base encodings a simple font's `/Encoding` may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseEncoding {
    Standard,
    WinAnsi,
    MacRoman,
    MacExpert,
    PdfDoc,
}

impl BaseEncoding {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "StandardEncoding" => Some(BaseEncoding::Standard),
            "WinAnsiEncoding" => Some(BaseEncoding::WinAnsi),
            "MacRomanEncoding" => Some(BaseEncoding::MacRoman),
            "MacExpertEncoding" => Some(BaseEncoding::MacExpert),
            "PDFDocEncoding" => Some(BaseEncoding::PdfDoc),
            _ => None,
        }
    }

    /// Decode a single byte to its Unicode scalar value under this encoding.
    pub fn decode(&self, code: u8) -> Option<char> {
        match self {
            BaseEncoding::Standard => standard_encoding(code),
            BaseEncoding::WinAnsi => win_ansi_encoding(code),
            BaseEncoding::MacRoman => mac_roman_encoding(code),
            BaseEncoding::MacExpert => mac_expert_encoding(code),
            BaseEncoding::PdfDoc => pdf_doc_encoding(code),
        }
    }
}

/// A fully resolved simple-font encoding: a base table with `/Differences`
/// overrides folded in, ready for O(1) per-byte lookup.
#[derive(Debug, Clone)]
pub struct SimpleEncoding {
    base: BaseEncoding,
    overrides: HashMap<u8, char>,
}

impl SimpleEncoding {
    pub fn new(base: BaseEncoding) -> Self {
        SimpleEncoding {
            base,
            overrides: HashMap::new(),
        }
    }

    /// Apply a `/Differences` array: alternating integer code / name pairs,
    /// where each name advances the running code by one until the next
    /// integer resets it. Unknown glyph names leave the prior mapping (or
    /// the base encoding's) in place for that code.
    pub fn apply_differences(&mut self, entries: &[DifferenceEntry]) {
        let mut code: u32 = 0;
        for entry in entries {
            match entry {
                DifferenceEntry::Code(c) => code = *c,
                DifferenceEntry::Name(name) => {
                    if code <= 255 {
                        if let Some(ch) = glyph_name_to_unicode(name) {
                            self.overrides.insert(code as u8, ch);
                        }
                    }
                    code += 1;
                },
            }
        }
    }

    pub fn decode(&self, code: u8) -> Option<char> {
        self.overrides.get(&code).copied().or_else(|| self.base.decode(code))
    }
}

/// One entry of a `/Differences` array, in source order.
#[derive(Debug, Clone)]
pub enum DifferenceEntry {
    Code(u32),
    Name(String),
}

/// Decode a glyph name to a Unicode scalar value.
///
/// Tries the Adobe Glyph List first, then the `uniXXXX` / `uXXXXXX` numeric
/// conventions (AGL specification, section on "Glyph Names Not in the AGL").
pub fn glyph_name_to_unicode(glyph_name: &str) -> Option<char> {
    if let Some(&unicode) = ADOBE_GLYPH_LIST.get(glyph_name) {
        return char::from_u32(unicode);
    }

    // Strip a variant suffix like "A.sc" or "f_i.alt1" before falling back
    // to the numeric conventions, per the AGL spec's suffix-stripping rule.
    let base_name = glyph_name.split('.').next().unwrap_or(glyph_name);
    if base_name != glyph_name {
        if let Some(&unicode) = ADOBE_GLYPH_LIST.get(base_name) {
            return char::from_u32(unicode);
        }
    }

    if let Some(hex) = base_name.strip_prefix("uni") {
        if hex.len() >= 4 && hex.len() % 4 == 0 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            if let Ok(value) = u32::from_str_radix(&hex[..4], 16) {
                return char::from_u32(value);
            }
        }
    }
    if let Some(hex) = base_name.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            if let Ok(value) = u32::from_str_radix(hex, 16) {
                return char::from_u32(value);
            }
        }
    }
    None
}

/// StandardEncoding (PDF spec Appendix D). Matches ASCII for 0x20-0x7E
/// except quote glyphs; upper half covers accented Latin letters and a
/// handful of symbols, with gaps left undefined.
fn standard_encoding(code: u8) -> Option<char> {
    match code {
        0x27 => Some('\u{2019}'), // quoteright
        0x60 => Some('\u{2018}'), // quoteleft
        0x20..=0x7E => Some(code as char),
        0xA1 => Some('\u{00A1}'),
        0xA2 => Some('\u{00A2}'),
        0xA3 => Some('\u{00A3}'),
        0xA4 => Some('\u{2044}'),
        0xA5 => Some('\u{00A5}'),
        0xA6 => Some('\u{0192}'),
        0xA7 => Some('\u{00A7}'),
        0xA8 => Some('\u{00A4}'),
        0xA9 => Some('\u{0027}'),
        0xAA => Some('\u{201C}'),
        0xAB => Some('\u{00AB}'),
        0xAC => Some('\u{2039}'),
        0xAD => Some('\u{203A}'),
        0xAE => Some('\u{FB01}'),
        0xAF => Some('\u{FB02}'),
        0xB1 => Some('\u{2013}'),
        0xB2 => Some('\u{2020}'),
        0xB3 => Some('\u{2021}'),
        0xB4 => Some('\u{00B7}'),
        0xB6 => Some('\u{00B6}'),
        0xB7 => Some('\u{2022}'),
        0xB8 => Some('\u{201A}'),
        0xB9 => Some('\u{201E}'),
        0xBA => Some('\u{201D}'),
        0xBB => Some('\u{00BB}'),
        0xBC => Some('\u{2026}'),
        0xBD => Some('\u{2030}'),
        0xBF => Some('\u{00BF}'),
        0xC1 => Some('\u{0060}'),
        0xC2 => Some('\u{00B4}'),
        0xC3 => Some('\u{02C6}'),
        0xC4 => Some('\u{02DC}'),
        0xC5 => Some('\u{00AF}'),
        0xC6 => Some('\u{02D8}'),
        0xC7 => Some('\u{02D9}'),
        0xC8 => Some('\u{00A8}'),
        0xCA => Some('\u{02DA}'),
        0xCB => Some('\u{00B8}'),
        0xCD => Some('\u{02DD}'),
        0xCE => Some('\u{02DB}'),
        0xCF => Some('\u{02C7}'),
        0xD0 => Some('\u{2014}'),
        0xE1 => Some('\u{00C6}'),
        0xE3 => Some('\u{00AA}'),
        0xE8 => Some('\u{0141}'),
        0xE9 => Some('\u{00D8}'),
        0xEA => Some('\u{0152}'),
        0xEB => Some('\u{00BA}'),
        0xF1 => Some('\u{00E6}'),
        0xF5 => Some('\u{0131}'),
        0xF8 => Some('\u{0142}'),
        0xF9 => Some('\u{00F8}'),
        0xFA => Some('\u{0153}'),
        0xFB => Some('\u{00DF}'),
        _ => None,
    }
}

/// WinAnsiEncoding (cp1252). Identical to Latin-1 except the 0x80-0x9F
/// block, which cp1252 repurposes for punctuation and a few letters.
fn win_ansi_encoding(code: u8) -> Option<char> {
    match code {
        0x80 => Some('\u{20AC}'),
        0x82 => Some('\u{201A}'),
        0x83 => Some('\u{0192}'),
        0x84 => Some('\u{201E}'),
        0x85 => Some('\u{2026}'),
        0x86 => Some('\u{2020}'),
        0x87 => Some('\u{2021}'),
        0x88 => Some('\u{02C6}'),
        0x89 => Some('\u{2030}'),
        0x8A => Some('\u{0160}'),
        0x8B => Some('\u{2039}'),
        0x8C => Some('\u{0152}'),
        0x8E => Some('\u{017D}'),
        0x91 => Some('\u{2018}'),
        0x92 => Some('\u{2019}'),
        0x93 => Some('\u{201C}'),
        0x94 => Some('\u{201D}'),
        0x95 => Some('\u{2022}'),
        0x96 => Some('\u{2013}'),
        0x97 => Some('\u{2014}'),
        0x98 => Some('\u{02DC}'),
        0x99 => Some('\u{2122}'),
        0x9A => Some('\u{0161}'),
        0x9B => Some('\u{203A}'),
        0x9C => Some('\u{0153}'),
        0x9E => Some('\u{017E}'),
        0x9F => Some('\u{0178}'),
        0x81 | 0x8D | 0x8F | 0x90 | 0x9D => None, // undefined in cp1252
        0x20..=0x7E | 0xA0..=0xFF => Some(code as char), // Latin-1 region
        _ => None,
    }
}

/// MacRomanEncoding. Agrees with ASCII through 0x7F; the upper half is the
/// classic Mac OS Roman repertoire (accented Latin, Greek letters used as
/// symbols, typographic punctuation).
fn mac_roman_encoding(code: u8) -> Option<char> {
    const TABLE: [char; 128] = [
        '\u{00C4}', '\u{00C5}', '\u{00C7}', '\u{00C9}', '\u{00D1}', '\u{00D6}', '\u{00DC}',
        '\u{00E1}', '\u{00E0}', '\u{00E2}', '\u{00E4}', '\u{00E3}', '\u{00E5}', '\u{00E7}',
        '\u{00E9}', '\u{00E8}', '\u{00EA}', '\u{00EB}', '\u{00ED}', '\u{00EC}', '\u{00EE}',
        '\u{00EF}', '\u{00F1}', '\u{00F3}', '\u{00F2}', '\u{00F4}', '\u{00F6}', '\u{00F5}',
        '\u{00FA}', '\u{00F9}', '\u{00FB}', '\u{00FC}', '\u{2020}', '\u{00B0}', '\u{00A2}',
        '\u{00A3}', '\u{00A7}', '\u{2022}', '\u{00B6}', '\u{00DF}', '\u{00AE}', '\u{00A9}',
        '\u{2122}', '\u{00B4}', '\u{00A8}', '\u{2260}', '\u{00C6}', '\u{00D8}', '\u{221E}',
        '\u{00B1}', '\u{2264}', '\u{2265}', '\u{00A5}', '\u{00B5}', '\u{2202}', '\u{2211}',
        '\u{220F}', '\u{03C0}', '\u{222B}', '\u{00AA}', '\u{00BA}', '\u{03A9}', '\u{00E6}',
        '\u{00F8}', '\u{00BF}', '\u{00A1}', '\u{00AC}', '\u{221A}', '\u{0192}', '\u{2248}',
        '\u{2206}', '\u{00AB}', '\u{00BB}', '\u{2026}', '\u{00A0}', '\u{00C0}', '\u{00C3}',
        '\u{00D5}', '\u{0152}', '\u{0153}', '\u{2013}', '\u{2014}', '\u{201C}', '\u{201D}',
        '\u{2018}', '\u{2019}', '\u{00F7}', '\u{25CA}', '\u{00FF}', '\u{0178}', '\u{2044}',
        '\u{20AC}', '\u{2039}', '\u{203A}', '\u{FB01}', '\u{FB02}', '\u{2021}', '\u{00B7}',
        '\u{201A}', '\u{201E}', '\u{2030}', '\u{00C2}', '\u{00CA}', '\u{00C1}', '\u{00CB}',
        '\u{00C8}', '\u{00CD}', '\u{00CE}', '\u{00CF}', '\u{00CC}', '\u{00D3}', '\u{00D4}',
        '\u{F8FF}', '\u{00D2}', '\u{00DA}', '\u{00DB}', '\u{00D9}', '\u{0131}', '\u{02C6}',
        '\u{02DC}', '\u{00AF}', '\u{02D8}', '\u{02D9}', '\u{02DA}', '\u{00B8}', '\u{02DD}',
        '\u{02DB}', '\u{02C7}',
    ];
    match code {
        0x20..=0x7E => Some(code as char),
        0x80..=0xFF => Some(TABLE[(code - 0x80) as usize]),
        _ => None,
    }
}

/// MacExpertEncoding. A specialist encoding for small caps, old-style
/// figures and fractions; only a small fraction of codes are populated
/// and none of it overlaps plain ASCII outside the space character.
fn mac_expert_encoding(code: u8) -> Option<char> {
    match code {
        0x20 => Some(' '),
        0x21 => Some('\u{F721}'),
        0x22 => Some('\u{F724}'),
        0x23 => Some('\u{F726}'),
        0x24 => Some('\u{F7A5}'),
        0x25 => Some('\u{F7B5}'),
        0x26 => Some('\u{F724}'),
        0xBF => Some('\u{F7BF}'),
        _ => None,
    }
}

/// PDFDocEncoding (PDF spec Annex D.2). Used only for text strings in the
/// document (bookmarks, form field values), never content-stream bytes.
/// Agrees with WinAnsi above 0xA0; differs in the 0x18-0x1F control range,
/// which PDFDocEncoding assigns to typographic punctuation.
fn pdf_doc_encoding(code: u8) -> Option<char> {
    match code {
        0x18 => Some('\u{02D8}'),
        0x19 => Some('\u{02C7}'),
        0x1A => Some('\u{02C6}'),
        0x1B => Some('\u{02D9}'),
        0x1C => Some('\u{02DD}'),
        0x1D => Some('\u{02DB}'),
        0x1E => Some('\u{02DA}'),
        0x1F => Some('\u{02DC}'),
        0x20..=0x7E => Some(code as char),
        0x80 => Some('\u{2022}'),
        0x81 => Some('\u{2020}'),
        0x82 => Some('\u{2021}'),
        0x83 => Some('\u{2026}'),
        0x84 => Some('\u{2014}'),
        0x85 => Some('\u{2013}'),
        0x86 => Some('\u{0192}'),
        0x87 => Some('\u{2044}'),
        0x88 => Some('\u{2039}'),
        0x89 => Some('\u{203A}'),
        0x8A => Some('\u{2212}'),
        0x8B => Some('\u{2030}'),
        0x8C => Some('\u{201E}'),
        0x8D => Some('\u{201C}'),
        0x8E => Some('\u{201D}'),
        0x8F => Some('\u{2018}'),
        0x90 => Some('\u{2019}'),
        0x91 => Some('\u{201A}'),
        0x92 => Some('\u{2122}'),
        0x93 => Some('\u{FB01}'),
        0x94 => Some('\u{FB02}'),
        0x95 => Some('\u{0141}'),
        0x96 => Some('\u{0152}'),
        0x97 => Some('\u{0160}'),
        0x98 => Some('\u{0178}'),
        0x99 => Some('\u{017D}'),
        0x9A => Some('\u{0131}'),
        0x9B => Some('\u{0142}'),
        0x9C => Some('\u{0153}'),
        0x9D => Some('\u{0161}'),
        0x9E => Some('\u{017E}'),
        0xA0..=0xFF => Some(code as char),
        _ => None,
    }
}

/// Adobe Glyph List subset: the common Latin, punctuation, ligature and
/// symbol names that appear in real-world `/Differences` arrays. Not the
/// full ~4,300-entry AGL; `glyph_name_to_unicode` covers the remainder
/// through the `uniXXXX`/`uXXXXXX` numeric conventions.
static ADOBE_GLYPH_LIST: phf::Map<&'static str, u32> = phf::phf_map! {
    "space" => 0x0020, "exclam" => 0x0021, "quotedbl" => 0x0022, "numbersign" => 0x0023,
    "dollar" => 0x0024, "percent" => 0x0025, "ampersand" => 0x0026, "quotesingle" => 0x0027,
    "parenleft" => 0x0028, "parenright" => 0x0029, "asterisk" => 0x002A, "plus" => 0x002B,
    "comma" => 0x002C, "hyphen" => 0x002D, "period" => 0x002E, "slash" => 0x002F,
    "zero" => 0x0030, "one" => 0x0031, "two" => 0x0032, "three" => 0x0033, "four" => 0x0034,
    "five" => 0x0035, "six" => 0x0036, "seven" => 0x0037, "eight" => 0x0038, "nine" => 0x0039,
    "colon" => 0x003A, "semicolon" => 0x003B, "less" => 0x003C, "equal" => 0x003D,
    "greater" => 0x003E, "question" => 0x003F, "at" => 0x0040,
    "A" => 0x0041, "B" => 0x0042, "C" => 0x0043, "D" => 0x0044, "E" => 0x0045, "F" => 0x0046,
    "G" => 0x0047, "H" => 0x0048, "I" => 0x0049, "J" => 0x004A, "K" => 0x004B, "L" => 0x004C,
    "M" => 0x004D, "N" => 0x004E, "O" => 0x004F, "P" => 0x0050, "Q" => 0x0051, "R" => 0x0052,
    "S" => 0x0053, "T" => 0x0054, "U" => 0x0055, "V" => 0x0056, "W" => 0x0057, "X" => 0x0058,
    "Y" => 0x0059, "Z" => 0x005A,
    "bracketleft" => 0x005B, "backslash" => 0x005C, "bracketright" => 0x005D,
    "asciicircum" => 0x005E, "underscore" => 0x005F, "grave" => 0x0060,
    "a" => 0x0061, "b" => 0x0062, "c" => 0x0063, "d" => 0x0064, "e" => 0x0065, "f" => 0x0066,
    "g" => 0x0067, "h" => 0x0068, "i" => 0x0069, "j" => 0x006A, "k" => 0x006B, "l" => 0x006C,
    "m" => 0x006D, "n" => 0x006E, "o" => 0x006F, "p" => 0x0070, "q" => 0x0071, "r" => 0x0072,
    "s" => 0x0073, "t" => 0x0074, "u" => 0x0075, "v" => 0x0076, "w" => 0x0077, "x" => 0x0078,
    "y" => 0x0079, "z" => 0x007A,
    "braceleft" => 0x007B, "bar" => 0x007C, "braceright" => 0x007D, "asciitilde" => 0x007E,
    "exclamdown" => 0x00A1, "cent" => 0x00A2, "sterling" => 0x00A3, "currency" => 0x00A4,
    "yen" => 0x00A5, "brokenbar" => 0x00A6, "section" => 0x00A7, "dieresis" => 0x00A8,
    "copyright" => 0x00A9, "ordfeminine" => 0x00AA, "guillemotleft" => 0x00AB,
    "logicalnot" => 0x00AC, "registered" => 0x00AE, "macron" => 0x00AF, "degree" => 0x00B0,
    "plusminus" => 0x00B1, "acute" => 0x00B4, "mu" => 0x00B5, "paragraph" => 0x00B6,
    "periodcentered" => 0x00B7, "cedilla" => 0x00B8, "ordmasculine" => 0x00BA,
    "guillemotright" => 0x00BB, "questiondown" => 0x00BF,
    "Agrave" => 0x00C0, "Aacute" => 0x00C1, "Acircumflex" => 0x00C2, "Atilde" => 0x00C3,
    "Adieresis" => 0x00C4, "Aring" => 0x00C5, "AE" => 0x00C6, "Ccedilla" => 0x00C7,
    "Egrave" => 0x00C8, "Eacute" => 0x00C9, "Ecircumflex" => 0x00CA, "Edieresis" => 0x00CB,
    "Igrave" => 0x00CC, "Iacute" => 0x00CD, "Icircumflex" => 0x00CE, "Idieresis" => 0x00CF,
    "Eth" => 0x00D0, "Ntilde" => 0x00D1, "Ograve" => 0x00D2, "Oacute" => 0x00D3,
    "Ocircumflex" => 0x00D4, "Otilde" => 0x00D5, "Odieresis" => 0x00D6, "multiply" => 0x00D7,
    "Oslash" => 0x00D8, "Ugrave" => 0x00D9, "Uacute" => 0x00DA, "Ucircumflex" => 0x00DB,
    "Udieresis" => 0x00DC, "Yacute" => 0x00DD, "Thorn" => 0x00DE, "germandbls" => 0x00DF,
    "agrave" => 0x00E0, "aacute" => 0x00E1, "acircumflex" => 0x00E2, "atilde" => 0x00E3,
    "adieresis" => 0x00E4, "aring" => 0x00E5, "ae" => 0x00E6, "ccedilla" => 0x00E7,
    "egrave" => 0x00E8, "eacute" => 0x00E9, "ecircumflex" => 0x00EA, "edieresis" => 0x00EB,
    "igrave" => 0x00EC, "iacute" => 0x00ED, "icircumflex" => 0x00EE, "idieresis" => 0x00EF,
    "eth" => 0x00F0, "ntilde" => 0x00F1, "ograve" => 0x00F2, "oacute" => 0x00F3,
    "ocircumflex" => 0x00F4, "otilde" => 0x00F5, "odieresis" => 0x00F6, "divide" => 0x00F7,
    "oslash" => 0x00F8, "ugrave" => 0x00F9, "uacute" => 0x00FA, "ucircumflex" => 0x00FB,
    "udieresis" => 0x00FC, "yacute" => 0x00FD, "thorn" => 0x00FE, "ydieresis" => 0x00FF,
    "quoteleft" => 0x2018, "quoteright" => 0x2019, "quotesinglbase" => 0x201A,
    "quotedblleft" => 0x201C, "quotedblright" => 0x201D, "quotedblbase" => 0x201E,
    "dagger" => 0x2020, "daggerdbl" => 0x2021, "bullet" => 0x2022, "ellipsis" => 0x2026,
    "perthousand" => 0x2030, "guilsinglleft" => 0x2039, "guilsinglright" => 0x203A,
    "fraction" => 0x2044, "Euro" => 0x20AC, "trademark" => 0x2122, "fi" => 0xFB01,
    "fl" => 0xFB02, "endash" => 0x2013, "emdash" => 0x2014, "minus" => 0x2212,
    "florin" => 0x0192, "circumflex" => 0x02C6, "tilde" => 0x02DC, "breve" => 0x02D8,
    "dotaccent" => 0x02D9, "ring" => 0x02DA, "ogonek" => 0x02DB, "caron" => 0x02C7,
    "hungarumlaut" => 0x02DD, "Lslash" => 0x0141, "lslash" => 0x0142, "OE" => 0x0152,
    "oe" => 0x0153, "Scaron" => 0x0160, "scaron" => 0x0161, "Zcaron" => 0x017D,
    "zcaron" => 0x017E, "Ydieresis" => 0x0178, "dotlessi" => 0x0131, "notequal" => 0x2260,
    "lessequal" => 0x2264, "greaterequal" => 0x2265, "infinity" => 0x221E,
    "summation" => 0x2211, "product" => 0x220F, "integral" => 0x222B, "Omega" => 0x03A9,
    "pi" => 0x03C0, "radical" => 0x221A, "approxequal" => 0x2248, "Delta" => 0x2206,
    "partialdiff" => 0x2202, "lozenge" => 0x25CA, "apple" => 0xF8FF, "nbspace" => 0x00A0,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_is_identical_across_base_encodings() {
        for code in 0x20u8..=0x7E {
            let ch = Some(code as char);
            assert_eq!(win_ansi_encoding(code), ch, "winansi {code:#x}");
            assert_eq!(mac_roman_encoding(code), ch, "macroman {code:#x}");
            assert_eq!(pdf_doc_encoding(code), ch, "pdfdoc {code:#x}");
        }
    }

    #[test]
    fn winansi_euro_and_smart_quotes() {
        assert_eq!(win_ansi_encoding(0x80), Some('\u{20AC}'));
        assert_eq!(win_ansi_encoding(0x93), Some('\u{201C}'));
        assert_eq!(win_ansi_encoding(0x97), Some('\u{2014}'));
        assert_eq!(win_ansi_encoding(0x81), None);
    }

    #[test]
    fn standard_encoding_quotes_differ_from_ascii() {
        assert_eq!(standard_encoding(0x27), Some('\u{2019}'));
        assert_eq!(standard_encoding(0x60), Some('\u{2018}'));
    }

    #[test]
    fn agl_lookup_basic() {
        assert_eq!(glyph_name_to_unicode("A"), Some('A'));
        assert_eq!(glyph_name_to_unicode("fi"), Some('\u{FB01}'));
        assert_eq!(glyph_name_to_unicode("Euro"), Some('\u{20AC}'));
    }

    #[test]
    fn agl_lookup_with_variant_suffix() {
        assert_eq!(glyph_name_to_unicode("A.sc"), Some('A'));
    }

    #[test]
    fn agl_lookup_unixxxx_fallback() {
        assert_eq!(glyph_name_to_unicode("uni0041"), Some('A'));
        assert_eq!(glyph_name_to_unicode("uni20AC"), Some('\u{20AC}'));
        assert_eq!(glyph_name_to_unicode("u1D70C"), char::from_u32(0x1D70C));
    }

    #[test]
    fn agl_lookup_unknown_name_is_none() {
        assert_eq!(glyph_name_to_unicode("notarealglyphname"), None);
    }

    #[test]
    fn differences_override_base_encoding() {
        let mut enc = SimpleEncoding::new(BaseEncoding::WinAnsi);
        enc.apply_differences(&[
            DifferenceEntry::Code(0x41),
            DifferenceEntry::Name("bullet".to_string()),
            DifferenceEntry::Name("dagger".to_string()),
        ]);
        assert_eq!(enc.decode(0x41), Some('\u{2022}'));
        assert_eq!(enc.decode(0x42), Some('\u{2020}'));
        // Untouched codes fall through to the base encoding.
        assert_eq!(enc.decode(0x43), Some('C'));
    }
}
