//! Font dictionary parsing.
//!
//! Extracts the information needed to turn character codes in a content
//! stream into Unicode text: the encoding (simple fonts) or CID mapping
//! (Type0/CIDFont fonts), the optional ToUnicode CMap, and glyph widths.

use crate::document::PdfDocument;
use crate::error::{Error, Result};
use crate::fonts::cmap::{parse_tounicode_cmap, LazyCMap};
use crate::fonts::encoding::{BaseEncoding, DifferenceEntry, SimpleEncoding};
use crate::object::{Dictionary, Object};
use std::collections::HashMap;

/// Font information extracted from a PDF font dictionary.
#[derive(Debug, Clone)]
pub struct FontInfo {
    /// Base font name (e.g., "Times-Roman", "Helvetica-Bold").
    pub base_font: String,
    /// Font subtype (e.g., "Type1", "TrueType", "Type0").
    pub subtype: String,
    /// Encoding used to map character codes to Unicode for simple fonts.
    pub encoding: Encoding,
    /// ToUnicode CMap, lazily parsed on first character lookup.
    pub to_unicode: Option<LazyCMap>,
    /// Font descriptor flags (bit field). Bit 3 (0x4) is Symbolic.
    /// PDF spec ISO 32000-1:2008, Table 123.
    pub flags: Option<i32>,
    /// Character widths in 1000ths of em, indexed by (char_code - first_char).
    /// Simple fonts only.
    pub widths: Option<Vec<f32>>,
    pub first_char: Option<u32>,
    pub last_char: Option<u32>,
    /// Default width for codes outside `widths` (1000ths of em).
    pub default_width: f32,
    /// CID to GID mapping (Type0 fonts only).
    pub cid_to_gid_map: Option<CIDToGIDMap>,
    /// CIDFont character collection (Type0 fonts only).
    pub cid_system_info: Option<CIDSystemInfo>,
    /// CIDFont subtype ("CIDFontType0" or "CIDFontType2").
    pub cid_font_type: Option<String>,
    /// CID to width mapping, from the CIDFont's `/W` array.
    pub cid_widths: Option<HashMap<u16, f32>>,
    /// Default width for CIDs not in `cid_widths` (`/DW`, default 1000).
    pub cid_default_width: f32,
    /// Ascent from `/FontDescriptor /Ascent`, in 1000ths of em. PDF spec
    /// ISO 32000-1:2008, Table 122. Falls back to a typical Latin-text value.
    pub ascent: f32,
    /// Descent from `/FontDescriptor /Descent` (negative), in 1000ths of em.
    pub descent: f32,
}

/// Font encoding, resolved enough to decode a single-byte character code.
#[derive(Debug, Clone)]
pub enum Encoding {
    /// A simple encoding (base table plus any `/Differences`).
    Simple(SimpleEncoding),
    /// Identity encoding: codes are used as-is (Type0/CID fonts).
    Identity,
}

/// CID to GID mapping for CIDFontType2 (TrueType-based) fonts.
/// PDF spec ISO 32000-1:2008, Section 9.7.4.2.
#[derive(Debug, Clone)]
pub enum CIDToGIDMap {
    /// CID == GID (the default, and the only option for CIDFontType0).
    Identity,
    /// Explicit CID -> GID array, parsed from a big-endian uint16 stream.
    Explicit(Vec<u16>),
}

impl CIDToGIDMap {
    pub fn get_gid(&self, cid: u16) -> u16 {
        match self {
            CIDToGIDMap::Identity => cid,
            CIDToGIDMap::Explicit(map) => map.get(cid as usize).copied().unwrap_or(cid),
        }
    }
}

/// CIDFont character collection identifier (e.g. Adobe-Japan1).
/// PDF spec ISO 32000-1:2008, Section 9.7.3.
#[derive(Debug, Clone)]
pub struct CIDSystemInfo {
    pub registry: String,
    pub ordering: String,
    pub supplement: i32,
}

const SYMBOLIC_BIT: i32 = 1 << 2;
const FIXED_PITCH_BIT: i32 = 1 << 0;

fn is_symbolic(flags: Option<i32>) -> bool {
    flags.map(|f| f & SYMBOLIC_BIT != 0).unwrap_or(false)
}

impl FontInfo {
    /// Parse font information from a font dictionary object.
    pub fn from_dict(dict: &Object, doc: &mut PdfDocument) -> Result<Self> {
        let font_dict = dict.as_dict().ok_or_else(|| Error::ParseError {
            offset: 0,
            reason: "Font object is not a dictionary".to_string(),
        })?;

        let base_font = font_dict
            .get("BaseFont")
            .and_then(|obj| obj.as_name())
            .unwrap_or("Unknown")
            .to_string();

        let subtype = font_dict
            .get("Subtype")
            .and_then(|obj| obj.as_name())
            .unwrap_or("Unknown")
            .to_string();

        let descriptor_dict = font_dict
            .get("FontDescriptor")
            .and_then(|obj| obj.as_reference())
            .and_then(|r| doc.load_object(r).ok());

        let flags = descriptor_dict.as_ref().and_then(|descriptor| {
            descriptor
                .as_dict()
                .and_then(|d| d.get("Flags"))
                .and_then(|f| f.as_integer())
                .map(|f| f as i32)
        });

        let ascent = descriptor_dict
            .as_ref()
            .and_then(|d| d.as_dict())
            .and_then(|d| d.get("Ascent"))
            .and_then(|o| o.as_integer().map(|i| i as f32).or_else(|| o.as_real().map(|r| r as f32)))
            .unwrap_or(718.0);
        let descent = descriptor_dict
            .as_ref()
            .and_then(|d| d.as_dict())
            .and_then(|d| d.get("Descent"))
            .and_then(|o| o.as_integer().map(|i| i as f32).or_else(|| o.as_real().map(|r| r as f32)))
            .unwrap_or(-207.0);

        // PDF spec ISO 32000-1:2008, Section 9.6.6.1: for symbolic fonts the
        // /Encoding entry is ignored in favor of the font's built-in encoding.
        let encoding = if subtype == "Type0" {
            Encoding::Identity
        } else if is_symbolic(flags) && font_dict.get("Encoding").is_none() {
            log::debug!("Font '{}' is symbolic with no /Encoding, using StandardEncoding as a built-in fallback", base_font);
            Encoding::Simple(SimpleEncoding::new(BaseEncoding::Standard))
        } else if let Some(enc_obj) = font_dict.get("Encoding") {
            let resolved = if let Some(r) = enc_obj.as_reference() {
                doc.load_object(r)?
            } else {
                enc_obj.clone()
            };
            Encoding::Simple(Self::parse_encoding(&resolved)?)
        } else {
            Encoding::Simple(SimpleEncoding::new(BaseEncoding::Standard))
        };

        let to_unicode = font_dict
            .get("ToUnicode")
            .and_then(|obj| obj.as_reference())
            .and_then(|r| doc.load_object(r).ok().map(|o| (o, r)))
            .and_then(|(stream_obj, _r)| stream_obj.decode_stream_data().ok())
            .and_then(|bytes| {
                if parse_tounicode_cmap(&bytes).is_ok() {
                    Some(LazyCMap::new(bytes))
                } else {
                    log::warn!("Font '{}': failed to parse ToUnicode CMap", base_font);
                    None
                }
            });

        let (widths, first_char, last_char) = if subtype != "Type0" {
            let widths = font_dict.get("Widths").and_then(|w| {
                let resolved = if let Some(r) = w.as_reference() {
                    doc.load_object(r).ok()?
                } else {
                    w.clone()
                };
                resolved.as_array().map(|arr| {
                    arr.iter()
                        .filter_map(|o| o.as_integer().map(|i| i as f32).or_else(|| o.as_real().map(|r| r as f32)))
                        .collect::<Vec<f32>>()
                })
            });
            let first = font_dict.get("FirstChar").and_then(|o| o.as_integer()).map(|i| i as u32);
            let last = font_dict.get("LastChar").and_then(|o| o.as_integer()).map(|i| i as u32);
            (widths, first, last)
        } else {
            (None, None, None)
        };

        let default_width = match flags {
            Some(f) if f & FIXED_PITCH_BIT != 0 => 600.0,
            Some(_) => 500.0,
            None => 550.0,
        };

        let (cid_to_gid_map, cid_system_info, cid_font_type, cid_widths, cid_default_width) =
            if subtype == "Type0" {
                match Self::parse_descendant_fonts(font_dict, &base_font, doc) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        log::warn!(
                            "Font '{}': failed to parse DescendantFonts: {}. Using Identity fallback.",
                            base_font,
                            e
                        );
                        (Some(CIDToGIDMap::Identity), None, None, None, 1000.0)
                    },
                }
            } else {
                (None, None, None, None, 1000.0)
            };

        Ok(FontInfo {
            base_font,
            subtype,
            encoding,
            to_unicode,
            flags,
            widths,
            first_char,
            last_char,
            default_width,
            cid_to_gid_map,
            cid_system_info,
            cid_font_type,
            cid_widths,
            cid_default_width,
            ascent,
            descent,
        })
    }

    /// Parse an `/Encoding` entry: either a base-encoding name, or a
    /// dictionary with an optional `/BaseEncoding` and `/Differences`.
    fn parse_encoding(enc_obj: &Object) -> Result<SimpleEncoding> {
        if let Some(name) = enc_obj.as_name() {
            let base = BaseEncoding::from_name(name).unwrap_or(BaseEncoding::Standard);
            return Ok(SimpleEncoding::new(base));
        }

        if let Some(dict) = enc_obj.as_dict() {
            let base = dict
                .get("BaseEncoding")
                .and_then(|o| o.as_name())
                .and_then(BaseEncoding::from_name)
                .unwrap_or(BaseEncoding::Standard);
            let mut encoding = SimpleEncoding::new(base);

            if let Some(diff_array) = dict.get("Differences").and_then(|o| o.as_array()) {
                let entries: Vec<DifferenceEntry> = diff_array
                    .iter()
                    .filter_map(|item| match item {
                        Object::Integer(code) => Some(DifferenceEntry::Code(*code as u32)),
                        Object::Name(name) => Some(DifferenceEntry::Name(name.clone())),
                        _ => None,
                    })
                    .collect();
                encoding.apply_differences(&entries);
            }
            return Ok(encoding);
        }

        Err(Error::ParseError {
            offset: 0,
            reason: "Encoding entry is neither a name nor a dictionary".to_string(),
        })
    }

    fn parse_cidsysteminfo(
        cidfont_dict: &Dictionary,
        doc: &mut PdfDocument,
    ) -> Result<CIDSystemInfo> {
        let sysinfo_obj = cidfont_dict.get("CIDSystemInfo").ok_or_else(|| Error::ParseError {
            offset: 0,
            reason: "CIDFont missing required /CIDSystemInfo entry".to_string(),
        })?;
        let resolved = if let Some(r) = sysinfo_obj.as_reference() {
            doc.load_object(r)?
        } else {
            sysinfo_obj.clone()
        };
        let sysinfo_dict = resolved.as_dict().ok_or_else(|| Error::ParseError {
            offset: 0,
            reason: "CIDSystemInfo is not a dictionary".to_string(),
        })?;

        Ok(CIDSystemInfo {
            registry: sysinfo_dict
                .get("Registry")
                .and_then(|o| o.as_string())
                .map(|s| String::from_utf8_lossy(s).to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            ordering: sysinfo_dict
                .get("Ordering")
                .and_then(|o| o.as_string())
                .map(|s| String::from_utf8_lossy(s).to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            supplement: sysinfo_dict.get("Supplement").and_then(|o| o.as_integer()).unwrap_or(0) as i32,
        })
    }

    /// Parse `/DescendantFonts` for a Type0 font: subtype, CIDSystemInfo,
    /// CIDToGIDMap, and the `/W`/`/DW` width tables.
    /// PDF spec ISO 32000-1:2008, Section 9.7.
    fn parse_descendant_fonts(
        font_dict: &Dictionary,
        base_font: &str,
        doc: &mut PdfDocument,
    ) -> Result<(
        Option<CIDToGIDMap>,
        Option<CIDSystemInfo>,
        Option<String>,
        Option<HashMap<u16, f32>>,
        f32,
    )> {
        let descendant_obj = font_dict.get("DescendantFonts").ok_or_else(|| Error::ParseError {
            offset: 0,
            reason: format!("Type0 font '{}' missing required /DescendantFonts entry", base_font),
        })?;
        let resolved = if let Some(r) = descendant_obj.as_reference() {
            doc.load_object(r)?
        } else {
            descendant_obj.clone()
        };
        let array = resolved.as_array().ok_or_else(|| Error::ParseError {
            offset: 0,
            reason: format!("Type0 font '{}': DescendantFonts is not an array", base_font),
        })?;
        let cidfont_ref = array
            .first()
            .and_then(|o| o.as_reference())
            .ok_or_else(|| Error::ParseError {
                offset: 0,
                reason: format!("Type0 font '{}': DescendantFonts[0] is not a reference", base_font),
            })?;

        let cidfont_obj = doc.load_object(cidfont_ref)?;
        let cidfont_dict = cidfont_obj.as_dict().ok_or_else(|| Error::ParseError {
            offset: 0,
            reason: format!("Type0 font '{}': CIDFont is not a dictionary", base_font),
        })?;

        let cid_font_type = cidfont_dict
            .get("Subtype")
            .and_then(|o| o.as_name())
            .ok_or_else(|| Error::ParseError {
                offset: 0,
                reason: format!("Type0 font '{}': CIDFont missing required /Subtype", base_font),
            })?
            .to_string();

        let cid_system_info = Self::parse_cidsysteminfo(cidfont_dict, doc).ok();

        let cid_to_gid_map = if cid_font_type == "CIDFontType2" {
            match cidfont_dict.get("CIDToGIDMap") {
                None => Some(CIDToGIDMap::Identity),
                Some(obj) if obj.as_name() == Some("Identity") => Some(CIDToGIDMap::Identity),
                Some(obj) => {
                    if let Some(r) = obj.as_reference() {
                        match doc.load_object(r).and_then(|s| s.decode_stream_data()) {
                            Ok(data) if !data.is_empty() && data.len() % 2 == 0 => Some(
                                CIDToGIDMap::Explicit(
                                    data.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect(),
                                ),
                            ),
                            _ => Some(CIDToGIDMap::Identity),
                        }
                    } else {
                        Some(CIDToGIDMap::Identity)
                    }
                },
            }
        } else {
            Some(CIDToGIDMap::Identity)
        };

        let dw = cidfont_dict.get("DW").and_then(|o| o.as_integer()).unwrap_or(1000) as f32;
        let cid_widths = cidfont_dict
            .get("W")
            .and_then(|o| {
                let resolved = if let Some(r) = o.as_reference() {
                    doc.load_object(r).ok()?
                } else {
                    o.clone()
                };
                resolved.as_array().cloned()
            })
            .map(|arr| Self::parse_cid_widths(&arr));

        Ok((cid_to_gid_map, cid_system_info, Some(cid_font_type), cid_widths, dw))
    }

    /// Parse a `/W` array: a sequence of either
    /// `c [w1 w2 ... wn]` (individual widths starting at CID `c`) or
    /// `cFirst cLast w` (a single width spanning `cFirst..=cLast`).
    /// PDF spec ISO 32000-1:2008, Section 9.7.4.3.
    fn parse_cid_widths(arr: &[Object]) -> HashMap<u16, f32> {
        let mut widths = HashMap::new();
        let mut i = 0;
        while i < arr.len() {
            let Some(first) = arr[i].as_integer() else {
                i += 1;
                continue;
            };
            if i + 1 >= arr.len() {
                break;
            }
            if let Some(arr2) = arr[i + 1].as_array() {
                for (offset, w) in arr2.iter().enumerate() {
                    if let Some(w) = w.as_integer().map(|v| v as f32).or_else(|| w.as_real().map(|v| v as f32)) {
                        if let Ok(cid) = u16::try_from(first + offset as i64) {
                            widths.insert(cid, w);
                        }
                    }
                }
                i += 2;
            } else if i + 2 < arr.len() {
                let last = arr[i + 1].as_integer().unwrap_or(first);
                let w = arr[i + 2]
                    .as_integer()
                    .map(|v| v as f32)
                    .or_else(|| arr[i + 2].as_real().map(|v| v as f32))
                    .unwrap_or(1000.0);
                for cid in first..=last {
                    if let Ok(cid) = u16::try_from(cid) {
                        widths.insert(cid, w);
                    }
                }
                i += 3;
            } else {
                break;
            }
        }
        widths
    }

    /// Map a character code to Unicode text.
    ///
    /// Priority order: ToUnicode CMap (most reliable), then the simple-font
    /// encoding table. Type0 fonts without a ToUnicode CMap have no way to
    /// recover Unicode and return `None`.
    pub fn char_to_unicode(&self, char_code: u32) -> Option<String> {
        if let Some(to_unicode) = &self.to_unicode {
            if let Some(cmap) = to_unicode.get() {
                if let Some(s) = cmap.get(&char_code) {
                    return Some(s.clone());
                }
            }
        }

        match &self.encoding {
            Encoding::Simple(enc) => {
                let code = u8::try_from(char_code).ok()?;
                enc.decode(code).map(|c| c.to_string())
            },
            Encoding::Identity => None,
        }
    }

    /// Look up the width (in 1000ths of em) of a simple-font character code.
    pub fn width_for_code(&self, char_code: u32) -> f32 {
        if let (Some(widths), Some(first)) = (&self.widths, self.first_char) {
            if char_code >= first {
                let idx = (char_code - first) as usize;
                if let Some(w) = widths.get(idx) {
                    return *w;
                }
            }
        }
        self.default_width
    }

    /// Look up the width (in 1000ths of em) of a CID.
    pub fn width_for_cid(&self, cid: u16) -> f32 {
        self.cid_widths
            .as_ref()
            .and_then(|w| w.get(&cid))
            .copied()
            .unwrap_or(self.cid_default_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cid_widths_array_form() {
        let arr = vec![
            Object::Integer(10),
            Object::Array(vec![Object::Integer(500), Object::Integer(600)]),
        ];
        let widths = FontInfo::parse_cid_widths(&arr);
        assert_eq!(widths.get(&10), Some(&500.0));
        assert_eq!(widths.get(&11), Some(&600.0));
    }

    #[test]
    fn cid_widths_range_form() {
        let arr = vec![Object::Integer(10), Object::Integer(20), Object::Integer(750)];
        let widths = FontInfo::parse_cid_widths(&arr);
        assert_eq!(widths.get(&10), Some(&750.0));
        assert_eq!(widths.get(&20), Some(&750.0));
        assert_eq!(widths.get(&15), Some(&750.0));
    }

    #[test]
    fn cid_to_gid_identity_passthrough() {
        assert_eq!(CIDToGIDMap::Identity.get_gid(42), 42);
    }

    #[test]
    fn cid_to_gid_explicit_out_of_range_falls_back_to_identity() {
        let map = CIDToGIDMap::Explicit(vec![7, 8, 9]);
        assert_eq!(map.get_gid(1), 8);
        assert_eq!(map.get_gid(99), 99);
    }
}
