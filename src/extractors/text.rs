//! Text-showing-operator extraction: drives a content stream through a
//! [`GraphicsStateStack`] and turns each text-showing operation into zero or
//! one [`TextFragment`].
//!
//! PDF Spec: ISO 32000-1:2008, Section 9.4 (Text Objects) for the operator
//! semantics, Section 9.4.4 for the glyph-advance formula.

use std::collections::HashMap;

use unicode_normalization::UnicodeNormalization;

use crate::content::{parse_content_stream, GraphicsState, GraphicsStateStack, Matrix, Operator, TextElement};
use crate::error::Result;
use crate::extractors::direction::{self, Direction};
use crate::fonts::FontInfo;

/// Fallback ascent/descent (1000ths of em) used when no font is loaded for
/// the current `Tf`. Matches `FontInfo::from_dict`'s own fallback for fonts
/// with no `/FontDescriptor`.
const DEFAULT_ASCENT: f64 = 718.0;
const DEFAULT_DESCENT: f64 = -207.0;
/// Fallback glyph width (1000ths of em) when no font is loaded.
const DEFAULT_GLYPH_WIDTH: f32 = 500.0;

/// One run of text recovered from a single text-showing operation (`Tj`,
/// one string element of a `TJ` array, `'`, or `"`).
///
/// Coordinates are in default (page) user space: post-CTM, post-text-matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    /// Decoded, NFC-normalized Unicode text.
    pub text: String,
    /// Position of the text-rendering-matrix-transformed origin (0, 0).
    pub origin: (f64, f64),
    /// Horizontal advance consumed by the run, in user-space units.
    pub width: f64,
    /// `font_size * (ascent - descent)`, scaled by the CTM's y-scale.
    pub height: f64,
    /// Resource name of the font in effect (`/F1`-style name, without the
    /// leading slash), or empty if no font was selected.
    pub font_name: String,
    /// Font size (`Tf`'s second operand) in effect for this run.
    pub font_size: f64,
    /// Reading direction, classified from the decoded text.
    pub direction: Direction,
}

/// Extract all text fragments from a page's (already-concatenated) content
/// stream.
///
/// `fonts` maps a page's `/Resources /Font` names (e.g. `"F1"`) to their
/// parsed [`FontInfo`]. A `Tf` naming a font absent from this map falls back
/// to ASCII passthrough for printable codes and U+FFFD otherwise.
pub fn extract_text_fragments(content: &[u8], fonts: &HashMap<String, FontInfo>) -> Result<Vec<TextFragment>> {
    let ops = parse_content_stream(content)?;
    let mut stack = GraphicsStateStack::new();
    let mut fragments = Vec::new();

    for op in ops {
        match op {
            Operator::SaveState => stack.save()?,
            Operator::RestoreState => stack.restore()?,
            Operator::Cm { a, b, c, d, e, f } => {
                let m = Matrix { a, b, c, d, e, f };
                let new_ctm = m.multiply(&stack.current().ctm);
                stack.current_mut().ctm = new_ctm;
            },

            Operator::BeginText => {
                let state = stack.current_mut();
                state.text_matrix = Matrix::identity();
                state.text_line_matrix = Matrix::identity();
            },
            Operator::EndText => {},

            Operator::Tc { char_space } => stack.current_mut().char_space = char_space,
            Operator::Tw { word_space } => stack.current_mut().word_space = word_space,
            Operator::Tz { scale } => stack.current_mut().horizontal_scaling = scale,
            Operator::TL { leading } => stack.current_mut().leading = leading,
            Operator::Tr { render } => stack.current_mut().render_mode = render,
            Operator::Ts { rise } => stack.current_mut().text_rise = rise,
            Operator::Tf { font, size } => {
                let state = stack.current_mut();
                state.font_name = Some(font);
                state.font_size = size;
            },

            Operator::Tm { a, b, c, d, e, f } => {
                let state = stack.current_mut();
                state.text_matrix = Matrix { a, b, c, d, e, f };
                state.text_line_matrix = state.text_matrix;
            },
            Operator::Td { tx, ty } => {
                let state = stack.current_mut();
                let tm = Matrix::translation(tx, ty);
                state.text_line_matrix = tm.multiply(&state.text_line_matrix);
                state.text_matrix = state.text_line_matrix;
            },
            Operator::TD { tx, ty } => {
                let state = stack.current_mut();
                state.leading = -ty;
                let tm = Matrix::translation(tx, ty);
                state.text_line_matrix = tm.multiply(&state.text_line_matrix);
                state.text_matrix = state.text_line_matrix;
            },
            Operator::TStar => {
                let state = stack.current_mut();
                let tm = Matrix::translation(0.0, -state.leading);
                state.text_line_matrix = tm.multiply(&state.text_line_matrix);
                state.text_matrix = state.text_line_matrix;
            },

            Operator::Tj { text } => {
                if let Some(fragment) = show_string(&mut stack, fonts, &text) {
                    fragments.push(fragment);
                }
            },
            Operator::TJ { array } => {
                for element in array {
                    match element {
                        TextElement::String(s) => {
                            if let Some(fragment) = show_string(&mut stack, fonts, &s) {
                                fragments.push(fragment);
                            }
                        },
                        // Negative offsets widen the gap (kerning/inter-word
                        // spacing); positive offsets narrow it.
                        TextElement::Offset(offset) => {
                            let state = stack.current();
                            let tx = -offset / 1000.0 * state.font_size * (state.horizontal_scaling / 100.0);
                            let tm = Matrix::translation(tx, 0.0);
                            let new_tm = tm.multiply(&state.text_matrix);
                            stack.current_mut().text_matrix = new_tm;
                        },
                    }
                }
            },
            // ' : move to next line, then show text (T* string Tj).
            Operator::Quote { text } => {
                {
                    let state = stack.current_mut();
                    let tm = Matrix::translation(0.0, -state.leading);
                    state.text_line_matrix = tm.multiply(&state.text_line_matrix);
                    state.text_matrix = state.text_line_matrix;
                }
                if let Some(fragment) = show_string(&mut stack, fonts, &text) {
                    fragments.push(fragment);
                }
            },
            // " : set spacing, then do the ' sequence (aw Tw ac Tc ' string).
            Operator::DoubleQuote {
                word_space,
                char_space,
                text,
            } => {
                {
                    let state = stack.current_mut();
                    state.word_space = word_space;
                    state.char_space = char_space;
                    let tm = Matrix::translation(0.0, -state.leading);
                    state.text_line_matrix = tm.multiply(&state.text_line_matrix);
                    state.text_matrix = state.text_line_matrix;
                }
                if let Some(fragment) = show_string(&mut stack, fonts, &text) {
                    fragments.push(fragment);
                }
            },

            // Graphics/path/color/marked-content/XObject operators don't
            // affect text extraction (spec: "tracked but most have no side
            // effect on text").
            _ => {},
        }
    }

    Ok(fragments)
}

/// Text-rendering matrix: `[[Tfs·Tz/100, 0, 0], [0, Tfs, 0], [0, Trise, 1]] · Tm · CTM`.
fn text_rendering_matrix(state: &GraphicsState) -> Matrix {
    let scale = Matrix {
        a: state.font_size * (state.horizontal_scaling / 100.0),
        b: 0.0,
        c: 0.0,
        d: state.font_size,
        e: 0.0,
        f: state.text_rise,
    };
    scale.multiply(&state.text_matrix).multiply(&state.ctm)
}

/// Decode and show one text-showing operand, advancing the text matrix as
/// each code is consumed, and return the resulting fragment (`None` if the
/// string decoded to no characters at all, e.g. an empty operand).
fn show_string(stack: &mut GraphicsStateStack, fonts: &HashMap<String, FontInfo>, bytes: &[u8]) -> Option<TextFragment> {
    if bytes.is_empty() {
        return None;
    }

    let font_name = stack.current().font_name.clone();
    let font = font_name.as_ref().and_then(|name| fonts.get(name));

    let start = origin_of(&text_rendering_matrix(stack.current()));

    let mut text = String::new();
    for (code, is_ascii_space) in decode_codes(bytes, font) {
        text.push_str(&decode_code(code, font));

        let glyph_width = match font {
            Some(f) if f.subtype == "Type0" => f.width_for_cid(code as u16),
            Some(f) => f.width_for_code(code),
            None => DEFAULT_GLYPH_WIDTH,
        };

        let state = stack.current();
        let word_space = if is_ascii_space { state.word_space } else { 0.0 };
        let tx =
            ((glyph_width / 1000.0) * state.font_size + state.char_space + word_space) * (state.horizontal_scaling / 100.0);
        stack.current_mut().text_matrix.e += tx;
    }

    if text.is_empty() {
        return None;
    }
    let text: String = text.nfc().collect();

    let state = stack.current();
    let end = origin_of(&text_rendering_matrix(state));
    let width = ((end.0 - start.0).powi(2) + (end.1 - start.1).powi(2)).sqrt();

    // The CTM's y-basis vector (c, d) gives its y-scale factor, robust to
    // rotation (plain d.abs() is only correct for axis-aligned CTMs).
    let y_scale = ((state.ctm.c * state.ctm.c + state.ctm.d * state.ctm.d) as f64).sqrt();
    let (ascent, descent) = font.map(|f| (f.ascent as f64, f.descent as f64)).unwrap_or((DEFAULT_ASCENT, DEFAULT_DESCENT));
    let height = state.font_size as f64 * (ascent - descent) / 1000.0 * y_scale;

    let direction = direction::classify(&text);

    Some(TextFragment {
        text,
        origin: start,
        width,
        height,
        font_name: font_name.unwrap_or_default(),
        font_size: state.font_size as f64,
        direction,
    })
}

fn origin_of(trm: &Matrix) -> (f64, f64) {
    (trm.e as f64, trm.f as f64)
}

/// Split a text-showing operand into character codes.
///
/// Simple fonts (and the no-font fallback) use 1-byte codes. Type0 fonts
/// default to 2-byte codes (`Identity-H`/`Identity-V`, the only composite
/// encodings `FontInfo` resolves to CIDs directly) but defer to the
/// ToUnicode CMap's declared codespace ranges when present, since those are
/// required to be checked narrowest-width-first.
fn decode_codes(bytes: &[u8], font: Option<&FontInfo>) -> Vec<(u32, bool)> {
    let is_type0 = font.map(|f| f.subtype == "Type0").unwrap_or(false);
    if !is_type0 {
        return bytes.iter().map(|&b| (b as u32, b == 0x20)).collect();
    }

    let cmap = font.and_then(|f| f.to_unicode.as_ref()).and_then(|c| c.get());
    let mut codes = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let remaining = &bytes[i..];
        let width = cmap
            .as_ref()
            .and_then(|c| c.code_width_at(remaining))
            .unwrap_or(2)
            .max(1) as usize;
        let width = width.min(remaining.len()).max(1);

        let mut code: u32 = 0;
        for &b in &remaining[..width] {
            code = (code << 8) | b as u32;
        }
        // Word spacing (Tw) only ever applies to single-byte code 0x20 in a
        // simple font; composite-font codes never trigger it (PDF spec
        // 9.3.3).
        codes.push((code, false));
        i += width;
    }
    codes
}

/// Map one character code to Unicode text, falling back to ASCII passthrough
/// (then U+FFFD) when the font is missing or has no mapping for the code.
fn decode_code(code: u32, font: Option<&FontInfo>) -> String {
    if let Some(s) = font.and_then(|f| f.char_to_unicode(code)) {
        return s;
    }
    if (0x20..=0x7E).contains(&code) {
        char::from_u32(code).map(|c| c.to_string()).unwrap_or_else(|| "\u{FFFD}".to_string())
    } else {
        "\u{FFFD}".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tj_without_font_falls_back_to_ascii() {
        let content = b"BT /F1 12 Tf 72 720 Td (Hello World) Tj ET";
        let fonts = HashMap::new();
        let fragments = extract_text_fragments(content, &fonts).unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, "Hello World");
        assert!((fragments[0].origin.0 - 72.0).abs() < 0.01);
        assert!((fragments[0].origin.1 - 720.0).abs() < 0.01);
        assert_eq!(fragments[0].direction, Direction::Ltr);
    }

    #[test]
    fn tj_advances_text_matrix_between_operators() {
        let content = b"BT /F1 12 Tf 0 0 Td (AB) Tj (CD) Tj ET";
        let fonts = HashMap::new();
        let fragments = extract_text_fragments(content, &fonts).unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].text, "AB");
        assert_eq!(fragments[1].text, "CD");
        assert!(fragments[1].origin.0 > fragments[0].origin.0);
    }

    #[test]
    fn tj_array_splits_strings_and_applies_kerning_offsets() {
        let content = b"BT /F1 12 Tf 0 0 Td [(Wo) -250 (rld)] TJ ET";
        let fonts = HashMap::new();
        let fragments = extract_text_fragments(content, &fonts).unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].text, "Wo");
        assert_eq!(fragments[1].text, "rld");
        // the negative offset widens the gap past the plain glyph advance
        assert!(fragments[1].origin.0 > fragments[0].origin.0 + fragments[0].width);
    }

    #[test]
    fn quote_operator_moves_to_next_line_before_showing() {
        let content = b"BT /F1 12 Tf 14 TL 0 0 Td (line one) Tj (line two) ' ET";
        let fonts = HashMap::new();
        let fragments = extract_text_fragments(content, &fonts).unwrap();
        assert_eq!(fragments.len(), 2);
        assert!(fragments[1].origin.1 < fragments[0].origin.1);
    }

    #[test]
    fn graphics_state_stack_underflow_in_content_is_an_error() {
        let content = b"BT (x) Tj ET Q";
        let fonts = HashMap::new();
        assert!(extract_text_fragments(content, &fonts).is_err());
    }

    #[test]
    fn empty_string_operand_emits_no_fragment() {
        let content = b"BT /F1 12 Tf () Tj ET";
        let fonts = HashMap::new();
        let fragments = extract_text_fragments(content, &fonts).unwrap();
        assert!(fragments.is_empty());
    }
}
