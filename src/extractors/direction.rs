//! Reading-direction classification for extracted text.
//!
//! Classification is per-character, driven by Unicode block ranges rather
//! than a full bidi algorithm: a fragment only ever needs a single,
//! majority-vote direction, not run-level bidi reordering.

/// Reading direction of an extracted text fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Left-to-right (Latin, Cyrillic, Greek, CJK, etc.)
    Ltr,
    /// Right-to-left (Hebrew, Arabic, Syriac, Thaana, N'Ko, and related
    /// presentation-form blocks).
    Rtl,
    /// No directional characters present (digits, punctuation, whitespace).
    Neutral,
}

fn char_direction(c: char) -> Direction {
    let cp = c as u32;
    let is_rtl = matches!(cp,
        0x0590..=0x05FF   // Hebrew
        | 0x0600..=0x06FF // Arabic
        | 0x0700..=0x074F // Syriac
        | 0x0750..=0x077F // Arabic Supplement
        | 0x0780..=0x07BF // Thaana
        | 0x07C0..=0x07FF // NKo
        | 0x08A0..=0x08FF // Arabic Extended-A
        | 0xFB1D..=0xFB4F // Hebrew presentation forms
        | 0xFB50..=0xFDFF // Arabic presentation forms A
        | 0xFE70..=0xFEFF // Arabic presentation forms B
    );
    if is_rtl {
        return Direction::Rtl;
    }
    if c.is_alphabetic() {
        Direction::Ltr
    } else {
        Direction::Neutral
    }
}

/// Classify a run of text as the majority direction of its non-neutral
/// characters, ties (including an all-neutral run) resolving to `Ltr`.
pub fn classify(text: &str) -> Direction {
    let (mut ltr, mut rtl) = (0usize, 0usize);
    for c in text.chars() {
        match char_direction(c) {
            Direction::Ltr => ltr += 1,
            Direction::Rtl => rtl += 1,
            Direction::Neutral => {},
        }
    }
    if rtl > ltr {
        Direction::Rtl
    } else {
        Direction::Ltr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_latin_as_ltr() {
        assert_eq!(classify("Hello World"), Direction::Ltr);
    }

    #[test]
    fn classifies_hebrew_as_rtl() {
        assert_eq!(classify("\u{05E9}\u{05DC}\u{05D5}\u{05DD}"), Direction::Rtl);
    }

    #[test]
    fn classifies_arabic_as_rtl() {
        assert_eq!(classify("\u{0628}\u{0644}"), Direction::Rtl);
    }

    #[test]
    fn digits_only_tie_resolves_to_ltr() {
        assert_eq!(classify("1234"), Direction::Ltr);
    }

    #[test]
    fn mixed_run_majority_wins() {
        // one Latin letter, three Hebrew letters
        assert_eq!(classify("A\u{05D0}\u{05D1}\u{05D2}"), Direction::Rtl);
    }
}
