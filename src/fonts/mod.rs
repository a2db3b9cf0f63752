//! Font handling and encoding.
//!
//! Font dictionary parsing, simple-font encoding tables, and ToUnicode CMap
//! parsing, together providing the character-code-to-Unicode mapping that
//! drives text extraction.

pub mod cmap;
pub mod encoding;
pub mod font_dict;

pub use cmap::{parse_tounicode_cmap, CMap, LazyCMap};
pub use encoding::{BaseEncoding, DifferenceEntry, SimpleEncoding};
pub use font_dict::{CIDSystemInfo, CIDToGIDMap, Encoding, FontInfo};
