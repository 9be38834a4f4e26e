//! Static token tables used by the normalization pipeline.

use phf::{phf_map, phf_set};

/// Words dropped during the stop-word stage. Conservative on purpose: only
/// connectives that carry no search signal.
pub static STOP_WORDS: phf::Set<&'static str> = phf_set! {
    "the", "a", "an", "and", "of", "to", "in", "on", "at", "for", "with",
};

/// Multi-character roman numerals II through XX mapped to their arabic
/// forms. Single letters (i, v, x) are never converted: they collide with
/// real words and title letters far more often than with numbering.
pub static ROMAN_NUMERALS: phf::Map<&'static str, &'static str> = phf_map! {
    "ii" => "2",
    "iii" => "3",
    "iv" => "4",
    "vi" => "6",
    "vii" => "7",
    "viii" => "8",
    "ix" => "9",
    "xi" => "11",
    "xii" => "12",
    "xiii" => "13",
    "xiv" => "14",
    "xv" => "15",
    "xvi" => "16",
    "xvii" => "17",
    "xviii" => "18",
    "xix" => "19",
    "xx" => "20",
};
