//! Writing-script classification for normalized slugs.
//!
//! The classification feeds two decisions: CJK input bypasses word
//! tokenization (bigram counting instead), and non-Latin queries widen the
//! search to raw names.

use mediadex_common::Script;

fn classify(c: char) -> Option<Script> {
    match c as u32 {
        0x0000..=0x024F => Some(Script::Latin),
        0x0370..=0x03FF | 0x1F00..=0x1FFF => Some(Script::Greek),
        0x0400..=0x052F => Some(Script::Cyrillic),
        0x0600..=0x06FF | 0x0750..=0x077F | 0x08A0..=0x08FF => Some(Script::Arabic),
        0x3040..=0x30FF | 0x3130..=0x318F | 0x3400..=0x4DBF | 0x4E00..=0x9FFF
        | 0xAC00..=0xD7AF | 0xF900..=0xFAFF => Some(Script::Cjk),
        _ => None,
    }
}

/// Classify a string by the dominant script of its alphabetic characters.
///
/// Strings without alphabetic characters classify as [`Script::Other`].
/// Ties resolve in favor of Latin, then Cyrillic, Greek, Arabic, CJK.
pub fn detect_script(s: &str) -> Script {
    let mut counts = [0usize; 5];
    for c in s.chars().filter(|c| c.is_alphabetic()) {
        match classify(c) {
            Some(Script::Latin) => counts[0] += 1,
            Some(Script::Cyrillic) => counts[1] += 1,
            Some(Script::Greek) => counts[2] += 1,
            Some(Script::Arabic) => counts[3] += 1,
            Some(Script::Cjk) => counts[4] += 1,
            _ => {}
        }
    }

    const ORDER: [Script; 5] = [
        Script::Latin,
        Script::Cyrillic,
        Script::Greek,
        Script::Arabic,
        Script::Cjk,
    ];

    let mut best = Script::Other;
    let mut best_count = 0;
    for (i, script) in ORDER.iter().enumerate() {
        if counts[i] > best_count {
            best = *script;
            best_count = counts[i];
        }
    }
    best
}
