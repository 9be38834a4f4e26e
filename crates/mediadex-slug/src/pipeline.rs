//! The normalization pipeline.
//!
//! Stages run in a fixed order: Unicode fold, bracket-metadata strip,
//! separator split, roman-numeral substitution (non-TV), episode-code
//! canonicalization (TV), stop-word removal, tokenization. The slug is the
//! space-joined token list; metadata is always computed from the same token
//! list the final stage produced, so slug and counts cannot disagree.
//!
//! Normalization is total. Any input, including the empty string, produces
//! a result; no stage can fail.

use mediadex_common::{MediaType, Script};
use unicode_normalization::UnicodeNormalization;

use crate::script::detect_script;
use crate::tables::{ROMAN_NUMERALS, STOP_WORDS};

/// A normalized slug together with the exact token list the final
/// tokenization stage produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugTokens {
    pub slug: String,
    pub tokens: Vec<String>,
}

/// Normalize a raw title into a slug.
pub fn slugify(media_type: MediaType, raw: &str) -> String {
    slugify_with_tokens(media_type, raw).slug
}

/// Normalize a raw title into a slug plus its token list.
pub fn slugify_with_tokens(media_type: MediaType, raw: &str) -> SlugTokens {
    let folded = fold(raw);
    let stripped = strip_bracket_metadata(&folded);
    let (main, _secondary) = split_separator(&stripped);
    build_slug(media_type, &main)
}

/// Run the token stages over already-folded, bracket-stripped text.
pub(crate) fn build_slug(media_type: MediaType, text: &str) -> SlugTokens {
    if detect_script(text) == Script::Cjk {
        return cjk_slug(text);
    }

    let mut tokens = tokenize(text);
    if media_type == MediaType::TvShow {
        canonicalize_episode_codes(&mut tokens);
    } else {
        substitute_roman_numerals(&mut tokens);
    }
    let tokens = remove_stop_words(tokens);
    let slug = tokens.join(" ");
    SlugTokens { slug, tokens }
}

/// NFKD decomposition, diacritic removal, recomposition, case fold.
///
/// Only the combining-diacritics block is stripped (é → e, ή → η). Other
/// combining marks survive and recompose under NFC: kana voicing marks are
/// part of the character, not decoration (ド must stay ド, not become ト).
pub(crate) fn fold(raw: &str) -> String {
    raw.nfkd()
        .filter(|c| !matches!(*c as u32, 0x0300..=0x036F))
        .nfc()
        .flat_map(char::to_lowercase)
        .collect()
}

/// Drop `(...)` and `[...]` groups. Release metadata lives in brackets and
/// must never reach the slug.
pub(crate) fn strip_bracket_metadata(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut parens = 0u32;
    let mut brackets = 0u32;
    for c in s.chars() {
        match c {
            '(' => parens += 1,
            ')' => parens = parens.saturating_sub(1),
            '[' => brackets += 1,
            ']' => brackets = brackets.saturating_sub(1),
            _ if parens == 0 && brackets == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// Split on the first colon, or the first dash surrounded by whitespace.
///
/// Returns the full text with the separator replaced by a space, plus the
/// post-separator portion when a separator was present.
pub(crate) fn split_separator(s: &str) -> (String, Option<String>) {
    let chars: Vec<(usize, char)> = s.char_indices().collect();
    for (pos, &(idx, c)) in chars.iter().enumerate() {
        let is_colon = c == ':';
        let is_spaced_dash = c == '-'
            && pos > 0
            && chars[pos - 1].1.is_whitespace()
            && chars.get(pos + 1).is_some_and(|&(_, n)| n.is_whitespace());
        if is_colon || is_spaced_dash {
            let before = &s[..idx];
            let after = &s[idx + c.len_utf8()..];
            return (format!("{} {}", before, after), Some(after.to_string()));
        }
    }
    (s.to_string(), None)
}

/// Split on every non-alphanumeric character, dropping empties. This also
/// collapses whitespace.
fn tokenize(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn substitute_roman_numerals(tokens: &mut [String]) {
    for token in tokens.iter_mut() {
        if let Some(arabic) = ROMAN_NUMERALS.get(token.as_str()) {
            *token = (*arabic).to_string();
        }
    }
}

fn canonicalize_episode_codes(tokens: &mut [String]) {
    for token in tokens.iter_mut() {
        if let Some(code) = parse_episode_code(token) {
            *token = code;
        }
    }
}

/// Recognize `1x02` and `s1e2` style episode codes.
fn parse_episode_code(token: &str) -> Option<String> {
    let body_split = |body: &str, sep: char| -> Option<(u32, u32)> {
        let (a, b) = body.split_once(sep)?;
        if a.is_empty() || b.is_empty() || a.len() > 2 || b.len() > 3 {
            return None;
        }
        if !a.bytes().all(|c| c.is_ascii_digit()) || !b.bytes().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some((a.parse().ok()?, b.parse().ok()?))
    };

    let parsed = body_split(token, 'x')
        .or_else(|| token.strip_prefix('s').and_then(|body| body_split(body, 'e')));
    parsed.map(|(season, episode)| format!("s{:02}e{:02}", season, episode))
}

/// Remove stop words. If removal would empty the list the unfiltered tokens
/// are kept: a title made entirely of stop words still needs a slug.
fn remove_stop_words(tokens: Vec<String>) -> Vec<String> {
    let filtered: Vec<String> = tokens
        .iter()
        .filter(|t| !STOP_WORDS.contains(t.as_str()))
        .cloned()
        .collect();
    if filtered.is_empty() {
        tokens
    } else {
        filtered
    }
}

/// CJK path: no word tokenization. The slug is the contiguous run of
/// alphanumeric characters; the token list is the slug itself.
fn cjk_slug(text: &str) -> SlugTokens {
    let slug: String = text.chars().filter(|c| c.is_alphanumeric()).collect();
    let tokens = if slug.is_empty() {
        Vec::new()
    } else {
        vec![slug.clone()]
    };
    SlugTokens { slug, tokens }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        let result = slugify_with_tokens(MediaType::Game, "");
        assert_eq!(result.slug, "");
        assert!(result.tokens.is_empty());
    }

    #[test]
    fn test_basic_fold_and_tokenize() {
        let result = slugify_with_tokens(MediaType::Game, "Super Mario Bros.");
        assert_eq!(result.slug, "super mario bros");
        assert_eq!(result.tokens, vec!["super", "mario", "bros"]);
    }

    #[test]
    fn test_diacritics_folded() {
        assert_eq!(slugify(MediaType::Game, "Pokémon"), "pokemon");
    }

    #[test]
    fn test_bracket_metadata_stripped() {
        assert_eq!(
            slugify(MediaType::Game, "Sonic (USA) [Rev 1]"),
            "sonic"
        );
        assert_eq!(
            strip_bracket_metadata("a (b (c) d) e [f] g"),
            "a  e  g"
        );
    }

    #[test]
    fn test_separator_split_colon() {
        let (main, secondary) = split_separator("zelda: ocarina");
        assert_eq!(main, "zelda  ocarina");
        assert_eq!(secondary.as_deref(), Some(" ocarina"));
    }

    #[test]
    fn test_separator_split_spaced_dash_only() {
        let (_, secondary) = split_separator("metroid - zero mission");
        assert_eq!(secondary.as_deref(), Some(" zero mission"));

        // A hyphenated word is not a separator.
        let (main, secondary) = split_separator("f-zero");
        assert_eq!(main, "f-zero");
        assert!(secondary.is_none());
    }

    #[test]
    fn test_roman_numerals_for_games() {
        assert_eq!(
            slugify(MediaType::Game, "Final Fantasy VII"),
            "final fantasy 7"
        );
        assert_eq!(slugify(MediaType::Game, "Street Fighter II"), "street fighter 2");
        // Single letters stay.
        assert_eq!(slugify(MediaType::Game, "Mega Man X"), "mega man x");
    }

    #[test]
    fn test_roman_numerals_skipped_for_tv() {
        assert_eq!(
            slugify(MediaType::TvShow, "Rocky II"),
            "rocky ii"
        );
    }

    #[test]
    fn test_episode_codes_for_tv() {
        assert_eq!(
            slugify(MediaType::TvShow, "Breaking Bad 1x02"),
            "breaking bad s01e02"
        );
        assert_eq!(
            slugify(MediaType::TvShow, "Breaking Bad s1e2"),
            "breaking bad s01e02"
        );
        assert_eq!(
            slugify(MediaType::TvShow, "Breaking Bad S01E02"),
            "breaking bad s01e02"
        );
    }

    #[test]
    fn test_episode_codes_not_applied_for_games() {
        assert_eq!(slugify(MediaType::Game, "mech 1x02"), "mech 1x02");
    }

    #[test]
    fn test_episode_code_rejects_lookalikes() {
        assert!(parse_episode_code("x264").is_none());
        assert!(parse_episode_code("sale").is_none());
        assert!(parse_episode_code("exe").is_none());
        assert_eq!(parse_episode_code("10x100").as_deref(), Some("s10e100"));
    }

    #[test]
    fn test_stop_words_removed() {
        assert_eq!(
            slugify(MediaType::Game, "The Legend of Zelda"),
            "legend zelda"
        );
    }

    #[test]
    fn test_all_stop_words_kept() {
        // Removal would empty the list, so the unfiltered tokens survive.
        assert_eq!(slugify(MediaType::Movie, "The Of"), "the of");
    }

    #[test]
    fn test_kana_voicing_marks_survive_folding() {
        assert_eq!(fold("ドラゴン"), "ドラゴン");
        assert_eq!(fold("Ｐｏｋéｍｏｎ"), "pokemon");
    }

    #[test]
    fn test_cjk_bypasses_tokenization() {
        let result = slugify_with_tokens(MediaType::Game, "ドラゴン クエスト");
        assert_eq!(result.slug, "ドラゴンクエスト");
        assert_eq!(result.tokens, vec!["ドラゴンクエスト"]);
    }

    #[test]
    fn test_slug_is_idempotent() {
        for raw in [
            "The Legend of Zelda: Ocarina of Time",
            "Final Fantasy VII (USA)",
            "Breaking Bad 1x02",
            "ドラゴンクエスト",
            "",
        ] {
            for mt in [MediaType::Game, MediaType::TvShow] {
                let once = slugify(mt, raw);
                let twice = slugify(mt, &once);
                assert_eq!(once, twice, "slug not idempotent for {:?} {:?}", mt, raw);
            }
        }
    }
}
