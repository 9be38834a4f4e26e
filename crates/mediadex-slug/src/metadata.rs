//! Slug metadata and the fuzzy-candidate prefilter contract.

use mediadex_common::{MediaType, Script};
use serde::{Deserialize, Serialize};

use crate::pipeline::{build_slug, fold, split_separator, strip_bracket_metadata};
use crate::script::detect_script;

/// Maximum slug-length difference for a fuzzy candidate to pass the
/// prefilter.
pub const MAX_LENGTH_DELTA: u32 = 3;

/// Maximum word-count difference for a fuzzy candidate to pass the
/// prefilter.
pub const MAX_WORD_COUNT_DELTA: u32 = 1;

/// A slug plus the metadata stored alongside it for prefiltered fuzzy
/// matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlugMetadata {
    pub slug: String,
    /// Post-separator portion of titles that contained a colon/dash
    /// separator, normalized through the same pipeline.
    pub secondary_slug: Option<String>,
    /// Rune count of the slug.
    pub slug_length: u32,
    /// Token count; for CJK slugs the bigram count `max(1, runes - 1)`.
    pub slug_word_count: u32,
}

/// Normalize a raw title and compute its stored metadata.
///
/// The counts come from the token list the pipeline produced, never from
/// re-tokenizing the finished slug, so slug and metadata always agree.
pub fn slug_with_metadata(media_type: MediaType, raw: &str) -> SlugMetadata {
    let folded = fold(raw);
    let stripped = strip_bracket_metadata(&folded);
    let (main_text, secondary_text) = split_separator(&stripped);

    let main = build_slug(media_type, &main_text);
    let secondary_slug = secondary_text
        .map(|s| build_slug(media_type, &s).slug)
        .filter(|s| !s.is_empty());

    let slug_length = main.slug.chars().count() as u32;
    let slug_word_count = if detect_script(&main.slug) == Script::Cjk {
        (slug_length.saturating_sub(1)).max(1)
    } else {
        main.tokens.len() as u32
    };

    SlugMetadata {
        slug: main.slug,
        secondary_slug,
        slug_length,
        slug_word_count,
    }
}

/// Prefilter bound: a candidate is worth scoring when its stored metadata
/// is within the declared deltas of the query's.
pub fn within_prefilter_bounds(query: &SlugMetadata, candidate: &SlugMetadata) -> bool {
    query.slug_length.abs_diff(candidate.slug_length) <= MAX_LENGTH_DELTA
        && query
            .slug_word_count
            .abs_diff(candidate.slug_word_count)
            <= MAX_WORD_COUNT_DELTA
}
