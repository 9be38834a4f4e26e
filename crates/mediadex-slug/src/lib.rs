//! # mediadex-slug
//!
//! Deterministic title normalization for the media index.
//!
//! A fixed pipeline of stages turns raw titles into search-friendly slugs:
//! Unicode fold, bracket-metadata strip, separator split, roman-numeral
//! substitution (non-TV), episode-code canonicalization (TV), stop-word
//! removal, tokenization. The same token list that forms the slug feeds the
//! stored metadata used as a fuzzy-match prefilter.
//!
//! Normalization is total and performs no I/O.
//!
//! ## Quick start
//!
//! ```
//! use mediadex_common::MediaType;
//! use mediadex_slug::{slug_with_metadata, slugify};
//!
//! assert_eq!(
//!     slugify(MediaType::Game, "The Legend of Zelda (USA)"),
//!     "legend zelda"
//! );
//!
//! let meta = slug_with_metadata(MediaType::Game, "Final Fantasy VII");
//! assert_eq!(meta.slug, "final fantasy 7");
//! assert_eq!(meta.slug_word_count, 3);
//! ```

pub mod metadata;
pub mod pipeline;
pub mod script;
mod tables;

pub use metadata::{
    slug_with_metadata, within_prefilter_bounds, SlugMetadata, MAX_LENGTH_DELTA,
    MAX_WORD_COUNT_DELTA,
};
pub use pipeline::{slugify, slugify_with_tokens, SlugTokens};
pub use script::detect_script;
