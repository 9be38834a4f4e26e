//! # mediadex
//!
//! Embedded media indexing and query engine on SQLite.
//!
//! Mediadex ingests large catalogs of media artifacts organized by system
//! (platform), normalizes titles into search-friendly slugs, and serves
//! exact-path lookup, tokenized slug search with cursor pagination and tag
//! filters, and canonical slug resolution for launch commands. A background
//! optimization lifecycle (indexes → analyze → vacuum) keeps the store fast
//! and resumes after interruption.
//!
//! The engine is split across three crates, re-exported here:
//!
//! - [`common`] - shared types, errors, and contracts
//! - [`slug`] - deterministic title normalization and slug metadata
//! - [`db`] - the SQLite-backed index itself
//!
//! ## Quick start
//!
//! ```no_run
//! use mediadex::common::MediaType;
//! use mediadex::db::queries::search;
//! use mediadex::MediaDb;
//!
//! let db = MediaDb::open("/var/lib/mediadex/index.db").unwrap();
//!
//! let tx = db.begin_index().unwrap();
//! let nes = tx.upsert_system("NES", "Nintendo").unwrap();
//! let title = tx
//!     .upsert_media_title(nes, MediaType::Game, "The Legend of Zelda")
//!     .unwrap();
//! tx.add_media(title, nes, "/roms/nes/zelda.nes").unwrap();
//! tx.commit().unwrap();
//!
//! let conn = db.conn().unwrap();
//! let hits = search::search_media_path_exact(
//!     &conn,
//!     &["NES".to_string()],
//!     "/roms/nes/zelda.nes",
//! )
//! .unwrap();
//! assert_eq!(hits.len(), 1);
//! ```

pub use mediadex_common as common;
pub use mediadex_db as db;
pub use mediadex_slug as slug;

pub use mediadex_common::{CancelToken, Error, MediaType, Result, TagFilter, TagOp};
pub use mediadex_db::{IndexTransaction, MediaDb};
