//! Derived caches.
//!
//! All three caches are materializations of base-table state. Dropping any
//! of them at any moment changes performance, never correctness.

pub mod media_count;
pub mod slug_resolution;
pub mod system_tags;
