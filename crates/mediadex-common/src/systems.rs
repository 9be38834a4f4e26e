//! System-definition lookup consumed by the query layer.
//!
//! The engine does not own the catalog of known platforms; callers provide
//! it through [`SystemDefs`]. Queries that re-slugify user input need the
//! owning system's media type so normalization matches what the indexer
//! stored.

use std::collections::HashMap;

use crate::types::MediaType;

/// Lookup from a system id (e.g. "NES") to its media type.
pub trait SystemDefs {
    /// Media type for a system id, or `None` when the system is unknown.
    fn media_type(&self, system_id: &str) -> Option<MediaType>;
}

/// Simple map-backed [`SystemDefs`] implementation.
#[derive(Debug, Clone, Default)]
pub struct MapSystemDefs {
    defs: HashMap<String, MediaType>,
}

impl MapSystemDefs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a system definition, replacing any previous entry.
    pub fn insert<S: Into<String>>(&mut self, system_id: S, media_type: MediaType) {
        self.defs.insert(system_id.into(), media_type);
    }
}

impl SystemDefs for MapSystemDefs {
    fn media_type(&self, system_id: &str) -> Option<MediaType> {
        self.defs.get(system_id).copied()
    }
}

impl<S: Into<String>> FromIterator<(S, MediaType)> for MapSystemDefs {
    fn from_iter<I: IntoIterator<Item = (S, MediaType)>>(iter: I) -> Self {
        let mut defs = Self::new();
        for (id, mt) in iter {
            defs.insert(id, mt);
        }
        defs
    }
}
