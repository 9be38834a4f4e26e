//! Core type definitions for systems, media, tags, and lifecycle state.
//!
//! All enums serialize in the casing the wire and the DBConfig table use:
//! media types and lifecycle states in lowercase, tag operators in uppercase.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of content a system holds. Drives title normalization: roman
/// numerals are substituted for everything except TV shows, and episode
/// codes are canonicalized only for TV shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// Game content (consoles, computers, arcade).
    Game,
    /// Episodic TV content.
    TvShow,
    /// Film content.
    Movie,
    /// Audio content.
    Music,
    /// Anything else.
    Other,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Game => write!(f, "game"),
            Self::TvShow => write!(f, "tvshow"),
            Self::Movie => write!(f, "movie"),
            Self::Music => write!(f, "music"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "game" => Ok(Self::Game),
            "tvshow" => Ok(Self::TvShow),
            "movie" => Ok(Self::Movie),
            "music" => Ok(Self::Music),
            "other" => Ok(Self::Other),
            _ => Err(format!("Invalid media type: {}", s)),
        }
    }
}

/// Writing script of a normalized slug. CJK slugs bypass word tokenization
/// and use bigram counting for their word-count metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Script {
    Latin,
    Cyrillic,
    Greek,
    Arabic,
    Cjk,
    Other,
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latin => write!(f, "latin"),
            Self::Cyrillic => write!(f, "cyrillic"),
            Self::Greek => write!(f, "greek"),
            Self::Arabic => write!(f, "arabic"),
            Self::Cjk => write!(f, "cjk"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Operator attached to a single tag filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TagOp {
    /// Media must own the tag. The default when the wire omits the op.
    #[default]
    And,
    /// Media must not own the tag.
    Not,
    /// Media must own at least one of the OR-grouped tags.
    Or,
}

impl fmt::Display for TagOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Not => write!(f, "NOT"),
            Self::Or => write!(f, "OR"),
        }
    }
}

/// A single structured tag predicate, e.g. `region=usa` with op AND.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFilter {
    /// Tag type name, e.g. "region", "genre", "year".
    #[serde(rename = "type")]
    pub tag_type: String,
    /// Tag value, e.g. "usa".
    pub value: String,
    /// Combining operator. Absent on the wire means AND.
    #[serde(default)]
    pub op: TagOp,
}

impl TagFilter {
    /// Convenience constructor with the default AND operator.
    pub fn new<T: Into<String>, V: Into<String>>(tag_type: T, value: V) -> Self {
        Self {
            tag_type: tag_type.into(),
            value: value.into(),
            op: TagOp::And,
        }
    }

    /// Convenience constructor with an explicit operator.
    pub fn with_op<T: Into<String>, V: Into<String>>(tag_type: T, value: V, op: TagOp) -> Self {
        Self {
            tag_type: tag_type.into(),
            value: value.into(),
            op,
        }
    }
}

/// Persisted status of the background optimization lifecycle.
///
/// Stored in DBConfig; the empty string maps to `Unset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationStatus {
    #[default]
    Unset,
    Pending,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for OptimizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, ""),
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for OptimizationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(Self::Unset),
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid optimization status: {}", s)),
        }
    }
}

/// One step of the optimization sequence. The persisted checkpoint uses the
/// step name; a cleared checkpoint is the empty string (`None` in code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationStep {
    Indexes,
    Analyze,
    Vacuum,
}

impl fmt::Display for OptimizationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Indexes => write!(f, "indexes"),
            Self::Analyze => write!(f, "analyze"),
            Self::Vacuum => write!(f, "vacuum"),
        }
    }
}

impl std::str::FromStr for OptimizationStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "indexes" => Ok(Self::Indexes),
            "analyze" => Ok(Self::Analyze),
            "vacuum" => Ok(Self::Vacuum),
            _ => Err(format!("Invalid optimization step: {}", s)),
        }
    }
}

/// Persisted status of an indexing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexingStatus {
    Running,
    Completed,
    Failed,
}

impl fmt::Display for IndexingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for IndexingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid indexing status: {}", s)),
        }
    }
}
