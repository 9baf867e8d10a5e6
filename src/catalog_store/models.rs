//! Catalog row models.
//!
//! These mirror the persisted rows. Composite read shapes live in `views`,
//! write payloads in `drafts`.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EntityKind {
    Artist,
    Song,
    Album,
}

impl EntityKind {
    pub fn not_found_message(&self) -> &'static str {
        match self {
            EntityKind::Artist => "Artist with this id was not found.",
            EntityKind::Song => "Song with this id was not found.",
            EntityKind::Album => "Album with this id was not found.",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Artist => write!(f, "artist"),
            EntityKind::Song => write!(f, "song"),
            EntityKind::Album => write!(f, "album"),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: i64,
    pub title: String,
}

/// An album row as stored, with the artist as a bare id.
///
/// This is also the body returned by album create and update.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AlbumRecord {
    pub id: i64,
    pub title: String,
    pub release_year: i32,
    pub artist: i64,
}
