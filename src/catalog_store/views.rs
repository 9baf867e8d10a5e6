//! Read shapes returned by list and retrieve, composed from batched row fetches.

use super::models::{AlbumRecord, Artist, Song};
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TrackView {
    pub song: Song,
    pub track_number: u32,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct AlbumView {
    pub id: i64,
    pub title: String,
    pub release_year: i32,
    pub artist: Artist,
    pub songs: Vec<TrackView>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ArtistView {
    pub id: i64,
    pub name: String,
    pub albums: Vec<AlbumView>,
}

/// A track listing row joined with its song.
#[derive(Clone, Debug)]
pub struct TrackRow {
    pub album_id: i64,
    pub track_number: u32,
    pub song: Song,
}

/// Which body an operation responds with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResponseShape {
    /// Nested read view (`ArtistView`, `AlbumView`, `Song`).
    View,
    /// Flat write record (`Artist`, `AlbumRecord`, `Song`).
    Record,
    Empty,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CatalogAction {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Destroy,
}

impl CatalogAction {
    pub fn shape(&self) -> ResponseShape {
        match self {
            CatalogAction::List | CatalogAction::Retrieve => ResponseShape::View,
            CatalogAction::Create | CatalogAction::Update | CatalogAction::PartialUpdate => {
                ResponseShape::Record
            }
            CatalogAction::Destroy => ResponseShape::Empty,
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, CatalogAction::List | CatalogAction::Retrieve)
    }
}

impl fmt::Display for CatalogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CatalogAction::List => "list",
            CatalogAction::Retrieve => "retrieve",
            CatalogAction::Create => "create",
            CatalogAction::Update => "update",
            CatalogAction::PartialUpdate => "partial_update",
            CatalogAction::Destroy => "destroy",
        };
        write!(f, "{}", label)
    }
}

/// Build album views, keeping the order of `albums`. Tracks are sorted by
/// ascending track number.
pub fn compose_albums(
    albums: Vec<AlbumRecord>,
    artists: &HashMap<i64, Artist>,
    tracks: Vec<TrackRow>,
) -> Result<Vec<AlbumView>> {
    let mut tracks_by_album: HashMap<i64, Vec<TrackView>> = HashMap::new();
    for row in tracks {
        tracks_by_album
            .entry(row.album_id)
            .or_default()
            .push(TrackView {
                song: row.song,
                track_number: row.track_number,
            });
    }

    albums
        .into_iter()
        .map(|album| {
            let artist = artists
                .get(&album.artist)
                .cloned()
                .ok_or_else(|| anyhow!("album {} references missing artist {}", album.id, album.artist))?;
            let mut songs = tracks_by_album.remove(&album.id).unwrap_or_default();
            songs.sort_by_key(|t| t.track_number);
            Ok(AlbumView {
                id: album.id,
                title: album.title,
                release_year: album.release_year,
                artist,
                songs,
            })
        })
        .collect()
}

/// Attach album views to their artists, keeping the order of both inputs.
pub fn compose_artists(artists: Vec<Artist>, albums: Vec<AlbumView>) -> Vec<ArtistView> {
    let mut albums_by_artist: HashMap<i64, Vec<AlbumView>> = HashMap::new();
    for album in albums {
        albums_by_artist
            .entry(album.artist.id)
            .or_default()
            .push(album);
    }

    artists
        .into_iter()
        .map(|artist| ArtistView {
            albums: albums_by_artist.remove(&artist.id).unwrap_or_default(),
            id: artist.id,
            name: artist.name,
        })
        .collect()
}
