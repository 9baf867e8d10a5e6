//! Test fixture creation
//!
//! Builds the small catalog every end-to-end test starts from. Rows are
//! written through the store so they pass the same validation as API writes.

use super::constants::*;
use anyhow::Result;
use music_catalog_server::catalog_store::{
    AlbumDraft, ArtistDraft, CatalogStore, Field, SongDraft, SqliteCatalogStore, TrackDraft,
};
use std::path::PathBuf;
use tempfile::TempDir;

fn album(title: &str, year: i64, artist: i64, tracks: &[(i64, i64)]) -> AlbumDraft {
    AlbumDraft {
        title: title.to_string().into(),
        release_year: year.into(),
        artist: artist.into(),
        songs: Field::Present(
            tracks
                .iter()
                .map(|&(song, number)| TrackDraft::new(song, number))
                .collect(),
        ),
    }
}

/// Creates a catalog database in a fresh temp dir.
///
/// Returns the dir, which must outlive the server, and the database path.
pub fn create_test_catalog() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("catalog.db");
    let store = SqliteCatalogStore::new(&db_path, 1)?;

    for name in [ARTIST_1_NAME, ARTIST_2_NAME, ARTIST_3_NAME] {
        store.create_artist(&ArtistDraft {
            name: name.to_string().into(),
        })?;
    }
    for title in [
        SONG_1_TITLE,
        SONG_2_TITLE,
        SONG_3_TITLE,
        SONG_4_TITLE,
        SONG_5_TITLE,
    ] {
        store.create_song(&SongDraft {
            title: title.to_string().into(),
        })?;
    }

    // Listed out of order on purpose, reads sort by track number.
    store.create_album(&album(
        ALBUM_1_TITLE,
        ALBUM_1_YEAR,
        ARTIST_1_ID,
        &[(SONG_3_ID, 3), (SONG_1_ID, 1), (SONG_2_ID, 2)],
    ))?;
    store.create_album(&album(
        ALBUM_2_TITLE,
        ALBUM_2_YEAR,
        ARTIST_2_ID,
        &[(SONG_4_ID, 1), (SONG_5_ID, 2)],
    ))?;
    store.create_album(&album(
        ALBUM_3_TITLE,
        ALBUM_3_YEAR,
        ARTIST_1_ID,
        &[(SONG_2_ID, 1)],
    ))?;

    Ok((dir, db_path))
}
