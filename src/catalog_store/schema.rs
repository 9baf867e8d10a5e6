//! SQLite schema definitions for the music catalog database.
//!
//! Value ranges, uniqueness and cascade deletes are declared here so that they
//! hold for every writer, including the ones that skip validation.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
};

pub const ARTIST_NAME_MAX_LEN: usize = 55;
pub const SONG_TITLE_MAX_LEN: usize = 125;
pub const ALBUM_TITLE_MAX_LEN: usize = 128;
pub const MIN_RELEASE_YEAR: i32 = 1900;
pub const MIN_TRACK_NUMBER: i64 = 1;
pub const MAX_TRACK_NUMBER: i64 = 2048;

const ARTIST_FK: ForeignKey = ForeignKey {
    foreign_table: "artists",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const ALBUM_FK: ForeignKey = ForeignKey {
    foreign_table: "albums",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const SONG_FK: ForeignKey = ForeignKey {
    foreign_table: "songs",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const ARTISTS_TABLE: Table = Table {
    name: "artists",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "name",
            &SqlType::Text,
            non_null = true,
            check = Some("length(name) BETWEEN 1 AND 55")
        ),
    ],
    indices: &[],
    unique_constraints: &[&["name"]],
};

const SONGS_TABLE: Table = Table {
    name: "songs",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "title",
            &SqlType::Text,
            non_null = true,
            check = Some("length(title) BETWEEN 1 AND 125")
        ),
    ],
    indices: &[("idx_songs_title", "title")],
    unique_constraints: &[],
};

/// The upper release year bound moves with the clock, so only the floor is
/// enforced by storage.
const ALBUMS_TABLE: Table = Table {
    name: "albums",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "title",
            &SqlType::Text,
            non_null = true,
            check = Some("length(title) BETWEEN 1 AND 128")
        ),
        sqlite_column!(
            "release_year",
            &SqlType::Integer,
            non_null = true,
            check = Some("release_year >= 1900")
        ),
        sqlite_column!(
            "artist_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ARTIST_FK)
        ),
    ],
    indices: &[
        ("idx_albums_artist", "artist_id"),
        ("idx_albums_release_year", "release_year"),
    ],
    unique_constraints: &[&["title", "artist_id"]],
};

/// Join table holding the ordered track listing of each album.
const ALBUM_SONGS_TABLE: Table = Table {
    name: "album_songs",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "album_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ALBUM_FK)
        ),
        sqlite_column!(
            "song_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&SONG_FK)
        ),
        sqlite_column!(
            "track_number",
            &SqlType::Integer,
            non_null = true,
            check = Some("track_number BETWEEN 1 AND 2048")
        ),
    ],
    indices: &[("idx_album_songs_song", "song_id")],
    unique_constraints: &[&["album_id", "track_number"]],
};

pub const CATALOG_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[ARTISTS_TABLE, SONGS_TABLE, ALBUMS_TABLE, ALBUM_SONGS_TABLE],
    migration: None,
}];
