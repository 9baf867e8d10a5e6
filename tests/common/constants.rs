//! Shared constants for end-to-end tests
//!
//! Ids are assigned by insertion order in a fresh database, see `fixtures`.
//! When the fixture catalog changes, update only this file.
#![allow(dead_code)]

// ============================================================================
// Test Catalog
// ============================================================================

/// Artist ID for "The Test Band"
pub const ARTIST_1_ID: i64 = 1;
pub const ARTIST_1_NAME: &str = "The Test Band";

/// Artist ID for "Jazz Ensemble"
pub const ARTIST_2_ID: i64 = 2;
pub const ARTIST_2_NAME: &str = "Jazz Ensemble";

/// Artist ID for "Solo Act", who has no albums
pub const ARTIST_3_ID: i64 = 3;
pub const ARTIST_3_NAME: &str = "Solo Act";

pub const SONG_1_ID: i64 = 1;
pub const SONG_1_TITLE: &str = "Opening Track";
pub const SONG_2_ID: i64 = 2;
pub const SONG_2_TITLE: &str = "Second Song";
pub const SONG_3_ID: i64 = 3;
pub const SONG_3_TITLE: &str = "Closing Time";
pub const SONG_4_ID: i64 = 4;
pub const SONG_4_TITLE: &str = "Jazz Intro";
pub const SONG_5_ID: i64 = 5;
pub const SONG_5_TITLE: &str = "Blue Notes";

/// "First Album" by The Test Band: songs 1, 2, 3 as tracks 1, 2, 3
pub const ALBUM_1_ID: i64 = 1;
pub const ALBUM_1_TITLE: &str = "First Album";
pub const ALBUM_1_YEAR: i64 = 2001;

/// "Jazz Collection" by Jazz Ensemble: songs 4, 5 as tracks 1, 2
pub const ALBUM_2_ID: i64 = 2;
pub const ALBUM_2_TITLE: &str = "Jazz Collection";
pub const ALBUM_2_YEAR: i64 = 1998;

/// "Second Album" by The Test Band: song 2 as track 1
pub const ALBUM_3_ID: i64 = 3;
pub const ALBUM_3_TITLE: &str = "Second Album";
pub const ALBUM_3_YEAR: i64 = 2004;

pub const ARTISTS_COUNT: u64 = 3;
pub const SONGS_COUNT: u64 = 5;
pub const ALBUMS_COUNT: u64 = 3;

/// A path id no fixture row uses
pub const MISSING_ID: i64 = 999;

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for the server to answer on `/`
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Delay between readiness checks
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
