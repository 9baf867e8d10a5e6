//! CatalogStore trait definition.
//!
//! Handlers only see this trait, so routes can be tested against any backend.

use super::drafts::{AlbumDraft, ArtistDraft, SongDraft, TrackDraft, WriteMode};
use super::error::CatalogResult;
use super::models::{AlbumRecord, Artist, Song};
use super::query::{AlbumQuery, ArtistQuery, Listing, SongQuery};
use super::views::{AlbumView, ArtistView};

/// Trait for catalog storage backends.
///
/// Writes validate their draft inside the same transaction that persists it.
/// `update_*` honours `WriteMode::Replace` and `WriteMode::Patch`.
pub trait CatalogStore: Send + Sync {
    // =========================================================================
    // Artists
    // =========================================================================

    fn list_artists(&self, query: &ArtistQuery) -> CatalogResult<Listing<ArtistView>>;

    fn get_artist(&self, id: i64) -> CatalogResult<ArtistView>;

    fn create_artist(&self, draft: &ArtistDraft) -> CatalogResult<Artist>;

    fn update_artist(&self, id: i64, draft: &ArtistDraft, mode: WriteMode)
        -> CatalogResult<Artist>;

    /// Delete an artist together with its albums and their track listings.
    fn delete_artist(&self, id: i64) -> CatalogResult<()>;

    // =========================================================================
    // Songs
    // =========================================================================

    fn list_songs(&self, query: &SongQuery) -> CatalogResult<Listing<Song>>;

    fn get_song(&self, id: i64) -> CatalogResult<Song>;

    fn create_song(&self, draft: &SongDraft) -> CatalogResult<Song>;

    fn update_song(&self, id: i64, draft: &SongDraft, mode: WriteMode) -> CatalogResult<Song>;

    fn delete_song(&self, id: i64) -> CatalogResult<()>;

    // =========================================================================
    // Albums
    // =========================================================================

    fn list_albums(&self, query: &AlbumQuery) -> CatalogResult<Listing<AlbumView>>;

    fn get_album(&self, id: i64) -> CatalogResult<AlbumView>;

    /// Create an album and its whole track listing atomically.
    fn create_album(&self, draft: &AlbumDraft) -> CatalogResult<AlbumRecord>;

    /// Update an album. A draft carrying `songs` replaces the track listing.
    fn update_album(
        &self,
        id: i64,
        draft: &AlbumDraft,
        mode: WriteMode,
    ) -> CatalogResult<AlbumRecord>;

    /// Append tracks to an existing listing. Track numbers may not collide
    /// with each other or with the stored ones.
    fn add_album_tracks(&self, id: i64, tracks: &[TrackDraft]) -> CatalogResult<AlbumView>;

    fn delete_album(&self, id: i64) -> CatalogResult<()>;

    // =========================================================================
    // Counts
    // =========================================================================

    fn get_artists_count(&self) -> usize;

    fn get_songs_count(&self) -> usize;

    fn get_albums_count(&self) -> usize;

    /// Number of track entries across all albums.
    fn get_album_songs_count(&self) -> usize;
}
