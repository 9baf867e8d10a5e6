//! SQLite-backed catalog store implementation.
//!
//! Reads go through a small pool of read-only connections, writes through a
//! single connection, each write inside one `BEGIN IMMEDIATE` transaction.

use super::drafts::{AlbumDraft, ArtistDraft, SongDraft, TrackDraft, WriteMode};
use super::error::{CatalogError, CatalogResult};
use super::models::{AlbumRecord, Artist, EntityKind, Song};
use super::query::{order_clause, AlbumQuery, ArtistQuery, Filters, Listing, SongQuery, Window};
use super::schema::CATALOG_VERSIONED_SCHEMAS;
use super::trait_def::CatalogStore;
use super::validation::{
    validate_album, validate_artist, validate_song, validate_track_additions, CatalogLookup,
    ValidatedTrack,
};
use super::views::{compose_albums, compose_artists, AlbumView, ArtistView, TrackRow};
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{bail, Context, Result};
use chrono::Datelike;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct SqliteCatalogStore {
    read_pool: Vec<Arc<Mutex<Connection>>>,
    write_conn: Arc<Mutex<Connection>>,
    read_index: Arc<AtomicUsize>,
}

fn migrate_if_needed(conn: &mut Connection) -> Result<()> {
    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;

    let latest_version = CATALOG_VERSIONED_SCHEMAS.len() - 1;
    let latest_schema = &CATALOG_VERSIONED_SCHEMAS[latest_version];

    let table_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
            [],
            |r| r.get(0),
        )
        .unwrap_or(0);

    if table_count == 0 {
        info!("Creating catalog db schema at version {}", latest_version);
        latest_schema.create(conn)?;
        return Ok(());
    }

    if db_version < BASE_DB_VERSION as i64 {
        bail!(
            "Database has user_version {} and was not created by the catalog server",
            db_version
        );
    }
    let mut current_version = (db_version - BASE_DB_VERSION as i64) as usize;
    if current_version > latest_version {
        bail!(
            "Catalog db version {} is newer than the latest known version {}",
            current_version,
            latest_version
        );
    }

    if current_version < latest_version {
        let tx = conn.transaction()?;
        for schema in CATALOG_VERSIONED_SCHEMAS.iter().skip(current_version + 1) {
            if let Some(migration_fn) = schema.migration {
                info!(
                    "Migrating catalog db from version {} to {}",
                    current_version, schema.version
                );
                migration_fn(&tx)?;
            }
            current_version = schema.version;
        }
        tx.pragma_update(None, "user_version", BASE_DB_VERSION + current_version)?;
        tx.commit()?;
    }

    latest_schema
        .validate(conn)
        .context("Catalog db schema does not match the expected schema")
}

/// `?n, ?n+1, ...` placeholders for an `IN (...)` list starting after `offset`
/// already bound parameters.
fn placeholders(count: usize, offset: usize) -> String {
    (1..=count)
        .map(|i| format!("?{}", i + offset))
        .collect::<Vec<_>>()
        .join(", ")
}

fn current_year() -> i32 {
    chrono::Local::now().year()
}

/// Validation lookups answered from the connection of the running transaction.
struct ConnLookup<'a>(&'a Connection);

impl CatalogLookup for ConnLookup<'_> {
    fn find_artist(&self, id: i64) -> CatalogResult<Option<Artist>> {
        SqliteCatalogStore::fetch_artist(self.0, id)
    }

    fn find_song(&self, id: i64) -> CatalogResult<Option<Song>> {
        SqliteCatalogStore::fetch_song(self.0, id)
    }

    fn artist_name_taken(&self, name: &str, exclude_id: Option<i64>) -> CatalogResult<bool> {
        Ok(self.0.query_row(
            "SELECT EXISTS(SELECT 1 FROM artists WHERE name = ?1 AND id IS NOT ?2)",
            params![name, exclude_id],
            |r| r.get(0),
        )?)
    }

    fn album_title_taken(
        &self,
        title: &str,
        artist_id: i64,
        exclude_id: Option<i64>,
    ) -> CatalogResult<bool> {
        Ok(self.0.query_row(
            "SELECT EXISTS(SELECT 1 FROM albums WHERE title = ?1 AND artist_id = ?2 AND id IS NOT ?3)",
            params![title, artist_id, exclude_id],
            |r| r.get(0),
        )?)
    }

    fn album_track_numbers(&self, album_id: i64) -> CatalogResult<HashSet<u32>> {
        let mut stmt = self
            .0
            .prepare_cached("SELECT track_number FROM album_songs WHERE album_id = ?1")?;
        let numbers = stmt
            .query_map(params![album_id], |r| r.get(0))?
            .collect::<rusqlite::Result<HashSet<u32>>>()?;
        Ok(numbers)
    }
}

impl SqliteCatalogStore {
    /// Open (or create) the catalog database at `db_path`.
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    /// * `read_pool_size` - Number of connections for concurrent read operations
    pub fn new<P: AsRef<Path>>(db_path: P, read_pool_size: usize) -> Result<Self> {
        let db_path_ref = db_path.as_ref();
        if read_pool_size == 0 {
            bail!("Read pool size must be at least 1");
        }

        let mut write_conn = Connection::open_with_flags(
            db_path_ref,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open catalog database {:?}", db_path_ref))?;

        write_conn.pragma_update(None, "foreign_keys", "ON")?;
        migrate_if_needed(&mut write_conn)?;
        write_conn.pragma_update(None, "journal_mode", "WAL")?;

        let mut read_pool = Vec::with_capacity(read_pool_size);
        for _ in 0..read_pool_size {
            let read_conn = Connection::open_with_flags(
                db_path_ref,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            read_conn.pragma_update(None, "foreign_keys", "ON")?;
            read_pool.push(Arc::new(Mutex::new(read_conn)));
        }

        let store = SqliteCatalogStore {
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_pool,
            read_index: Arc::new(AtomicUsize::new(0)),
        };

        info!(
            "Opened music catalog: {} artists, {} songs, {} albums",
            store.get_artists_count(),
            store.get_songs_count(),
            store.get_albums_count()
        );

        Ok(store)
    }

    fn get_read_conn(&self) -> Arc<Mutex<Connection>> {
        let index = self.read_index.fetch_add(1, Ordering::SeqCst) % self.read_pool.len();
        self.read_pool[index].clone()
    }

    /// Run `f` with a read connection inside a deferred transaction, so that
    /// multi-query reads observe one snapshot.
    fn with_read<T>(&self, f: impl FnOnce(&Connection) -> CatalogResult<T>) -> CatalogResult<T> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().map_err(|_| CatalogError::lock_poisoned())?;
        let tx = conn.unchecked_transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    fn with_write_transaction<T>(
        &self,
        f: impl FnOnce(&Connection) -> CatalogResult<T>,
    ) -> CatalogResult<T> {
        let conn = self
            .write_conn
            .lock()
            .map_err(|_| CatalogError::lock_poisoned())?;
        conn.execute("BEGIN IMMEDIATE", [])?;

        match f(&conn) {
            Ok(value) => {
                if let Err(e) = conn.execute("COMMIT", []) {
                    let _ = conn.execute("ROLLBACK", []);
                    return Err(e.into());
                }
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = conn.execute("ROLLBACK", []) {
                    warn!("Failed to roll back catalog write: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    fn count(&self, table: &str) -> usize {
        let Ok(conn) = self.write_conn.lock() else {
            return 0;
        };
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| {
            r.get::<_, i64>(0)
        })
        .map(|c| c as usize)
        .unwrap_or(0)
    }

    // =========================================================================
    // Row helpers
    // =========================================================================

    fn fetch_artist(conn: &Connection, id: i64) -> CatalogResult<Option<Artist>> {
        Ok(conn
            .query_row(
                "SELECT id, name FROM artists WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Artist {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    fn fetch_song(conn: &Connection, id: i64) -> CatalogResult<Option<Song>> {
        Ok(conn
            .query_row(
                "SELECT id, title FROM songs WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Song {
                        id: row.get(0)?,
                        title: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    fn parse_album_row(row: &rusqlite::Row) -> rusqlite::Result<AlbumRecord> {
        Ok(AlbumRecord {
            id: row.get(0)?,
            title: row.get(1)?,
            release_year: row.get(2)?,
            artist: row.get(3)?,
        })
    }

    fn fetch_album(conn: &Connection, id: i64) -> CatalogResult<Option<AlbumRecord>> {
        Ok(conn
            .query_row(
                "SELECT id, title, release_year, artist_id FROM albums WHERE id = ?1",
                params![id],
                Self::parse_album_row,
            )
            .optional()?)
    }

    fn count_rows(conn: &Connection, table: &str, filters: &Filters) -> CatalogResult<usize> {
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {} {}", table, filters.where_clause()),
            params_from_iter(filters.params.iter()),
            |r| r.get(0),
        )?;
        Ok(count as usize)
    }

    /// Run a listing query: `select` is the column list of `table`, filtered,
    /// ordered and windowed.
    fn query_window<T>(
        conn: &Connection,
        table: &str,
        select: &str,
        filters: &Filters,
        order_by: &str,
        window: Window,
        parse: impl FnMut(&rusqlite::Row) -> rusqlite::Result<T>,
    ) -> CatalogResult<Vec<T>> {
        let n = filters.params.len();
        let sql = format!(
            "SELECT {} FROM {} {} ORDER BY {} LIMIT ?{} OFFSET ?{}",
            select,
            table,
            filters.where_clause(),
            order_by,
            n + 1,
            n + 2
        );
        let (limit, offset) = window.sql_params();
        let mut params = filters.params.clone();
        params.push(Value::Integer(limit));
        params.push(Value::Integer(offset));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), parse)?
            .collect::<rusqlite::Result<Vec<T>>>()?;
        Ok(rows)
    }

    fn fetch_artists_by_ids(conn: &Connection, ids: &[i64]) -> CatalogResult<HashMap<i64, Artist>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut stmt = conn.prepare(&format!(
            "SELECT id, name FROM artists WHERE id IN ({})",
            placeholders(ids.len(), 0)
        ))?;
        let artists = stmt
            .query_map(params_from_iter(ids.iter()), |row| {
                Ok(Artist {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .map(|r| r.map(|a| (a.id, a)))
            .collect::<rusqlite::Result<HashMap<i64, Artist>>>()?;
        Ok(artists)
    }

    fn fetch_albums_of_artists(conn: &Connection, artist_ids: &[i64]) -> CatalogResult<Vec<AlbumRecord>> {
        if artist_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut stmt = conn.prepare(&format!(
            "SELECT id, title, release_year, artist_id FROM albums WHERE artist_id IN ({}) ORDER BY id",
            placeholders(artist_ids.len(), 0)
        ))?;
        let albums = stmt
            .query_map(params_from_iter(artist_ids.iter()), Self::parse_album_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(albums)
    }

    fn fetch_tracks(conn: &Connection, album_ids: &[i64]) -> CatalogResult<Vec<TrackRow>> {
        if album_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut stmt = conn.prepare(&format!(
            "SELECT album_songs.album_id, album_songs.track_number, songs.id, songs.title
             FROM album_songs JOIN songs ON songs.id = album_songs.song_id
             WHERE album_songs.album_id IN ({})
             ORDER BY album_songs.album_id, album_songs.track_number",
            placeholders(album_ids.len(), 0)
        ))?;
        let tracks = stmt
            .query_map(params_from_iter(album_ids.iter()), |row| {
                Ok(TrackRow {
                    album_id: row.get(0)?,
                    track_number: row.get(1)?,
                    song: Song {
                        id: row.get(2)?,
                        title: row.get(3)?,
                    },
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tracks)
    }

    /// Compose album views. `artists` may already hold the referenced artists.
    fn album_views(
        conn: &Connection,
        albums: Vec<AlbumRecord>,
        artists: Option<HashMap<i64, Artist>>,
    ) -> CatalogResult<Vec<AlbumView>> {
        let artists = match artists {
            Some(artists) => artists,
            None => {
                let mut ids: Vec<i64> = albums.iter().map(|a| a.artist).collect();
                ids.sort_unstable();
                ids.dedup();
                Self::fetch_artists_by_ids(conn, &ids)?
            }
        };
        let album_ids: Vec<i64> = albums.iter().map(|a| a.id).collect();
        let tracks = Self::fetch_tracks(conn, &album_ids)?;
        Ok(compose_albums(albums, &artists, tracks)?)
    }

    fn artist_views(conn: &Connection, artists: Vec<Artist>) -> CatalogResult<Vec<ArtistView>> {
        let ids: Vec<i64> = artists.iter().map(|a| a.id).collect();
        let by_id: HashMap<i64, Artist> = artists.iter().map(|a| (a.id, a.clone())).collect();
        let albums = Self::fetch_albums_of_artists(conn, &ids)?;
        let albums = Self::album_views(conn, albums, Some(by_id))?;
        Ok(compose_artists(artists, albums))
    }

    fn insert_tracks(conn: &Connection, album_id: i64, tracks: &[ValidatedTrack]) -> CatalogResult<()> {
        let mut stmt = conn.prepare_cached(
            "INSERT INTO album_songs (album_id, song_id, track_number) VALUES (?1, ?2, ?3)",
        )?;
        for track in tracks {
            stmt.execute(params![album_id, track.song.id, track.track_number])?;
        }
        Ok(())
    }

    fn delete_row(&self, table: &str, id: i64, kind: EntityKind) -> CatalogResult<()> {
        self.with_write_transaction(|conn| {
            let deleted = conn.execute(&format!("DELETE FROM {} WHERE id = ?1", table), params![id])?;
            if deleted == 0 {
                return Err(CatalogError::NotFound(kind));
            }
            debug!("Deleted {} {}", kind, id);
            Ok(())
        })
    }
}

impl CatalogStore for SqliteCatalogStore {
    // =========================================================================
    // Artists
    // =========================================================================

    fn list_artists(&self, query: &ArtistQuery) -> CatalogResult<Listing<ArtistView>> {
        self.with_read(|conn| {
            let filters = query.filters();
            let count = Self::count_rows(conn, "artists", &filters)?;
            let artists = Self::query_window(
                conn,
                "artists",
                "id, name",
                &filters,
                &order_clause(&query.ordering, "artists"),
                query.window,
                |row| {
                    Ok(Artist {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )?;
            Ok(Listing {
                count,
                items: Self::artist_views(conn, artists)?,
            })
        })
    }

    fn get_artist(&self, id: i64) -> CatalogResult<ArtistView> {
        self.with_read(|conn| {
            let artist =
                Self::fetch_artist(conn, id)?.ok_or(CatalogError::NotFound(EntityKind::Artist))?;
            let mut views = Self::artist_views(conn, vec![artist])?;
            views
                .pop()
                .ok_or(CatalogError::NotFound(EntityKind::Artist))
        })
    }

    fn create_artist(&self, draft: &ArtistDraft) -> CatalogResult<Artist> {
        self.with_write_transaction(|conn| {
            let valid = validate_artist(draft, WriteMode::Create, None, &ConnLookup(conn))?;
            conn.execute("INSERT INTO artists (name) VALUES (?1)", params![&valid.name])?;
            let id = conn.last_insert_rowid();
            debug!("Created artist {} ({})", id, valid.name);
            Ok(Artist {
                id,
                name: valid.name,
            })
        })
    }

    fn update_artist(
        &self,
        id: i64,
        draft: &ArtistDraft,
        mode: WriteMode,
    ) -> CatalogResult<Artist> {
        self.with_write_transaction(|conn| {
            let existing =
                Self::fetch_artist(conn, id)?.ok_or(CatalogError::NotFound(EntityKind::Artist))?;
            let valid = validate_artist(draft, mode, Some(&existing), &ConnLookup(conn))?;
            conn.execute(
                "UPDATE artists SET name = ?1 WHERE id = ?2",
                params![&valid.name, id],
            )?;
            Ok(Artist {
                id,
                name: valid.name,
            })
        })
    }

    fn delete_artist(&self, id: i64) -> CatalogResult<()> {
        self.delete_row("artists", id, EntityKind::Artist)
    }

    // =========================================================================
    // Songs
    // =========================================================================

    fn list_songs(&self, query: &SongQuery) -> CatalogResult<Listing<Song>> {
        self.with_read(|conn| {
            let filters = query.filters();
            let count = Self::count_rows(conn, "songs", &filters)?;
            let items = Self::query_window(
                conn,
                "songs",
                "id, title",
                &filters,
                &order_clause(&query.ordering, "songs"),
                query.window,
                |row| {
                    Ok(Song {
                        id: row.get(0)?,
                        title: row.get(1)?,
                    })
                },
            )?;
            Ok(Listing { count, items })
        })
    }

    fn get_song(&self, id: i64) -> CatalogResult<Song> {
        self.with_read(|conn| {
            Self::fetch_song(conn, id)?.ok_or(CatalogError::NotFound(EntityKind::Song))
        })
    }

    fn create_song(&self, draft: &SongDraft) -> CatalogResult<Song> {
        self.with_write_transaction(|conn| {
            let valid = validate_song(draft, WriteMode::Create, None)?;
            conn.execute("INSERT INTO songs (title) VALUES (?1)", params![&valid.title])?;
            Ok(Song {
                id: conn.last_insert_rowid(),
                title: valid.title,
            })
        })
    }

    fn update_song(&self, id: i64, draft: &SongDraft, mode: WriteMode) -> CatalogResult<Song> {
        self.with_write_transaction(|conn| {
            let existing =
                Self::fetch_song(conn, id)?.ok_or(CatalogError::NotFound(EntityKind::Song))?;
            let valid = validate_song(draft, mode, Some(&existing))?;
            conn.execute(
                "UPDATE songs SET title = ?1 WHERE id = ?2",
                params![&valid.title, id],
            )?;
            Ok(Song {
                id,
                title: valid.title,
            })
        })
    }

    fn delete_song(&self, id: i64) -> CatalogResult<()> {
        self.delete_row("songs", id, EntityKind::Song)
    }

    // =========================================================================
    // Albums
    // =========================================================================

    fn list_albums(&self, query: &AlbumQuery) -> CatalogResult<Listing<AlbumView>> {
        self.with_read(|conn| {
            let filters = query.filters();
            let count = Self::count_rows(conn, "albums", &filters)?;
            let albums = Self::query_window(
                conn,
                "albums",
                "id, title, release_year, artist_id",
                &filters,
                &order_clause(&query.ordering, "albums"),
                query.window,
                Self::parse_album_row,
            )?;
            Ok(Listing {
                count,
                items: Self::album_views(conn, albums, None)?,
            })
        })
    }

    fn get_album(&self, id: i64) -> CatalogResult<AlbumView> {
        self.with_read(|conn| {
            let album =
                Self::fetch_album(conn, id)?.ok_or(CatalogError::NotFound(EntityKind::Album))?;
            Self::album_views(conn, vec![album], None)?
                .pop()
                .ok_or(CatalogError::NotFound(EntityKind::Album))
        })
    }

    fn create_album(&self, draft: &AlbumDraft) -> CatalogResult<AlbumRecord> {
        self.with_write_transaction(|conn| {
            let valid = validate_album(
                draft,
                WriteMode::Create,
                None,
                &ConnLookup(conn),
                current_year(),
            )?;
            conn.execute(
                "INSERT INTO albums (title, release_year, artist_id) VALUES (?1, ?2, ?3)",
                params![&valid.title, valid.release_year, valid.artist.id],
            )?;
            let id = conn.last_insert_rowid();
            let tracks = valid.tracks.unwrap_or_default();
            Self::insert_tracks(conn, id, &tracks)?;
            debug!("Created album {} with {} tracks", id, tracks.len());
            Ok(AlbumRecord {
                id,
                title: valid.title,
                release_year: valid.release_year,
                artist: valid.artist.id,
            })
        })
    }

    fn update_album(
        &self,
        id: i64,
        draft: &AlbumDraft,
        mode: WriteMode,
    ) -> CatalogResult<AlbumRecord> {
        self.with_write_transaction(|conn| {
            let existing =
                Self::fetch_album(conn, id)?.ok_or(CatalogError::NotFound(EntityKind::Album))?;
            let valid = validate_album(
                draft,
                mode,
                Some(&existing),
                &ConnLookup(conn),
                current_year(),
            )?;
            conn.execute(
                "UPDATE albums SET title = ?1, release_year = ?2, artist_id = ?3 WHERE id = ?4",
                params![&valid.title, valid.release_year, valid.artist.id, id],
            )?;
            if let Some(tracks) = &valid.tracks {
                conn.execute("DELETE FROM album_songs WHERE album_id = ?1", params![id])?;
                Self::insert_tracks(conn, id, tracks)?;
                debug!("Replaced track listing of album {} ({} tracks)", id, tracks.len());
            }
            Ok(AlbumRecord {
                id,
                title: valid.title,
                release_year: valid.release_year,
                artist: valid.artist.id,
            })
        })
    }

    fn add_album_tracks(&self, id: i64, tracks: &[TrackDraft]) -> CatalogResult<AlbumView> {
        self.with_write_transaction(|conn| {
            let album =
                Self::fetch_album(conn, id)?.ok_or(CatalogError::NotFound(EntityKind::Album))?;
            let valid = validate_track_additions(id, tracks, &ConnLookup(conn))?;
            Self::insert_tracks(conn, id, &valid)?;
            Self::album_views(conn, vec![album], None)?
                .pop()
                .ok_or(CatalogError::NotFound(EntityKind::Album))
        })
    }

    fn delete_album(&self, id: i64) -> CatalogResult<()> {
        self.delete_row("albums", id, EntityKind::Album)
    }

    // =========================================================================
    // Counts
    // =========================================================================

    fn get_artists_count(&self) -> usize {
        self.count("artists")
    }

    fn get_songs_count(&self) -> usize {
        self.count("songs")
    }

    fn get_albums_count(&self) -> usize {
        self.count("albums")
    }

    fn get_album_songs_count(&self) -> usize {
        self.count("album_songs")
    }
}
