//! Catalog Seed Tool
//!
//! Fills a catalog database with generated artists, songs and albums. Every
//! row goes through the regular store API, so it is validated exactly like
//! rows created over HTTP.

use anyhow::{bail, Result};
use chrono::Datelike;
use clap::Parser;
use music_catalog_server::catalog_store::{
    AlbumDraft, Artist, ArtistDraft, CatalogError, Field, Song, SongDraft, TrackDraft,
};
use music_catalog_server::{CatalogStore, SqliteCatalogStore};
use rand::seq::IndexedRandom;
use rand::Rng;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const MAX_ATTEMPTS: usize = 10;
const FIRST_RELEASE_YEAR: i32 = 1970;
const MIN_TRACKS_PER_ALBUM: usize = 3;
const MAX_TRACKS_PER_ALBUM: usize = 7;

const FIRST_NAMES: &[&str] = &[
    "Anna", "Boris", "Clara", "Dmitri", "Elena", "Felix", "Galina", "Hugo", "Irina", "Jonas",
    "Katya", "Leon", "Marta", "Nikolai", "Olga", "Pavel", "Rosa", "Sergei", "Tamara", "Viktor",
];

const LAST_NAMES: &[&str] = &[
    "Abramova", "Belov", "Chernova", "Denisov", "Egorova", "Fomin", "Gromova", "Ilyin", "Kozlova",
    "Lebedev", "Morozova", "Novikov", "Orlova", "Petrov", "Romanova", "Sokolov", "Titova",
    "Volkov", "Zaitseva", "Yakovlev",
];

const WORDS: &[&str] = &[
    "night", "river", "silver", "echo", "winter", "glass", "ember", "harbor", "velvet", "storm",
    "lantern", "orbit", "meadow", "signal", "shadow", "copper", "tide", "north", "garden", "static",
    "paper", "golden", "quiet", "wire", "hollow", "neon", "frost", "distant", "morning", "smoke",
];

#[derive(Parser, Debug)]
#[command(name = "cli-seed")]
#[command(about = "Fill a catalog database with generated test data")]
struct Args {
    /// Path to the SQLite catalog database file. Created if missing.
    #[arg(value_name = "DB_PATH")]
    db_path: PathBuf,

    /// Number of artists to create.
    #[arg(long, default_value_t = 10)]
    artists: usize,

    /// Number of songs to create.
    #[arg(long, default_value_t = 100)]
    songs: usize,

    /// Number of albums to create.
    #[arg(long, default_value_t = 23)]
    albums: usize,
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A capitalized phrase of `min..=max` random words.
fn sentence<R: Rng>(rng: &mut R, min: usize, max: usize) -> String {
    let count = rng.random_range(min..=max);
    let words: Vec<&str> = WORDS.choose_multiple(rng, count).copied().collect();
    capitalize(&words.join(" "))
}

fn person_name<R: Rng>(rng: &mut R) -> String {
    let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Anna");
    let last = LAST_NAMES.choose(rng).copied().unwrap_or("Petrov");
    format!("{} {}", first, last)
}

/// Retries `attempt` while it fails validation, up to `MAX_ATTEMPTS` times.
fn with_retries<T>(mut attempt: impl FnMut() -> Result<T, CatalogError>) -> Result<Option<T>> {
    for _ in 0..MAX_ATTEMPTS {
        match attempt() {
            Ok(value) => return Ok(Some(value)),
            Err(CatalogError::Validation(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(None)
}

fn add_artists<R: Rng>(store: &SqliteCatalogStore, rng: &mut R, count: usize) -> Result<Vec<Artist>> {
    let mut artists = Vec::with_capacity(count);
    for _ in 0..count {
        let created = with_retries(|| {
            store.create_artist(&ArtistDraft {
                name: person_name(rng).into(),
            })
        })?;
        match created {
            Some(artist) => artists.push(artist),
            None => warn!(
                "Could not generate a unique artist name after {} attempts",
                MAX_ATTEMPTS
            ),
        }
    }
    info!("Added {} artists.", artists.len());
    Ok(artists)
}

fn add_songs<R: Rng>(store: &SqliteCatalogStore, rng: &mut R, count: usize) -> Result<Vec<Song>> {
    let mut songs = Vec::with_capacity(count);
    for _ in 0..count {
        songs.push(store.create_song(&SongDraft {
            title: sentence(rng, 1, 3).into(),
        })?);
    }
    info!("Added {} songs.", songs.len());
    Ok(songs)
}

/// Adds `listing` to a freshly created album. The album is removed again if
/// the tracks cannot be added, so no album is left without its listing.
fn attach_tracks(store: &SqliteCatalogStore, album_id: i64, listing: &[TrackDraft]) -> Result<usize> {
    match store.add_album_tracks(album_id, listing) {
        Ok(view) => Ok(view.songs.len()),
        Err(err) => {
            store.delete_album(album_id)?;
            Err(err.into())
        }
    }
}

fn add_albums<R: Rng>(
    store: &SqliteCatalogStore,
    rng: &mut R,
    count: usize,
    artists: &[Artist],
    songs: &[Song],
) -> Result<()> {
    let last_year = chrono::Local::now().year();
    let mut albums = 0;
    let mut tracks = 0;

    for _ in 0..count {
        let Some(artist) = artists.choose(rng) else {
            break;
        };
        let created = with_retries(|| {
            store.create_album(&AlbumDraft {
                title: sentence(rng, 1, 2).into(),
                release_year: Field::Present(rng.random_range(FIRST_RELEASE_YEAR..=last_year) as i64),
                artist: artist.id.into(),
                songs: Field::Present(vec![]),
            })
        })?;
        let Some(album) = created else {
            warn!(
                "Could not generate a unique album title for {} after {} attempts",
                artist.name, MAX_ATTEMPTS
            );
            continue;
        };
        albums += 1;

        let track_count = rng
            .random_range(MIN_TRACKS_PER_ALBUM..=MAX_TRACKS_PER_ALBUM)
            .min(songs.len());
        let listing: Vec<TrackDraft> = songs
            .choose_multiple(rng, track_count)
            .enumerate()
            .map(|(index, song)| TrackDraft::new(song.id, index as i64 + 1))
            .collect();
        tracks += attach_tracks(store, album.id, &listing)?;
    }

    info!("Added {} album-song links.", tracks);
    info!("Added {} albums.", albums);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if args.albums > 0 && args.artists == 0 {
        bail!("Albums need at least one artist");
    }

    info!("Catalog Seed Tool");
    info!("Database: {}", args.db_path.display());

    let store = SqliteCatalogStore::new(&args.db_path, 1)?;
    let mut rng = rand::rng();

    let artists = add_artists(&store, &mut rng, args.artists)?;
    let songs = add_songs(&store, &mut rng, args.songs)?;
    add_albums(&store, &mut rng, args.albums, &artists, &songs)?;

    info!(
        "Catalog now holds {} artists, {} songs, {} albums",
        store.get_artists_count(),
        store.get_songs_count(),
        store.get_albums_count()
    );
    Ok(())
}
