//! Validation for catalog write payloads.
//!
//! Validators run inside the write transaction, resolving references through a
//! `CatalogLookup`, and turn a draft into a value that can be persisted as is.
//! Album rules run in groups: field rules first, then duplicate track numbers,
//! then `(title, artist)` uniqueness. A group only runs if the previous groups
//! produced no errors.

use super::drafts::{AlbumDraft, ArtistDraft, Field, SongDraft, TrackDraft, WriteMode};
use super::error::{CatalogError, CatalogResult, NON_FIELD_ERRORS};
use super::models::{AlbumRecord, Artist, Song};
use super::schema::{
    ALBUM_TITLE_MAX_LEN, ARTIST_NAME_MAX_LEN, MAX_TRACK_NUMBER, MIN_RELEASE_YEAR,
    MIN_TRACK_NUMBER, SONG_TITLE_MAX_LEN,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const NOT_BLANK: &str = "This field may not be blank.";

/// Field name to messages, serialized as a plain JSON object.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.0.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Reference and uniqueness lookups needed by the validators.
pub trait CatalogLookup {
    fn find_artist(&self, id: i64) -> CatalogResult<Option<Artist>>;

    fn find_song(&self, id: i64) -> CatalogResult<Option<Song>>;

    /// Whether another artist than `exclude_id` already uses `name`.
    fn artist_name_taken(&self, name: &str, exclude_id: Option<i64>) -> CatalogResult<bool>;

    /// Whether another album than `exclude_id` by `artist_id` already uses `title`.
    fn album_title_taken(
        &self,
        title: &str,
        artist_id: i64,
        exclude_id: Option<i64>,
    ) -> CatalogResult<bool>;

    /// Track numbers already used in the listing of `album_id`.
    fn album_track_numbers(&self, album_id: i64) -> CatalogResult<HashSet<u32>>;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidatedArtist {
    pub name: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidatedSong {
    pub title: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidatedTrack {
    pub song: Song,
    pub track_number: u32,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidatedAlbum {
    pub title: String,
    pub release_year: i32,
    pub artist: Artist,
    /// `None` keeps the stored track listing, `Some` replaces it.
    pub tracks: Option<Vec<ValidatedTrack>>,
}

fn does_not_exist(pk: i64) -> String {
    format!("Invalid pk \"{}\" - object does not exist.", pk)
}

/// Resolve a field against its stored value. `None` means an error was
/// recorded or the field stays unset.
fn resolve_field<'a, T>(
    errors: &mut ValidationErrors,
    field: &str,
    value: &'a Field<T>,
    stored: Option<&'a T>,
    required: bool,
) -> Option<&'a T> {
    match value {
        Field::Present(v) => Some(v),
        Field::Null => {
            errors.add(field, NOT_NULL);
            None
        }
        Field::Absent => {
            if stored.is_none() && required {
                errors.add(field, REQUIRED);
            }
            stored
        }
    }
}

fn text_field(
    errors: &mut ValidationErrors,
    field: &str,
    value: &Field<String>,
    stored: Option<&String>,
    required: bool,
    max_len: usize,
) -> Option<String> {
    let text = resolve_field(errors, field, value, stored, required)?.trim();
    if text.is_empty() {
        errors.add(field, NOT_BLANK);
        return None;
    }
    if text.chars().count() > max_len {
        errors.add(
            field,
            format!("Ensure this field has no more than {} characters.", max_len),
        );
        return None;
    }
    Some(text.to_string())
}

/// Scalars of a partial update fall back to the stored row; full writes must
/// supply them.
fn stored_if_partial<T>(mode: WriteMode, stored: Option<T>) -> Option<T> {
    if mode.is_partial() {
        stored
    } else {
        None
    }
}

pub fn validate_artist(
    draft: &ArtistDraft,
    mode: WriteMode,
    existing: Option<&Artist>,
    lookup: &dyn CatalogLookup,
) -> CatalogResult<ValidatedArtist> {
    let mut errors = ValidationErrors::default();
    let stored_name = stored_if_partial(mode, existing.map(|a| &a.name));
    let name = text_field(
        &mut errors,
        "name",
        &draft.name,
        stored_name,
        true,
        ARTIST_NAME_MAX_LEN,
    );

    if let Some(name) = &name {
        if lookup.artist_name_taken(name, existing.map(|a| a.id))? {
            errors.add("name", "Artist with this name already exists.");
        }
    }

    match name {
        Some(name) if errors.is_empty() => Ok(ValidatedArtist { name }),
        _ => Err(CatalogError::Validation(errors)),
    }
}

pub fn validate_song(
    draft: &SongDraft,
    mode: WriteMode,
    existing: Option<&Song>,
) -> CatalogResult<ValidatedSong> {
    let mut errors = ValidationErrors::default();
    let stored_title = stored_if_partial(mode, existing.map(|s| &s.title));
    let title = text_field(
        &mut errors,
        "title",
        &draft.title,
        stored_title,
        true,
        SONG_TITLE_MAX_LEN,
    );

    match title {
        Some(title) if errors.is_empty() => Ok(ValidatedSong { title }),
        _ => Err(CatalogError::Validation(errors)),
    }
}

fn validate_release_year(errors: &mut ValidationErrors, year: i64, current_year: i32) -> Option<i32> {
    if year < MIN_RELEASE_YEAR as i64 {
        errors.add(
            "release_year",
            "Album release year cannot be earlier than 1900.",
        );
        return None;
    }
    if year > current_year as i64 {
        errors.add(
            "release_year",
            "Album release year cannot be later than the current year.",
        );
        return None;
    }
    Some(year as i32)
}

fn validate_track(
    errors: &mut ValidationErrors,
    index: usize,
    track: &TrackDraft,
    lookup: &dyn CatalogLookup,
) -> CatalogResult<Option<ValidatedTrack>> {
    let song_path = format!("songs[{}].song", index);
    let number_path = format!("songs[{}].track_number", index);

    let song = match resolve_field(errors, &song_path, &track.song, None, true) {
        Some(&id) => {
            let song = lookup.find_song(id)?;
            if song.is_none() {
                errors.add(&song_path, does_not_exist(id));
            }
            song
        }
        None => None,
    };

    let track_number = match resolve_field(errors, &number_path, &track.track_number, None, true)
    {
        Some(&n) if n < MIN_TRACK_NUMBER => {
            errors.add(
                &number_path,
                format!(
                    "Ensure this value is greater than or equal to {}.",
                    MIN_TRACK_NUMBER
                ),
            );
            None
        }
        Some(&n) if n > MAX_TRACK_NUMBER => {
            errors.add(
                &number_path,
                format!(
                    "Ensure this value is less than or equal to {}.",
                    MAX_TRACK_NUMBER
                ),
            );
            None
        }
        Some(&n) => Some(n as u32),
        None => None,
    };

    Ok(song
        .zip(track_number)
        .map(|(song, track_number)| ValidatedTrack { song, track_number }))
}

fn has_duplicate_track_numbers(tracks: &[ValidatedTrack]) -> bool {
    let mut seen = HashSet::with_capacity(tracks.len());
    tracks.iter().any(|t| !seen.insert(t.track_number))
}

/// Validate an album write.
///
/// `existing` is the stored row for updates. `current_year` bounds
/// `release_year` from above.
pub fn validate_album(
    draft: &AlbumDraft,
    mode: WriteMode,
    existing: Option<&AlbumRecord>,
    lookup: &dyn CatalogLookup,
    current_year: i32,
) -> CatalogResult<ValidatedAlbum> {
    let mut errors = ValidationErrors::default();

    let stored_title = stored_if_partial(mode, existing.map(|a| &a.title));
    let title = text_field(
        &mut errors,
        "title",
        &draft.title,
        stored_title,
        true,
        ALBUM_TITLE_MAX_LEN,
    );

    let stored_year = stored_if_partial(mode, existing.map(|a| a.release_year as i64));
    let release_year = match &draft.release_year {
        Field::Present(year) => validate_release_year(&mut errors, *year, current_year),
        other => resolve_field(&mut errors, "release_year", other, stored_year.as_ref(), true)
            .map(|&y| y as i32),
    };

    let stored_artist = stored_if_partial(mode, existing.map(|a| a.artist));
    let artist = match resolve_field(
        &mut errors,
        "artist",
        &draft.artist,
        stored_artist.as_ref(),
        true,
    ) {
        Some(&id) => {
            let artist = lookup.find_artist(id)?;
            if artist.is_none() {
                errors.add("artist", does_not_exist(id));
            }
            artist
        }
        None => None,
    };

    // The listing is required on create only; on updates leaving it out keeps
    // the stored tracks.
    let tracks = match &draft.songs {
        Field::Present(entries) => {
            let mut tracks = Vec::with_capacity(entries.len());
            for (index, entry) in entries.iter().enumerate() {
                if let Some(track) = validate_track(&mut errors, index, entry, lookup)? {
                    tracks.push(track);
                }
            }
            Some(tracks)
        }
        Field::Null => {
            errors.add("songs", NOT_NULL);
            None
        }
        Field::Absent => {
            if mode == WriteMode::Create {
                errors.add("songs", REQUIRED);
            }
            None
        }
    };

    if !errors.is_empty() {
        return Err(CatalogError::Validation(errors));
    }
    let (Some(title), Some(release_year), Some(artist)) = (title, release_year, artist) else {
        return Err(CatalogError::Validation(errors));
    };

    if let Some(tracks) = &tracks {
        if has_duplicate_track_numbers(tracks) {
            return Err(CatalogError::Validation(ValidationErrors::single(
                "songs",
                "A track with this number already exists in the album.",
            )));
        }
    }

    if lookup.album_title_taken(&title, artist.id, existing.map(|a| a.id))? {
        return Err(CatalogError::Validation(ValidationErrors::single(
            NON_FIELD_ERRORS,
            "The fields title, artist must make a unique set.",
        )));
    }

    Ok(ValidatedAlbum {
        title,
        release_year,
        artist,
        tracks,
    })
}

/// Validate tracks appended to the stored listing of `album_id`.
pub fn validate_track_additions(
    album_id: i64,
    entries: &[TrackDraft],
    lookup: &dyn CatalogLookup,
) -> CatalogResult<Vec<ValidatedTrack>> {
    let mut errors = ValidationErrors::default();
    let mut tracks = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        if let Some(track) = validate_track(&mut errors, index, entry, lookup)? {
            tracks.push(track);
        }
    }
    if !errors.is_empty() {
        return Err(CatalogError::Validation(errors));
    }

    if has_duplicate_track_numbers(&tracks) {
        return Err(CatalogError::Validation(ValidationErrors::single(
            "songs",
            "A track with this number already exists in the album.",
        )));
    }

    let stored = lookup.album_track_numbers(album_id)?;
    for (index, track) in tracks.iter().enumerate() {
        if stored.contains(&track.track_number) {
            errors.add(
                &format!("songs[{}].track_number", index),
                format!(
                    "Track number {} already exists in this album.",
                    track.track_number
                ),
            );
        }
    }
    errors.into_result(tracks).map_err(CatalogError::Validation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeLookup {
        artists: HashMap<i64, Artist>,
        songs: HashMap<i64, Song>,
        albums: Vec<AlbumRecord>,
        track_numbers: HashMap<i64, HashSet<u32>>,
    }

    impl FakeLookup {
        fn with_defaults() -> Self {
            let mut lookup = FakeLookup::default();
            lookup.artists.insert(
                1,
                Artist {
                    id: 1,
                    name: "Radiohead".to_string(),
                },
            );
            for (id, title) in [(10, "Airbag"), (11, "Paranoid Android")] {
                lookup.songs.insert(
                    id,
                    Song {
                        id,
                        title: title.to_string(),
                    },
                );
            }
            lookup.albums.push(AlbumRecord {
                id: 5,
                title: "OK Computer".to_string(),
                release_year: 1997,
                artist: 1,
            });
            lookup.track_numbers.insert(5, HashSet::from([1, 2]));
            lookup
        }
    }

    impl CatalogLookup for FakeLookup {
        fn find_artist(&self, id: i64) -> CatalogResult<Option<Artist>> {
            Ok(self.artists.get(&id).cloned())
        }

        fn find_song(&self, id: i64) -> CatalogResult<Option<Song>> {
            Ok(self.songs.get(&id).cloned())
        }

        fn artist_name_taken(&self, name: &str, exclude_id: Option<i64>) -> CatalogResult<bool> {
            Ok(self
                .artists
                .values()
                .any(|a| a.name == name && Some(a.id) != exclude_id))
        }

        fn album_title_taken(
            &self,
            title: &str,
            artist_id: i64,
            exclude_id: Option<i64>,
        ) -> CatalogResult<bool> {
            Ok(self
                .albums
                .iter()
                .any(|a| a.title == title && a.artist == artist_id && Some(a.id) != exclude_id))
        }

        fn album_track_numbers(&self, album_id: i64) -> CatalogResult<HashSet<u32>> {
            Ok(self.track_numbers.get(&album_id).cloned().unwrap_or_default())
        }
    }

    fn album_draft(release_year: i64, tracks: Vec<TrackDraft>) -> AlbumDraft {
        AlbumDraft {
            title: Field::Present("Kid A".to_string()),
            release_year: Field::Present(release_year),
            artist: Field::Present(1),
            songs: Field::Present(tracks),
        }
    }

    fn expect_errors(result: CatalogResult<impl fmt::Debug>) -> ValidationErrors {
        match result {
            Err(CatalogError::Validation(errors)) => errors,
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn valid_album_resolves_references() {
        let lookup = FakeLookup::with_defaults();
        let draft = album_draft(2000, vec![TrackDraft::new(10, 2), TrackDraft::new(11, 1)]);

        let album = validate_album(&draft, WriteMode::Create, None, &lookup, 2024).unwrap();

        assert_eq!(album.title, "Kid A");
        assert_eq!(album.artist.name, "Radiohead");
        let tracks = album.tracks.unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].song.title, "Airbag");
        assert_eq!(tracks[0].track_number, 2);
    }

    #[test]
    fn release_year_bounds() {
        let lookup = FakeLookup::with_defaults();

        let errors = expect_errors(validate_album(
            &album_draft(1899, vec![]),
            WriteMode::Create,
            None,
            &lookup,
            2024,
        ));
        assert_eq!(
            errors.get("release_year").unwrap(),
            &vec!["Album release year cannot be earlier than 1900.".to_string()]
        );

        let errors = expect_errors(validate_album(
            &album_draft(2025, vec![]),
            WriteMode::Create,
            None,
            &lookup,
            2024,
        ));
        assert_eq!(
            errors.get("release_year").unwrap(),
            &vec!["Album release year cannot be later than the current year.".to_string()]
        );

        assert!(validate_album(&album_draft(1900, vec![]), WriteMode::Create, None, &lookup, 2024).is_ok());
        assert!(validate_album(&album_draft(2024, vec![]), WriteMode::Create, None, &lookup, 2024).is_ok());
    }

    #[test]
    fn duplicate_track_numbers_are_rejected_on_songs() {
        let lookup = FakeLookup::with_defaults();
        let draft = album_draft(2000, vec![TrackDraft::new(10, 1), TrackDraft::new(11, 1)]);

        let errors = expect_errors(validate_album(&draft, WriteMode::Create, None, &lookup, 2024));

        assert_eq!(
            errors.get("songs").unwrap(),
            &vec!["A track with this number already exists in the album.".to_string()]
        );
    }

    #[test]
    fn field_errors_suppress_later_groups() {
        let lookup = FakeLookup::with_defaults();
        let mut draft = album_draft(1800, vec![TrackDraft::new(10, 1), TrackDraft::new(11, 1)]);
        draft.title = Field::Present("OK Computer".to_string());

        let errors = expect_errors(validate_album(&draft, WriteMode::Create, None, &lookup, 2024));

        assert!(errors.get("release_year").is_some());
        assert!(errors.get("songs").is_none());
        assert!(errors.get(NON_FIELD_ERRORS).is_none());
    }

    #[test]
    fn unresolved_references_and_track_ranges() {
        let lookup = FakeLookup::with_defaults();
        let mut draft = album_draft(2000, vec![TrackDraft::new(99, 0), TrackDraft::new(10, 4096)]);
        draft.artist = Field::Present(42);

        let errors = expect_errors(validate_album(&draft, WriteMode::Create, None, &lookup, 2024));

        assert_eq!(
            errors.get("artist").unwrap(),
            &vec!["Invalid pk \"42\" - object does not exist.".to_string()]
        );
        assert_eq!(
            errors.get("songs[0].song").unwrap(),
            &vec!["Invalid pk \"99\" - object does not exist.".to_string()]
        );
        assert_eq!(
            errors.get("songs[0].track_number").unwrap(),
            &vec!["Ensure this value is greater than or equal to 1.".to_string()]
        );
        assert_eq!(
            errors.get("songs[1].track_number").unwrap(),
            &vec!["Ensure this value is less than or equal to 2048.".to_string()]
        );
    }

    #[test]
    fn create_requires_every_field() {
        let lookup = FakeLookup::with_defaults();
        let errors = expect_errors(validate_album(
            &AlbumDraft::default(),
            WriteMode::Create,
            None,
            &lookup,
            2024,
        ));
        for field in ["title", "release_year", "artist", "songs"] {
            assert_eq!(errors.get(field).unwrap(), &vec![REQUIRED.to_string()]);
        }
    }

    #[test]
    fn title_and_artist_must_be_unique_together() {
        let lookup = FakeLookup::with_defaults();
        let mut draft = album_draft(2000, vec![]);
        draft.title = Field::Present("OK Computer".to_string());

        let errors = expect_errors(validate_album(&draft, WriteMode::Create, None, &lookup, 2024));
        assert_eq!(
            errors.get(NON_FIELD_ERRORS).unwrap(),
            &vec!["The fields title, artist must make a unique set.".to_string()]
        );

        // Updating the album itself does not collide with its own row.
        let existing = lookup.albums[0].clone();
        assert!(validate_album(&draft, WriteMode::Replace, Some(&existing), &lookup, 2024).is_ok());
    }

    #[test]
    fn patch_falls_back_to_stored_values() {
        let lookup = FakeLookup::with_defaults();
        let existing = lookup.albums[0].clone();
        let draft = AlbumDraft {
            release_year: Field::Present(1998),
            ..Default::default()
        };

        let album =
            validate_album(&draft, WriteMode::Patch, Some(&existing), &lookup, 2024).unwrap();

        assert_eq!(album.title, "OK Computer");
        assert_eq!(album.release_year, 1998);
        assert_eq!(album.artist.id, 1);
        assert!(album.tracks.is_none());
    }

    #[test]
    fn replace_requires_scalars_but_not_songs() {
        let lookup = FakeLookup::with_defaults();
        let existing = lookup.albums[0].clone();
        let draft = AlbumDraft {
            title: Field::Present("OK Computer".to_string()),
            ..Default::default()
        };

        let errors = expect_errors(validate_album(
            &draft,
            WriteMode::Replace,
            Some(&existing),
            &lookup,
            2024,
        ));
        assert!(errors.get("release_year").is_some());
        assert!(errors.get("artist").is_some());
        assert!(errors.get("songs").is_none());
    }

    #[test]
    fn additions_may_not_reuse_stored_track_numbers() {
        let lookup = FakeLookup::with_defaults();

        let errors = expect_errors(validate_track_additions(
            5,
            &[TrackDraft::new(10, 3), TrackDraft::new(11, 2)],
            &lookup,
        ));
        assert_eq!(
            errors.get("songs[1].track_number").unwrap(),
            &vec!["Track number 2 already exists in this album.".to_string()]
        );
        assert!(errors.get("songs[0].track_number").is_none());

        let tracks = validate_track_additions(5, &[TrackDraft::new(10, 3)], &lookup).unwrap();
        assert_eq!(tracks[0].track_number, 3);
    }

    #[test]
    fn artist_name_rules() {
        let lookup = FakeLookup::with_defaults();

        let errors = expect_errors(validate_artist(
            &ArtistDraft {
                name: Field::Present("  ".to_string()),
            },
            WriteMode::Create,
            None,
            &lookup,
        ));
        assert_eq!(errors.get("name").unwrap(), &vec![NOT_BLANK.to_string()]);

        let errors = expect_errors(validate_artist(
            &ArtistDraft {
                name: Field::Present("x".repeat(56)),
            },
            WriteMode::Create,
            None,
            &lookup,
        ));
        assert_eq!(
            errors.get("name").unwrap(),
            &vec!["Ensure this field has no more than 55 characters.".to_string()]
        );

        let errors = expect_errors(validate_artist(
            &ArtistDraft {
                name: Field::Present("Radiohead".to_string()),
            },
            WriteMode::Create,
            None,
            &lookup,
        ));
        assert_eq!(
            errors.get("name").unwrap(),
            &vec!["Artist with this name already exists.".to_string()]
        );

        let artist = validate_artist(
            &ArtistDraft {
                name: Field::Present(" Portishead ".to_string()),
            },
            WriteMode::Create,
            None,
            &lookup,
        )
        .unwrap();
        assert_eq!(artist.name, "Portishead");
    }

    #[test]
    fn song_title_rules() {
        let errors = expect_errors(validate_song(
            &SongDraft { title: Field::Null },
            WriteMode::Create,
            None,
        ));
        assert_eq!(errors.get("title").unwrap(), &vec![NOT_NULL.to_string()]);

        let existing = Song {
            id: 3,
            title: "Creep".to_string(),
        };
        let song = validate_song(&SongDraft::default(), WriteMode::Patch, Some(&existing)).unwrap();
        assert_eq!(song.title, "Creep");

        let errors = expect_errors(validate_song(
            &SongDraft::default(),
            WriteMode::Replace,
            Some(&existing),
        ));
        assert_eq!(errors.get("title").unwrap(), &vec![REQUIRED.to_string()]);
    }
}
