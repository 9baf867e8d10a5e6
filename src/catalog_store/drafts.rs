//! Write payloads parsed from raw JSON request bodies.
//!
//! Parsing only checks JSON types. Presence, length, range and reference rules
//! are applied by `validation` once a draft exists.

use super::error::NON_FIELD_ERRORS;
use super::validation::ValidationErrors;
use serde_json::{Map, Value};

/// How a write payload relates to the row it targets.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteMode {
    Create,
    /// PUT: every scalar field must be supplied.
    Replace,
    /// PATCH: absent fields keep their stored value.
    Patch,
}

impl WriteMode {
    pub fn is_partial(&self) -> bool {
        matches!(self, WriteMode::Patch)
    }
}

/// A payload field before validation.
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub enum Field<T> {
    #[default]
    Absent,
    Null,
    Present(T),
}

impl<T> Field<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }
}

impl<T> From<T> for Field<T> {
    fn from(value: T) -> Self {
        Field::Present(value)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ArtistDraft {
    pub name: Field<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SongDraft {
    pub title: Field<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TrackDraft {
    pub song: Field<i64>,
    pub track_number: Field<i64>,
}

impl TrackDraft {
    pub fn new(song: i64, track_number: i64) -> Self {
        TrackDraft {
            song: Field::Present(song),
            track_number: Field::Present(track_number),
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AlbumDraft {
    pub title: Field<String>,
    pub release_year: Field<i64>,
    pub artist: Field<i64>,
    pub songs: Field<Vec<TrackDraft>>,
}

/// Python style type names, matching what API clients of the catalog expect in
/// type error messages.
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, ValidationErrors> {
    match body {
        Value::Object(map) => Ok(map),
        other => Err(ValidationErrors::single(
            NON_FIELD_ERRORS,
            format!(
                "Invalid data. Expected a dictionary, but got {}.",
                json_type_name(other)
            ),
        )),
    }
}

fn parse_field<T>(
    map: &Map<String, Value>,
    key: &str,
    path: &str,
    errors: &mut ValidationErrors,
    convert: impl Fn(&Value) -> Result<T, String>,
) -> Field<T> {
    match map.get(key) {
        None => Field::Absent,
        Some(Value::Null) => Field::Null,
        Some(value) => match convert(value) {
            Ok(v) => Field::Present(v),
            Err(message) => {
                errors.add(path, message);
                Field::Absent
            }
        },
    }
}

fn to_string(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err("Not a valid string.".to_string()),
    }
}

fn to_integer(value: &Value) -> Result<i64, String> {
    const INVALID: &str = "A valid integer is required.";
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .ok_or_else(|| INVALID.to_string()),
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| INVALID.to_string()),
        _ => Err(INVALID.to_string()),
    }
}

fn to_pk(value: &Value) -> Result<i64, String> {
    let incorrect = || {
        format!(
            "Incorrect type. Expected pk value, received {}.",
            json_type_name(value)
        )
    };
    match value {
        Value::Number(n) => n.as_i64().ok_or_else(incorrect),
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| incorrect()),
        _ => Err(incorrect()),
    }
}

fn parse_track(
    value: &Value,
    index: usize,
    errors: &mut ValidationErrors,
) -> Option<TrackDraft> {
    let prefix = format!("songs[{}]", index);
    let Value::Object(map) = value else {
        errors.add(
            &prefix,
            format!(
                "Invalid data. Expected a dictionary, but got {}.",
                json_type_name(value)
            ),
        );
        return None;
    };
    Some(TrackDraft {
        song: parse_field(map, "song", &format!("{}.song", prefix), errors, to_pk),
        track_number: parse_field(
            map,
            "track_number",
            &format!("{}.track_number", prefix),
            errors,
            to_integer,
        ),
    })
}

fn to_tracks(value: &Value, errors: &mut ValidationErrors) -> Result<Vec<TrackDraft>, String> {
    let Value::Array(items) = value else {
        return Err(format!(
            "Expected a list of items but got type \"{}\".",
            json_type_name(value)
        ));
    };
    Ok(items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| parse_track(item, index, errors))
        .collect())
}

impl ArtistDraft {
    pub fn from_json(body: &Value) -> Result<Self, ValidationErrors> {
        let map = as_object(body)?;
        let mut errors = ValidationErrors::default();
        let draft = ArtistDraft {
            name: parse_field(map, "name", "name", &mut errors, to_string),
        };
        errors.into_result(draft)
    }
}

impl SongDraft {
    pub fn from_json(body: &Value) -> Result<Self, ValidationErrors> {
        let map = as_object(body)?;
        let mut errors = ValidationErrors::default();
        let draft = SongDraft {
            title: parse_field(map, "title", "title", &mut errors, to_string),
        };
        errors.into_result(draft)
    }
}

impl AlbumDraft {
    pub fn from_json(body: &Value) -> Result<Self, ValidationErrors> {
        let map = as_object(body)?;
        let mut errors = ValidationErrors::default();
        let title = parse_field(map, "title", "title", &mut errors, to_string);
        let release_year = parse_field(map, "release_year", "release_year", &mut errors, to_integer);
        let artist = parse_field(map, "artist", "artist", &mut errors, to_pk);

        // Track entries report their errors under their own paths.
        let songs = match map.get("songs") {
            None => Field::Absent,
            Some(Value::Null) => Field::Null,
            Some(value) => match to_tracks(value, &mut errors) {
                Ok(tracks) => Field::Present(tracks),
                Err(message) => {
                    errors.add("songs", message);
                    Field::Absent
                }
            },
        };

        errors.into_result(AlbumDraft {
            title,
            release_year,
            artist,
            songs,
        })
    }
}
