use super::models::EntityKind;
use super::validation::ValidationErrors;
use rusqlite::ErrorCode;
use thiserror::Error;

pub const NON_FIELD_ERRORS: &str = "non_field_errors";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0} not found")]
    NotFound(EntityKind),

    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("constraint violation: {message}")]
    ConstraintViolation {
        field: Option<String>,
        message: String,
    },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl CatalogError {
    /// Field scoped errors to render for a client, if this error carries any.
    pub fn field_errors(&self) -> Option<ValidationErrors> {
        match self {
            CatalogError::Validation(errors) => Some(errors.clone()),
            CatalogError::ConstraintViolation { field, message } => {
                let mut errors = ValidationErrors::default();
                errors.add(field.as_deref().unwrap_or(NON_FIELD_ERRORS), message.clone());
                Some(errors)
            }
            _ => None,
        }
    }

    pub(crate) fn lock_poisoned() -> Self {
        CatalogError::Storage(anyhow::anyhow!("catalog connection mutex poisoned"))
    }
}

impl From<ValidationErrors> for CatalogError {
    fn from(errors: ValidationErrors) -> Self {
        CatalogError::Validation(errors)
    }
}

impl From<rusqlite::Error> for CatalogError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(e, msg) = &err {
            if e.code == ErrorCode::ConstraintViolation {
                let (field, message) = describe_constraint(msg.as_deref().unwrap_or_default());
                return CatalogError::ConstraintViolation {
                    field: field.map(str::to_string),
                    message: message.to_string(),
                };
            }
        }
        CatalogError::Storage(err.into())
    }
}

/// Map an SQLite constraint failure message to the client facing field and
/// message.
fn describe_constraint(msg: &str) -> (Option<&'static str>, &'static str) {
    let Some(columns) = msg.strip_prefix("UNIQUE constraint failed: ") else {
        if msg.starts_with("FOREIGN KEY") {
            return (None, "Referenced object does not exist.");
        }
        return (None, "Stored values violate a catalog constraint.");
    };
    match columns {
        "artists.name" => (Some("name"), "Artist with this name already exists."),
        "albums.title, albums.artist_id" => (
            Some(NON_FIELD_ERRORS),
            "The fields title, artist must make a unique set.",
        ),
        "album_songs.album_id, album_songs.track_number" => (
            Some("songs"),
            "A track with this number already exists in the album.",
        ),
        _ => (None, "Stored values violate a catalog constraint."),
    }
}
