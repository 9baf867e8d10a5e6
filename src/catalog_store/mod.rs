mod drafts;
mod error;
mod models;
mod query;
mod schema;
mod store;
mod trait_def;
mod validation;
mod views;

pub use drafts::{AlbumDraft, ArtistDraft, Field, SongDraft, TrackDraft, WriteMode};
pub use error::{CatalogError, CatalogResult, NON_FIELD_ERRORS};
pub use models::*;
pub use query::{
    parse_ordering, AlbumQuery, AlbumSort, ArtistQuery, ArtistSort, Listing, OrderBy, SongQuery,
    SongSort, SortField, Window, MAX_WINDOW_BOUND,
};
pub use store::SqliteCatalogStore;
pub use trait_def::CatalogStore;
pub use validation::{CatalogLookup, ValidationErrors};
pub use views::{AlbumView, ArtistView, CatalogAction, ResponseShape, TrackView};
