//! Catalog CRUD routes.
//!
//! Provides list, create, retrieve, update, partial update and destroy for
//! artists, songs and albums under `/api/v1/catalogs`, each path with and
//! without a trailing slash.

use axum::{
    extract::{rejection::JsonRejection, OriginalUri, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::api_error::ApiError;
use super::pagination::{paginate, request_url, window_from_params};
use super::state::{GuardedCatalogStore, ServerState};
use crate::catalog_store::{
    parse_ordering, AlbumDraft, AlbumQuery, ArtistDraft, ArtistQuery, CatalogAction, CatalogError,
    EntityKind, Listing, ResponseShape, SongDraft, SongQuery, ValidationErrors, Window, WriteMode,
};

pub const CATALOGS_PREFIX: &str = "/api/v1/catalogs";

// =============================================================================
// Request Types
// =============================================================================

/// Query string of list endpoints. Filters that do not apply to an entity are
/// ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub ordering: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub release_year: Option<String>,
    pub artist: Option<String>,
}

impl ListParams {
    fn window(&self) -> Window {
        window_from_params(self.limit.as_deref(), self.offset.as_deref())
    }
}

fn parse_number_filter<T: std::str::FromStr>(
    errors: &mut ValidationErrors,
    field: &str,
    raw: &Option<String>,
    message: &str,
) -> Option<T> {
    let raw = raw.as_deref().map(str::trim).filter(|r| !r.is_empty())?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.add(field, message);
            None
        }
    }
}

/// Path ids that are not integers cannot name a row.
fn parse_id(raw: &str, kind: EntityKind) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::Catalog(CatalogError::NotFound(kind)))
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    Ok(body?.0)
}

// =============================================================================
// Responses
// =============================================================================

fn success_status(action: CatalogAction) -> StatusCode {
    match action {
        CatalogAction::Create => StatusCode::CREATED,
        CatalogAction::Destroy => StatusCode::NO_CONTENT,
        _ => StatusCode::OK,
    }
}

fn respond<T: Serialize>(kind: EntityKind, action: CatalogAction, body: T) -> Response {
    let status = success_status(action);
    if action.is_write() {
        debug!("{} {} -> {}", kind, action, status.as_u16());
    }
    match action.shape() {
        ResponseShape::Empty => status.into_response(),
        ResponseShape::View | ResponseShape::Record => (status, Json(body)).into_response(),
    }
}

fn respond_page<T: Serialize>(
    kind: EntityKind,
    listing: Listing<T>,
    window: Window,
    headers: &HeaderMap,
    uri: &OriginalUri,
) -> Response {
    let page = paginate(listing, window, &request_url(headers, &uri.0));
    respond(kind, CatalogAction::List, page)
}

type ApiResult = Result<Response, ApiError>;

// =============================================================================
// Artists
// =============================================================================

async fn list_artists(
    State(store): State<GuardedCatalogStore>,
    headers: HeaderMap,
    uri: OriginalUri,
    Query(params): Query<ListParams>,
) -> ApiResult {
    let query = ArtistQuery {
        name: params.name.clone(),
        ordering: parse_ordering(params.ordering.as_deref()),
        window: params.window(),
    };
    let listing = store.list_artists(&query)?;
    Ok(respond_page(EntityKind::Artist, listing, query.window, &headers, &uri))
}

async fn create_artist(
    State(store): State<GuardedCatalogStore>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    let draft = ArtistDraft::from_json(&json_body(body)?).map_err(CatalogError::from)?;
    let artist = store.create_artist(&draft)?;
    Ok(respond(EntityKind::Artist, CatalogAction::Create, artist))
}

async fn get_artist(
    State(store): State<GuardedCatalogStore>,
    Path(id): Path<String>,
) -> ApiResult {
    let artist = store.get_artist(parse_id(&id, EntityKind::Artist)?)?;
    Ok(respond(EntityKind::Artist, CatalogAction::Retrieve, artist))
}

async fn write_artist(
    store: GuardedCatalogStore,
    id: String,
    body: Result<Json<Value>, JsonRejection>,
    action: CatalogAction,
    mode: WriteMode,
) -> ApiResult {
    let id = parse_id(&id, EntityKind::Artist)?;
    let draft = ArtistDraft::from_json(&json_body(body)?).map_err(CatalogError::from)?;
    let artist = store.update_artist(id, &draft, mode)?;
    Ok(respond(EntityKind::Artist, action, artist))
}

async fn put_artist(
    State(store): State<GuardedCatalogStore>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    write_artist(store, id, body, CatalogAction::Update, WriteMode::Replace).await
}

async fn patch_artist(
    State(store): State<GuardedCatalogStore>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    write_artist(store, id, body, CatalogAction::PartialUpdate, WriteMode::Patch).await
}

async fn delete_artist(
    State(store): State<GuardedCatalogStore>,
    Path(id): Path<String>,
) -> ApiResult {
    store.delete_artist(parse_id(&id, EntityKind::Artist)?)?;
    Ok(respond(EntityKind::Artist, CatalogAction::Destroy, ()))
}

// =============================================================================
// Songs
// =============================================================================

async fn list_songs(
    State(store): State<GuardedCatalogStore>,
    headers: HeaderMap,
    uri: OriginalUri,
    Query(params): Query<ListParams>,
) -> ApiResult {
    let query = SongQuery {
        title: params.title.clone(),
        ordering: parse_ordering(params.ordering.as_deref()),
        window: params.window(),
    };
    let listing = store.list_songs(&query)?;
    Ok(respond_page(EntityKind::Song, listing, query.window, &headers, &uri))
}

async fn create_song(
    State(store): State<GuardedCatalogStore>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    let draft = SongDraft::from_json(&json_body(body)?).map_err(CatalogError::from)?;
    let song = store.create_song(&draft)?;
    Ok(respond(EntityKind::Song, CatalogAction::Create, song))
}

async fn get_song(State(store): State<GuardedCatalogStore>, Path(id): Path<String>) -> ApiResult {
    let song = store.get_song(parse_id(&id, EntityKind::Song)?)?;
    Ok(respond(EntityKind::Song, CatalogAction::Retrieve, song))
}

async fn write_song(
    store: GuardedCatalogStore,
    id: String,
    body: Result<Json<Value>, JsonRejection>,
    action: CatalogAction,
    mode: WriteMode,
) -> ApiResult {
    let id = parse_id(&id, EntityKind::Song)?;
    let draft = SongDraft::from_json(&json_body(body)?).map_err(CatalogError::from)?;
    let song = store.update_song(id, &draft, mode)?;
    Ok(respond(EntityKind::Song, action, song))
}

async fn put_song(
    State(store): State<GuardedCatalogStore>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    write_song(store, id, body, CatalogAction::Update, WriteMode::Replace).await
}

async fn patch_song(
    State(store): State<GuardedCatalogStore>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    write_song(store, id, body, CatalogAction::PartialUpdate, WriteMode::Patch).await
}

async fn delete_song(
    State(store): State<GuardedCatalogStore>,
    Path(id): Path<String>,
) -> ApiResult {
    store.delete_song(parse_id(&id, EntityKind::Song)?)?;
    Ok(respond(EntityKind::Song, CatalogAction::Destroy, ()))
}

// =============================================================================
// Albums
// =============================================================================

async fn list_albums(
    State(store): State<GuardedCatalogStore>,
    headers: HeaderMap,
    uri: OriginalUri,
    Query(params): Query<ListParams>,
) -> ApiResult {
    let mut errors = ValidationErrors::default();
    let release_year = parse_number_filter::<i32>(
        &mut errors,
        "release_year",
        &params.release_year,
        "Enter a number.",
    );
    let artist = parse_number_filter::<i64>(
        &mut errors,
        "artist",
        &params.artist,
        "Select a valid choice. That choice is not one of the available choices.",
    );
    if !errors.is_empty() {
        return Err(ApiError::InvalidQuery(errors));
    }

    let query = AlbumQuery {
        title: params.title.clone(),
        release_year,
        artist,
        ordering: parse_ordering(params.ordering.as_deref()),
        window: params.window(),
    };
    let listing = store.list_albums(&query)?;
    Ok(respond_page(EntityKind::Album, listing, query.window, &headers, &uri))
}

async fn create_album(
    State(store): State<GuardedCatalogStore>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    let draft = AlbumDraft::from_json(&json_body(body)?).map_err(CatalogError::from)?;
    let album = store.create_album(&draft)?;
    Ok(respond(EntityKind::Album, CatalogAction::Create, album))
}

async fn get_album(State(store): State<GuardedCatalogStore>, Path(id): Path<String>) -> ApiResult {
    let album = store.get_album(parse_id(&id, EntityKind::Album)?)?;
    Ok(respond(EntityKind::Album, CatalogAction::Retrieve, album))
}

async fn write_album(
    store: GuardedCatalogStore,
    id: String,
    body: Result<Json<Value>, JsonRejection>,
    action: CatalogAction,
    mode: WriteMode,
) -> ApiResult {
    let id = parse_id(&id, EntityKind::Album)?;
    let draft = AlbumDraft::from_json(&json_body(body)?).map_err(CatalogError::from)?;
    let album = store.update_album(id, &draft, mode)?;
    Ok(respond(EntityKind::Album, action, album))
}

async fn put_album(
    State(store): State<GuardedCatalogStore>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    write_album(store, id, body, CatalogAction::Update, WriteMode::Replace).await
}

async fn patch_album(
    State(store): State<GuardedCatalogStore>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    write_album(store, id, body, CatalogAction::PartialUpdate, WriteMode::Patch).await
}

async fn delete_album(
    State(store): State<GuardedCatalogStore>,
    Path(id): Path<String>,
) -> ApiResult {
    store.delete_album(parse_id(&id, EntityKind::Album)?)?;
    Ok(respond(EntityKind::Album, CatalogAction::Destroy, ()))
}

// =============================================================================
// Router
// =============================================================================

fn route_with_slash(
    router: Router<ServerState>,
    path: &str,
    methods: MethodRouter<ServerState>,
) -> Router<ServerState> {
    router
        .route(path, methods.clone())
        .route(&format!("{}/", path), methods)
}

pub fn make_catalog_routes() -> Router<ServerState> {
    let mut router = Router::new();

    router = route_with_slash(
        router,
        &format!("{}/artists", CATALOGS_PREFIX),
        get(list_artists).post(create_artist),
    );
    router = route_with_slash(
        router,
        &format!("{}/artists/{{id}}", CATALOGS_PREFIX),
        get(get_artist)
            .put(put_artist)
            .patch(patch_artist)
            .delete(delete_artist),
    );

    router = route_with_slash(
        router,
        &format!("{}/songs", CATALOGS_PREFIX),
        get(list_songs).post(create_song),
    );
    router = route_with_slash(
        router,
        &format!("{}/songs/{{id}}", CATALOGS_PREFIX),
        get(get_song)
            .put(put_song)
            .patch(patch_song)
            .delete(delete_song),
    );

    router = route_with_slash(
        router,
        &format!("{}/albums", CATALOGS_PREFIX),
        get(list_albums).post(create_album),
    );
    route_with_slash(
        router,
        &format!("{}/albums/{{id}}", CATALOGS_PREFIX),
        get(get_album)
            .put(put_album)
            .patch(patch_album)
            .delete(delete_album),
    )
}
