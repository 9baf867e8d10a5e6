//! Listing queries: exact match filters, ordering and a limit/offset window.

use rusqlite::types::Value;

/// Slice of a listing. Without a limit the whole listing is returned and the
/// offset is ignored.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Window {
    pub limit: Option<usize>,
    pub offset: usize,
}

/// Largest limit or offset SQLite can take as a bound parameter.
pub const MAX_WINDOW_BOUND: usize = i64::MAX as usize;

impl Window {
    pub fn all() -> Self {
        Window::default()
    }

    /// Both bounds are clamped to `MAX_WINDOW_BOUND`.
    pub fn new(limit: usize, offset: usize) -> Self {
        Window {
            limit: Some(limit.min(MAX_WINDOW_BOUND)),
            offset: offset.min(MAX_WINDOW_BOUND),
        }
    }

    /// `LIMIT ? OFFSET ?` parameters, where a limit of -1 means no limit.
    pub(crate) fn sql_params(&self) -> (i64, i64) {
        let bound = |value: usize| i64::try_from(value).unwrap_or(i64::MAX);
        match self.limit {
            Some(limit) => (bound(limit), bound(self.offset)),
            None => (-1, 0),
        }
    }
}

/// A page of a listing together with the size of the whole filtered listing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Listing<T> {
    pub count: usize,
    pub items: Vec<T>,
}

pub trait SortField: Copy + Sized {
    fn parse(name: &str) -> Option<Self>;

    fn column(&self) -> &'static str;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OrderBy<F> {
    pub field: F,
    pub descending: bool,
}

/// Parse an `ordering` parameter such as `-release_year,title`. Unknown
/// fields are skipped.
pub fn parse_ordering<F: SortField>(raw: Option<&str>) -> Vec<OrderBy<F>> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    raw.split(',')
        .map(str::trim)
        .filter_map(|term| {
            let (name, descending) = match term.strip_prefix('-') {
                Some(name) => (name, true),
                None => (term, false),
            };
            F::parse(name).map(|field| OrderBy { field, descending })
        })
        .collect()
}

/// `ORDER BY` body for `ordering`, always ending with the id so that paging is
/// stable.
pub(crate) fn order_clause<F: SortField>(ordering: &[OrderBy<F>], table: &str) -> String {
    let mut terms: Vec<String> = ordering
        .iter()
        .map(|o| {
            format!(
                "{}.{} {}",
                table,
                o.field.column(),
                if o.descending { "DESC" } else { "ASC" }
            )
        })
        .collect();
    if !ordering.iter().any(|o| o.field.column() == "id") {
        terms.push(format!("{}.id ASC", table));
    }
    terms.join(", ")
}

macro_rules! sort_fields {
    ($name:ident { $($variant:ident => $field:literal : $column:literal),+ $(,)? }) => {
        #[derive(Clone, Copy, Debug, Eq, PartialEq)]
        pub enum $name {
            $($variant),+
        }

        impl SortField for $name {
            fn parse(name: &str) -> Option<Self> {
                match name {
                    $($field => Some($name::$variant),)+
                    _ => None,
                }
            }

            fn column(&self) -> &'static str {
                match self {
                    $($name::$variant => $column),+
                }
            }
        }
    };
}

sort_fields!(ArtistSort {
    Id => "id": "id",
    Name => "name": "name",
});

sort_fields!(SongSort {
    Id => "id": "id",
    Title => "title": "title",
});

sort_fields!(AlbumSort {
    Id => "id": "id",
    Title => "title": "title",
    ReleaseYear => "release_year": "release_year",
    Artist => "artist": "artist_id",
});

#[derive(Clone, Debug, Default)]
pub struct ArtistQuery {
    pub name: Option<String>,
    pub ordering: Vec<OrderBy<ArtistSort>>,
    pub window: Window,
}

#[derive(Clone, Debug, Default)]
pub struct SongQuery {
    pub title: Option<String>,
    pub ordering: Vec<OrderBy<SongSort>>,
    pub window: Window,
}

#[derive(Clone, Debug, Default)]
pub struct AlbumQuery {
    pub title: Option<String>,
    pub release_year: Option<i32>,
    pub artist: Option<i64>,
    pub ordering: Vec<OrderBy<AlbumSort>>,
    pub window: Window,
}

/// A `WHERE` clause with its positional parameters.
#[derive(Debug, Default)]
pub(crate) struct Filters {
    conditions: Vec<String>,
    pub(crate) params: Vec<Value>,
}

impl Filters {
    pub(crate) fn eq(&mut self, column: &str, value: Option<Value>) -> &mut Self {
        if let Some(value) = value {
            self.params.push(value);
            self.conditions
                .push(format!("{} = ?{}", column, self.params.len()));
        }
        self
    }

    pub(crate) fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }
}

impl ArtistQuery {
    pub(crate) fn filters(&self) -> Filters {
        let mut filters = Filters::default();
        filters.eq("artists.name", self.name.clone().map(Value::Text));
        filters
    }
}

impl SongQuery {
    pub(crate) fn filters(&self) -> Filters {
        let mut filters = Filters::default();
        filters.eq("songs.title", self.title.clone().map(Value::Text));
        filters
    }
}

impl AlbumQuery {
    pub(crate) fn filters(&self) -> Filters {
        let mut filters = Filters::default();
        filters
            .eq("albums.title", self.title.clone().map(Value::Text))
            .eq(
                "albums.release_year",
                self.release_year.map(|y| Value::Integer(y as i64)),
            )
            .eq("albums.artist_id", self.artist.map(Value::Integer));
        filters
    }
}
