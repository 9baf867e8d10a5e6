//! Limit/offset pagination of listings.
//!
//! Without a usable `limit` the whole listing is returned and both links are
//! null. With one, `next` and `previous` point at the neighbouring windows.

use axum::http::{HeaderMap, Uri};
use serde::Serialize;

use crate::catalog_store::{Listing, Window, MAX_WINDOW_BOUND};

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// A non positive or unparsable limit disables pagination, an unparsable
/// offset starts from the beginning.
pub fn window_from_params(limit: Option<&str>, offset: Option<&str>) -> Window {
    let limit = limit
        .and_then(|l| l.trim().parse::<usize>().ok())
        .filter(|l| *l > 0);
    match limit {
        Some(limit) => Window::new(
            limit,
            offset
                .and_then(|o| o.trim().parse::<usize>().ok())
                .unwrap_or(0),
        ),
        None => Window::all(),
    }
}

/// The absolute URL the request was made to.
pub fn request_url(headers: &HeaderMap, uri: &Uri) -> String {
    let host = headers
        .get("host")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let path_and_query = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
    format!("http://{}{}", host, path_and_query)
}

/// Set (or with `None` remove) `key` in the query string of `url`. Parameters
/// end up sorted by key.
fn with_query_param(url: &str, key: &str, value: Option<usize>) -> String {
    let (base, query) = url.split_once('?').unwrap_or((url, ""));
    let mut pairs: Vec<(String, String)> = query
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|p| match p.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (p.to_string(), String::new()),
        })
        .filter(|(k, _)| k != key)
        .collect();
    if let Some(value) = value {
        pairs.push((key.to_string(), value.to_string()));
    }
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    if pairs.is_empty() {
        return base.to_string();
    }
    let query = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{}", base, query)
}

pub fn paginate<T>(listing: Listing<T>, window: Window, url: &str) -> Page<T> {
    let Some(limit) = window.limit else {
        return Page {
            count: listing.count,
            next: None,
            previous: None,
            results: listing.items,
        };
    };
    let offset = window.offset;
    let with_limit = with_query_param(url, "limit", Some(limit));

    let next_offset = offset.saturating_add(limit);
    let next = (next_offset < listing.count)
        .then(|| with_query_param(&with_limit, "offset", Some(next_offset)));

    let previous = if offset == 0 {
        None
    } else if offset <= limit {
        Some(with_query_param(&with_limit, "offset", None))
    } else {
        Some(with_query_param(&with_limit, "offset", Some(offset - limit)))
    };

    Page {
        count: listing.count,
        next,
        previous,
        results: listing.items,
    }
}
