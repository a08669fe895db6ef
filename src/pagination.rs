//! `?limit=&offset=` pagination with `{count, next, previous, results}` envelopes.

use actix_web::HttpRequest;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub limit: i64,
    pub offset: i64,
}

impl PageParams {
    pub fn window(&self, default_limit: i64) -> Window {
        Window {
            limit: self.limit.filter(|&l| l > 0).unwrap_or(default_limit),
            offset: self.offset.unwrap_or(0).max(0),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(req: &HttpRequest, window: Window, count: i64, results: Vec<T>) -> Self {
        let end = window.offset.saturating_add(window.limit);
        let next = (end < count).then(|| page_link(req, window.limit, Some(end))).flatten();
        let previous = if window.offset <= 0 {
            None
        } else if window.offset - window.limit <= 0 {
            page_link(req, window.limit, None)
        } else {
            page_link(req, window.limit, Some(window.offset - window.limit))
        };

        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

fn page_link(req: &HttpRequest, limit: i64, offset: Option<i64>) -> Option<String> {
    let info = req.connection_info();
    let mut url = Url::parse(&format!("{}://{}{}", info.scheme(), info.host(), req.uri())).ok()?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "limit" && key != "offset")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    {
        let mut query = url.query_pairs_mut();
        query.clear();
        query.extend_pairs(kept);
        query.append_pair("limit", &limit.to_string());
        if let Some(offset) = offset {
            query.append_pair("offset", &offset.to_string());
        }
    }

    Some(url.into())
}
