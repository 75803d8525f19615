use serde::Serialize;
use std::future::Future;

use crate::database::cursor::{decode_cursor, encode_cursor, CursorKey};

/// One page of a keyset-paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

impl<T> PaginatedResult<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
            has_more: false,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResult<U> {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
            has_more: self.has_more,
        }
    }
}

/// Rows that can be paginated by `(created_at DESC, id DESC)`.
pub trait Keyset {
    fn cursor_key(&self) -> CursorKey;
}

/// A validated, strictly positive page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimit(u32);

impl PageLimit {
    pub fn new(raw: i64) -> Option<Self> {
        u32::try_from(raw).ok().filter(|n| *n > 0).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

/// Runs one keyset page fetch.
///
/// `fetch(after, take)` must return rows strictly after `after` (when present)
/// in `(created_at DESC, id DESC)` order, at most `take` of them. One extra row
/// is requested to learn whether another page exists. An invalid limit yields an
/// empty page without calling `fetch`.
pub async fn paginate<T, E, F, Fut>(
    limit: Option<PageLimit>,
    cursor: Option<&str>,
    fetch: F,
) -> Result<PaginatedResult<T>, E>
where
    T: Keyset,
    F: FnOnce(Option<CursorKey>, i64) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
{
    let Some(limit) = limit else {
        return Ok(PaginatedResult::empty());
    };
    let limit = limit.get() as usize;

    let after = decode_cursor(cursor);
    let mut rows = fetch(after, limit as i64 + 1).await?;

    let has_more = rows.len() > limit;
    rows.truncate(limit);

    let next_cursor = if has_more {
        rows.last().map(|last| encode_cursor(&last.cursor_key()))
    } else {
        None
    };

    Ok(PaginatedResult {
        has_more: next_cursor.is_some(),
        items: rows,
        next_cursor,
    })
}
