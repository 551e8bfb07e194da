//! Lazy traversal of page-numbered listing endpoints
//!
//! [`paginate`] turns a page-fetch function into a stream of items. The
//! traversal is driven by an explicit cursor and starts at page 1 on every
//! call. A fetch error is yielded once and ends the stream; nothing here
//! retries.

use futures::Stream;
use futures::stream;
use std::collections::VecDeque;
use std::future::Future;
use tracing::{debug, warn};

use crate::error::Result;

/// First page of every listing
pub const FIRST_PAGE: u32 = 1;

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Page to fetch next; `None` (or 0) when this was the last page
    pub next_page: Option<u32>,
}

impl<T> Page<T> {
    /// Builds a page from a raw next-page marker where 0 means "no more"
    pub fn new(items: Vec<T>, next_page: u32) -> Self {
        Self {
            items,
            next_page: (next_page != 0).then_some(next_page),
        }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_page: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Page(u32),
    Done,
}

struct Traversal<T, F> {
    fetch: F,
    cursor: Cursor,
    buffered: VecDeque<T>,
}

/// Streams every item of every page, in page order
///
/// Dropping the stream stops the traversal without fetching further pages.
pub fn paginate<T, F, Fut>(fetch: F) -> impl Stream<Item = Result<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let traversal = Traversal {
        fetch,
        cursor: Cursor::Page(FIRST_PAGE),
        buffered: VecDeque::new(),
    };

    stream::unfold(traversal, |mut traversal| async move {
        loop {
            if let Some(item) = traversal.buffered.pop_front() {
                return Some((Ok(item), traversal));
            }

            let page = match traversal.cursor {
                Cursor::Page(page) => page,
                Cursor::Done => return None,
            };

            match (traversal.fetch)(page).await {
                Ok(Page { items, next_page }) => {
                    debug!(page, items = items.len(), ?next_page, "Fetched page");
                    traversal.cursor = advance(page, next_page);
                    traversal.buffered.extend(items);
                }
                Err(e) => {
                    traversal.cursor = Cursor::Done;
                    return Some((Err(e), traversal));
                }
            }
        }
    })
}

fn advance(current: u32, next_page: Option<u32>) -> Cursor {
    match next_page {
        Some(0) | None => Cursor::Done,
        Some(next) if next <= current => {
            warn!(current, next, "Listing pointed back to an earlier page, stopping");
            Cursor::Done
        }
        Some(next) => Cursor::Page(next),
    }
}

/// Extracts the `rel="next"` page number from a GitHub `Link` header
///
/// `<https://api.github.com/...?page=2>; rel="next", <...?page=5>; rel="last"`
pub fn next_page_from_link(header: &str) -> Option<u32> {
    header.split(',').find_map(|link| {
        let mut parts = link.split(';');
        let target = parts
            .next()?
            .trim()
            .trim_start_matches('<')
            .trim_end_matches('>');

        if !parts.any(|p| p.trim() == "rel=\"next\"") {
            return None;
        }

        let (_, query) = target.split_once('?')?;
        query.split('&').find_map(|pair| match pair.split_once('=') {
            Some(("page", value)) => value.parse().ok(),
            _ => None,
        })
    })
}
