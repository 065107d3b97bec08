//! Following Drive's `nextPageToken` chain.
//!
//! Listings are lenient: a failed page ends the walk and keeps what was
//! already fetched, flagged as truncated.

use crate::errors::{GoogleDriveError, GoogleDriveResult};
use std::collections::HashSet;
use std::future::Future;
use std::marker::PhantomData;
use tracing::warn;

/// One page of a Drive list call.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// Items, in server order.
    pub items: Vec<T>,
    /// Continuation token; `None` on the last page.
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    /// Assembles a page.
    pub fn new(items: Vec<T>, next_page_token: Option<String>) -> Self {
        Self {
            items,
            next_page_token,
        }
    }
}

/// Items gathered before pagination stopped.
#[derive(Debug)]
pub struct PartialCollection<T> {
    /// Items of every page fetched, in page order.
    pub items: Vec<T>,
    /// Number of pages fetched successfully.
    pub pages_fetched: usize,
    /// The failure that ended the walk, if any.
    pub error: Option<GoogleDriveError>,
    /// Set when the server handed out a token it had already returned.
    pub repeated_token: bool,
}

impl<T> PartialCollection<T> {
    /// Returns true if later pages may be missing.
    pub fn is_truncated(&self) -> bool {
        self.error.is_some() || self.repeated_token
    }
}

/// Walks pages through `fetch_fn`, which receives the token to resume from.
pub struct PageIterator<T, F, Fut>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = GoogleDriveResult<Page<T>>>,
{
    fetch_fn: F,
    next_token: Option<String>,
    seen_tokens: HashSet<String>,
    repeated_token: bool,
    done: bool,
    _marker: PhantomData<T>,
}

impl<T, F, Fut> PageIterator<T, F, Fut>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = GoogleDriveResult<Page<T>>>,
{
    /// Starts at the first page.
    pub fn new(fetch_fn: F) -> Self {
        Self {
            fetch_fn,
            next_token: None,
            seen_tokens: HashSet::new(),
            repeated_token: false,
            done: false,
            _marker: PhantomData,
        }
    }

    /// Fetches the next page of results.
    ///
    /// A token that was already followed ends iteration after the page
    /// that returned it.
    pub async fn next_page(&mut self) -> GoogleDriveResult<Option<Page<T>>> {
        if self.done {
            return Ok(None);
        }

        let page = match (self.fetch_fn)(self.next_token.clone()).await {
            Ok(page) => page,
            Err(e) => {
                self.done = true;
                return Err(e);
            }
        };

        match &page.next_page_token {
            Some(token) if self.seen_tokens.insert(token.clone()) => {
                self.next_token = Some(token.clone());
            }
            Some(token) => {
                warn!(page_token = %token, "Drive repeated a page token, stopping");
                self.repeated_token = true;
                self.done = true;
            }
            None => self.done = true,
        }

        Ok(Some(page))
    }

    /// Collects pages until the last one or the first failure.
    pub async fn collect_until_error(&mut self) -> PartialCollection<T> {
        let mut items = Vec::new();
        let mut pages_fetched = 0;
        let mut error = None;

        loop {
            match self.next_page().await {
                Ok(Some(page)) => {
                    pages_fetched += 1;
                    items.extend(page.items);
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(pages_fetched, error = %e, "Page fetch failed, returning partial results");
                    error = Some(e);
                    break;
                }
            }
        }

        PartialCollection {
            items,
            pages_fetched,
            error,
            repeated_token: self.repeated_token,
        }
    }
}
