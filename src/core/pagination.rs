//! Cursor-driven lazy pagination
//!
//! [`Paginated`] turns a "fetch one page for this cursor" function into an
//! iterator over the items of every page. Pages are fetched on demand, one
//! at a time, in an explicit loop; stopping early leaves the remaining pages
//! unfetched. The first error is yielded once and ends the sequence.

use crate::error::Result;
use std::mem;

/// One page of results plus the cursor of the following page
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T, C> {
    pub items: Vec<T>,
    pub next: Option<C>,
}

enum State<C> {
    Start,
    Next(C),
    Done,
}

/// Lazy iterator over every item of a paginated listing
pub struct Paginated<T, C, F> {
    fetch: F,
    buffer: std::vec::IntoIter<T>,
    state: State<C>,
    pages: usize,
}

impl<T, C, F> Paginated<T, C, F>
where
    F: FnMut(Option<C>) -> Result<Page<T, C>>,
{
    /// Start a listing; nothing is fetched until the first `next()`
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            buffer: Vec::new().into_iter(),
            state: State::Start,
            pages: 0,
        }
    }

    /// Number of pages fetched so far
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }
}

impl<T, C, F> Iterator for Paginated<T, C, F>
where
    F: FnMut(Option<C>) -> Result<Page<T, C>>,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.next() {
                return Some(Ok(item));
            }

            let cursor = match mem::replace(&mut self.state, State::Done) {
                State::Start => None,
                State::Next(cursor) => Some(cursor),
                State::Done => return None,
            };

            match (self.fetch)(cursor) {
                Ok(page) => {
                    self.pages += 1;
                    self.buffer = page.items.into_iter();
                    if let Some(next) = page.next {
                        self.state = State::Next(next);
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
