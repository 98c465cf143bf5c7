//! Paged, forward-only result sequence bound to a session.
//!
//! # Invariants
//! - Rows are fetched one page at a time while the caller iterates.
//! - Each page resumes after the last row handed out (keyset paging), so a
//!   row is yielded at most once even if the session writes in between.
//! - A cursor is consumed once; there is no rewind.
//! - After the first error the cursor yields nothing more.

use crate::repo::error::{CatalogError, CatalogResult};
use crate::session::SessionState;
use std::collections::VecDeque;
use std::fmt::{Debug, Formatter};
use std::rc::{Rc, Weak};

/// Fetches up to `limit` rows following the previous page.
pub(crate) type PageFetch<T> = Box<dyn FnMut(&Rc<SessionState>, u32) -> CatalogResult<Vec<T>>>;

/// Lazy query result. Yields `Err(SessionClosed)` if the session is closed
/// before the remaining pages are fetched.
pub struct Cursor<T> {
    session: Weak<SessionState>,
    fetch: PageFetch<T>,
    page_size: u32,
    fetched: u64,
    buffer: VecDeque<T>,
    exhausted: bool,
}

impl<T> Cursor<T> {
    pub(crate) fn new(session: &Rc<SessionState>, page_size: u32, fetch: PageFetch<T>) -> Self {
        Self {
            session: Rc::downgrade(session),
            fetch,
            page_size: page_size.max(1),
            fetched: 0,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// A cursor that yields nothing and never touches storage.
    pub(crate) fn empty() -> Self {
        Self {
            session: Weak::new(),
            fetch: Box::new(|_, _| Ok(Vec::new())),
            page_size: 1,
            fetched: 0,
            buffer: VecDeque::new(),
            exhausted: true,
        }
    }

    /// Fetches the first page so query errors surface at call time.
    pub(crate) fn prime(mut self) -> CatalogResult<Self> {
        self.fetch_page()?;
        Ok(self)
    }

    /// Number of rows fetched from storage so far.
    pub fn fetched(&self) -> u64 {
        self.fetched
    }

    fn fetch_page(&mut self) -> CatalogResult<()> {
        let session = self.session.upgrade().ok_or(CatalogError::SessionClosed)?;
        let page = (self.fetch)(&session, self.page_size)?;

        if page.len() < self.page_size as usize {
            self.exhausted = true;
        }
        self.fetched += page.len() as u64;
        self.buffer.extend(page);
        Ok(())
    }
}

impl<T> Iterator for Cursor<T> {
    type Item = CatalogResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(item) = self.buffer.pop_front() {
            return Some(Ok(item));
        }
        if self.exhausted {
            return None;
        }

        if let Err(err) = self.fetch_page() {
            self.exhausted = true;
            self.buffer.clear();
            return Some(Err(err));
        }
        self.buffer.pop_front().map(Ok)
    }
}

impl<T> std::iter::FusedIterator for Cursor<T> {}

impl<T> Debug for Cursor<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("page_size", &self.page_size)
            .field("fetched", &self.fetched)
            .field("buffered", &self.buffer.len())
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Cursor;

    #[test]
    fn empty_cursor_yields_nothing() {
        let mut cursor: Cursor<i64> = Cursor::empty();
        assert!(cursor.next().is_none());
        assert_eq!(cursor.fetched(), 0);
    }
}
