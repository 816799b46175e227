//! Cursor pagination primitives.

use serde::{Deserialize, Serialize};

/// Opaque, server-issued page token.
///
/// Only ever obtained from a response and passed back verbatim. It cannot
/// be built from parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Direction-tagged cursor threaded into an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageCursor {
    Next(Cursor),
    Previous(Cursor),
}

impl PageCursor {
    /// Query parameter name carrying this cursor.
    pub fn param_name(&self) -> &'static str {
        match self {
            PageCursor::Next(_) => "next",
            PageCursor::Previous(_) => "previous",
        }
    }

    pub fn cursor(&self) -> &Cursor {
        match self {
            PageCursor::Next(c) | PageCursor::Previous(c) => c,
        }
    }
}

/// One page of results plus the cursors to its neighbours.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<Cursor>,
    pub previous: Option<Cursor>,
    pub total: Option<u64>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            next: None,
            previous: None,
            total: None,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next: self.next,
            previous: self.previous,
            total: self.total,
        }
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
