//! Pure pieces of the paginated request engine.
//!
//! The network side lives in [`crate::canvas::client`]; this module holds the
//! parts that can be reasoned about without a server:
//!   - joining the configured base URL with a relative resource path
//!   - reading the `next` relation out of a `Link` header
//!   - accumulating page bodies and deciding whether the caller gets a single
//!     entity or a collection back
//!
//! # Single vs collection
//! Canvas endpoints return either one JSON object or a JSON array, and list
//! endpoints spread the array across pages. Callers bind to one of the two
//! shapes, so the decision is made once from the *first* page:
//!   - first page was an object and exactly one element was accumulated:
//!     [`Payload::One`]
//!   - anything else: [`Payload::Many`], in page order
//!
//! A later page can never turn a collection into a single entity or back.

use crate::error::CanvasError;

/// Joins `base` and `path` with exactly one `/` between them.
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

/// Extracts the URL carrying `rel="next"` from an RFC 8288 style `Link` header.
///
/// Entries look like `<https://host/path?page=2>; rel="next"`. Entries that do
/// not parse are skipped. Returns `None` when there is no next relation.
pub fn extract_next_url(link_header: &str) -> Option<String> {
    for entry in link_header.split(',') {
        let mut parts = entry.split(';');
        let Some(target) = parts.next() else {
            continue;
        };
        let target = target.trim();
        let Some(url) = target
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
        else {
            continue;
        };

        let is_next = parts.any(|param| {
            let Some((key, value)) = param.split_once('=') else {
                return false;
            };
            key.trim().eq_ignore_ascii_case("rel")
                && value
                    .trim()
                    .trim_matches(|c| c == '"' || c == '\'')
                    .split_whitespace()
                    .any(|rel| rel.eq_ignore_ascii_case("next"))
        });

        if is_next {
            let url = url.trim().trim_matches(|c| c == '"' || c == '\'');
            if !url.is_empty() {
                return Some(url.to_string());
            }
        }
    }
    None
}

/// Shape of a single page body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageShape {
    Single,
    Collection,
}

/// Caller-visible result of a paginated fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Payload<T> {
    /// Unwraps a single entity. A collection is a shape error even when it
    /// holds exactly one element.
    pub fn into_one(self) -> Result<T, CanvasError> {
        match self {
            Payload::One(value) => Ok(value),
            Payload::Many(_) => Err(CanvasError::Shape {
                expected: "a single entity",
            }),
        }
    }

    /// Returns the elements as a collection; a single entity becomes a
    /// one-element vector.
    pub fn into_many(self) -> Vec<T> {
        match self {
            Payload::One(value) => vec![value],
            Payload::Many(values) => values,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::One(_) => 1,
            Payload::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Applies the single-vs-collection rule to accumulated page elements.
pub fn normalize<T>(first_page: PageShape, mut items: Vec<T>) -> Payload<T> {
    if first_page == PageShape::Single && items.len() == 1 {
        if let Some(item) = items.pop() {
            return Payload::One(item);
        }
    }
    Payload::Many(items)
}

/// Running state of a paginated fetch.
#[derive(Debug)]
pub struct PageAccumulator<T> {
    first_shape: Option<PageShape>,
    items: Vec<T>,
    pages: usize,
}

impl<T> Default for PageAccumulator<T> {
    fn default() -> Self {
        Self {
            first_shape: None,
            items: Vec::new(),
            pages: 0,
        }
    }
}

impl<T> PageAccumulator<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a page that held a single object.
    pub fn push_single(&mut self, item: T) {
        self.record(PageShape::Single);
        self.items.push(item);
    }

    /// Appends every element of a page that held a collection.
    pub fn push_collection(&mut self, items: impl IntoIterator<Item = T>) {
        self.record(PageShape::Collection);
        self.items.extend(items);
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Finishes the fetch. With no pages at all the result is an empty collection.
    pub fn finish(self) -> Payload<T> {
        normalize(
            self.first_shape.unwrap_or(PageShape::Collection),
            self.items,
        )
    }

    fn record(&mut self, shape: PageShape) {
        if self.first_shape.is_none() {
            self.first_shape = Some(shape);
        }
        self.pages += 1;
    }
}
