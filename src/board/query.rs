//! Listing queries: filters and pagination over the post collection.

use crate::board::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::board::post::Post;

/// Optional filters for listing posts. All present fields must match.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    /// Matches posts carrying this exact tag.
    pub category: Option<String>,
    /// Matches posts written by this author.
    pub username: Option<String>,
    /// Case-insensitive substring match over title and description.
    pub search_term: Option<String>,
}

impl PostFilter {
    /// Returns true if no filter is set (every post matches).
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.username.is_none() && self.effective_search().is_none()
    }

    /// The search term with surrounding whitespace removed; blank terms
    /// are treated as absent rather than matching nothing.
    fn effective_search(&self) -> Option<&str> {
        self.search_term
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }

    /// Whether `post` satisfies every set filter.
    pub fn matches(&self, post: &Post) -> bool {
        if let Some(category) = &self.category {
            if !post.tags.iter().any(|tag| tag == category) {
                return false;
            }
        }
        if let Some(username) = &self.username {
            if &post.author != username {
                return false;
            }
        }
        if let Some(term) = self.effective_search() {
            let needle = term.to_lowercase();
            let in_title = post.title.to_lowercase().contains(&needle);
            let in_description = post.description.to_lowercase().contains(&needle);
            if !in_title && !in_description {
                return false;
            }
        }
        true
    }
}

/// A pagination request. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    /// Builds a request, clamping out-of-range values: page floors at 1,
    /// page size is capped at [`MAX_PAGE_SIZE`] and a zero size falls back
    /// to [`DEFAULT_PAGE_SIZE`].
    pub fn new(page: usize, page_size: usize) -> Self {
        let page = page.max(1);
        let page_size = if page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size.min(MAX_PAGE_SIZE)
        };
        PageRequest { page, page_size }
    }

    /// Index of the first item on this page.
    pub fn offset(&self) -> usize {
        (self.page - 1) * self.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::new(1, DEFAULT_PAGE_SIZE)
    }
}

/// One page of listing results.
#[derive(Debug, Clone)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub page: usize,
    pub page_size: usize,
    /// Number of posts matching the filter across all pages.
    pub total_posts: usize,
    pub total_pages: usize,
}
