//! Shared constants for board validation and limits.
//!
//! These constants are used by both the library and the server binary to
//! keep validation consistent across every entry point.

// =============================================================================
// Content Size Limits
// =============================================================================

/// Maximum post title size (512 bytes).
pub const MAX_TITLE_SIZE: usize = 512;

/// Maximum post description size (10KB).
pub const MAX_DESCRIPTION_SIZE: usize = 10 * 1024;

/// Maximum picture URL size (2KB).
pub const MAX_PICTURE_URL_SIZE: usize = 2 * 1024;

/// Maximum username size (256 bytes).
pub const MAX_USERNAME_SIZE: usize = 256;

/// Maximum comment body size (100KB).
pub const MAX_COMMENT_BODY_SIZE: usize = 100 * 1024;

/// Maximum number of tags per post.
pub const MAX_TAGS_COUNT: usize = 10;

/// Maximum length of a single tag (64 bytes).
pub const MAX_TAG_SIZE: usize = 64;

// =============================================================================
// Listing Limits
// =============================================================================

/// Page size used when the caller does not supply one.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Maximum page size a caller may request; larger values are clamped.
pub const MAX_PAGE_SIZE: usize = 100;

// =============================================================================
// Global Resource Limits
// =============================================================================

/// Maximum number of posts held by one board.
pub const MAX_POSTS: usize = 100_000;

/// Maximum number of comments per post (includes all reply depths).
pub const MAX_COMMENTS_PER_POST: usize = 100_000;
