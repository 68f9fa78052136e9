//! Wire types shared by the HTTP server and the sync client.
//!
//! Every response is wrapped in [`ApiEnvelope`]: success bodies carry
//! `{"isSuccess": true, "data": ...}` and failures carry
//! `{"isError": true, "msg": ..., "code": ...}`. The two shapes never mix,
//! which is why every envelope field is optional and skipped when unset.
//!
//! Entity payloads use the board's public field names (`username`,
//! `createdAt`, and for comments the legacy `name`/`comments` pair), not
//! the internal struct names.

use crate::board::comment::{Comment, CommentId, CommentNode};
use crate::board::post::{Post, PostId};
use crate::board::query::{PageRequest, PostFilter, PostPage};
use crate::board::votes::VoteKind;
use crate::error::SoapboxError;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Error codes
// =============================================================================

/// Machine-readable failure category carried in error envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
    #[serde(rename = "NOT_FOUND")]
    NotFound,
    #[serde(rename = "AUTHORIZATION_ERROR")]
    Authorization,
    #[serde(rename = "CONFLICT")]
    Conflict,
    #[serde(rename = "UNAUTHENTICATED")]
    Unauthenticated,
    #[serde(rename = "RATE_LIMITED")]
    RateLimited,
    #[serde(rename = "SERVER_ERROR")]
    Server,
}

impl ErrorCode {
    /// The HTTP status this code travels with.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::Validation => 400,
            ErrorCode::Unauthenticated => 401,
            ErrorCode::Authorization => 403,
            ErrorCode::NotFound => 404,
            ErrorCode::Conflict => 409,
            ErrorCode::RateLimited => 429,
            ErrorCode::Server => 500,
        }
    }

    /// The wire spelling of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Validation => "VALIDATION_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Authorization => "AUTHORIZATION_ERROR",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::Unauthenticated => "UNAUTHENTICATED",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::Server => "SERVER_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&SoapboxError> for ErrorCode {
    fn from(error: &SoapboxError) -> Self {
        match error {
            SoapboxError::Validation(_) => ErrorCode::Validation,
            SoapboxError::NotFound(_) => ErrorCode::NotFound,
            SoapboxError::Authorization(_) => ErrorCode::Authorization,
            SoapboxError::Conflict(_) => ErrorCode::Conflict,
            SoapboxError::Unauthenticated(_) => ErrorCode::Unauthenticated,
            SoapboxError::Storage(_) | SoapboxError::Serialization(_) | SoapboxError::Io(_) => {
                ErrorCode::Server
            }
        }
    }
}

// =============================================================================
// Response envelope
// =============================================================================

/// The one wrapper every endpoint responds with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(rename = "isSuccess", skip_serializing_if = "Option::is_none")]
    pub is_success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl<T> ApiEnvelope<T> {
    /// A success envelope wrapping `data`.
    pub fn success(data: T) -> Self {
        ApiEnvelope {
            is_success: Some(true),
            data: Some(data),
            is_error: None,
            msg: None,
            code: None,
        }
    }

    /// A failure envelope with a code and a user-facing message.
    pub fn failure<M: Into<String>>(code: ErrorCode, msg: M) -> Self {
        ApiEnvelope {
            is_success: None,
            data: None,
            is_error: Some(true),
            msg: Some(msg.into()),
            code: Some(code),
        }
    }
}

// =============================================================================
// Entity payloads
// =============================================================================

fn sorted_usernames(set: &std::collections::HashSet<String>) -> Vec<String> {
    let mut names: Vec<String> = set.iter().cloned().collect();
    names.sort();
    names
}

/// A post as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostData {
    pub id: PostId,
    pub title: String,
    pub description: String,
    pub picture: String,
    pub username: String,
    pub tags: Vec<String>,
    pub created_at: u64,
    /// Sorted for a deterministic wire shape.
    pub upvotes: Vec<String>,
    pub downvotes: Vec<String>,
    pub score: i64,
}

impl From<&Post> for PostData {
    fn from(post: &Post) -> Self {
        PostData {
            id: post.id,
            title: post.title.clone(),
            description: post.description.clone(),
            picture: post.picture.clone(),
            username: post.author.clone(),
            tags: post.tags.clone(),
            created_at: post.created_at,
            upvotes: sorted_usernames(post.votes.upvotes()),
            downvotes: sorted_usernames(post.votes.downvotes()),
            score: post.score(),
        }
    }
}

/// A comment as it appears on the wire.
///
/// `name` is the author and `comments` is the body text; `parentId` is
/// always present and null for root comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentData {
    pub id: CommentId,
    pub post_id: PostId,
    pub name: String,
    pub comments: String,
    pub parent_id: Option<CommentId>,
    pub created_at: u64,
    pub upvotes: Vec<String>,
    pub downvotes: Vec<String>,
    pub score: i64,
    /// Direct replies, oldest first. Flat endpoints leave this empty.
    #[serde(default)]
    pub replies: Vec<CommentData>,
}

impl CommentData {
    fn base(comment: &Comment, replies: Vec<CommentData>) -> Self {
        CommentData {
            id: comment.id,
            post_id: comment.post_id,
            name: comment.author.clone(),
            comments: comment.body.clone(),
            parent_id: comment.parent_id,
            created_at: comment.created_at,
            upvotes: sorted_usernames(comment.votes.upvotes()),
            downvotes: sorted_usernames(comment.votes.downvotes()),
            score: comment.score(),
            replies,
        }
    }

    /// Converts a tree node, nesting its replies recursively.
    pub fn from_node(node: &CommentNode) -> Self {
        let replies = node.replies.iter().map(CommentData::from_node).collect();
        CommentData::base(&node.comment, replies)
    }
}

impl From<&Comment> for CommentData {
    fn from(comment: &Comment) -> Self {
        CommentData::base(comment, Vec::new())
    }
}

/// One page of a post listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPageData {
    pub posts: Vec<PostData>,
    pub page: usize,
    pub page_size: usize,
    pub total_posts: usize,
    pub total_pages: usize,
}

impl From<&PostPage> for PostPageData {
    fn from(page: &PostPage) -> Self {
        PostPageData {
            posts: page.posts.iter().map(PostData::from).collect(),
            page: page.page,
            page_size: page.page_size,
            total_posts: page.total_posts,
            total_pages: page.total_pages,
        }
    }
}

/// Confirmation payload for a post deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDeleteData {
    pub deleted: bool,
    /// Comments removed by the cascade.
    pub removed_comments: usize,
}

/// Confirmation payload for a comment deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDeleteData {
    pub deleted: bool,
    /// Descendants removed alongside the comment itself.
    pub removed_replies: usize,
}

/// Server health probe payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthData {
    pub status: String,
    pub version: String,
}

// =============================================================================
// Request bodies
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub picture: String,
    pub username: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePostRequest {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRequest {
    pub username: String,
    #[serde(rename = "voteType")]
    pub vote_type: VoteKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub post_id: PostId,
    /// Author username.
    pub name: String,
    /// Comment body text.
    pub comments: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCommentRequest {
    pub name: String,
    pub comments: String,
}

/// Identity for a post deletion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletePostRequest {
    pub username: String,
}

/// Identity for a comment deletion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteCommentRequest {
    pub name: String,
}

// =============================================================================
// Session bodies
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequest {
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub username: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

// =============================================================================
// Listing parameters
// =============================================================================

fn default_page() -> usize {
    1
}

/// Query parameters accepted by the listing and search endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPostsParams {
    #[serde(default = "default_page")]
    pub page: usize,
    /// Zero means the server default.
    #[serde(default)]
    pub page_size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_term: Option<String>,
}

impl Default for ListPostsParams {
    fn default() -> Self {
        ListPostsParams {
            page: 1,
            page_size: 0,
            category: None,
            username: None,
            search_term: None,
        }
    }
}

impl ListPostsParams {
    /// The board filter these parameters describe.
    pub fn to_filter(&self) -> PostFilter {
        PostFilter {
            category: self.category.clone(),
            username: self.username.clone(),
            search_term: self.search_term.clone(),
        }
    }

    /// The page request these parameters describe, clamped to server limits.
    pub fn to_page(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }

    /// URL query pairs in a fixed order, for clients and cache keys.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("page".to_string(), self.page.to_string())];
        if self.page_size > 0 {
            pairs.push(("pageSize".to_string(), self.page_size.to_string()));
        }
        if let Some(category) = &self.category {
            pairs.push(("category".to_string(), category.clone()));
        }
        if let Some(username) = &self.username {
            pairs.push(("username".to_string(), username.clone()));
        }
        if let Some(term) = &self.search_term {
            pairs.push(("searchTerm".to_string(), term.clone()));
        }
        pairs
    }
}
