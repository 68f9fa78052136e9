//! Comments: reply entities forming a forest under each post.
//!
//! A comment points at its owning post and optionally at a parent comment.
//! The reply relation is never stored on the comment itself; the owning
//! state maintains a children index and materializes nested
//! [`CommentNode`] trees on demand.

use crate::board::current_timestamp_millis;
use crate::board::validation::{validate_comment_body, validate_username};
use crate::board::votes::{VoteKind, VoteLedger, VoteOutcome};
use crate::board::PostId;
use crate::error::{Result, SoapboxError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque unique identifier of a comment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CommentId(Uuid);

impl CommentId {
    /// Generates a fresh random id.
    pub fn generate() -> Self {
        CommentId(Uuid::new_v4())
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CommentId {
    type Err = SoapboxError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(CommentId)
            .map_err(|_| SoapboxError::validation(format!("'{}' is not a valid comment id", s)))
    }
}

/// The caller-supplied fields of a new comment.
#[derive(Debug, Clone)]
pub struct CommentDraft {
    pub post_id: PostId,
    pub author: String,
    pub body: String,
    /// `None` makes this a root comment attached directly to the post.
    pub parent_id: Option<CommentId>,
}

/// A single comment with its embedded vote ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author: String,
    pub body: String,
    pub parent_id: Option<CommentId>,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
    /// Insertion sequence assigned by the owning state; fixes sibling
    /// order (oldest first), including across restarts.
    pub seq: u64,
    pub votes: VoteLedger,
}

impl Comment {
    /// Validates the draft and builds a comment.
    ///
    /// Referential checks (the post exists, the parent exists and belongs
    /// to the same post) are the owning state's job.
    pub fn new(draft: CommentDraft, seq: u64) -> Result<Self> {
        validate_username(&draft.author)?;
        validate_comment_body(&draft.body)?;

        Ok(Comment {
            id: CommentId::generate(),
            post_id: draft.post_id,
            author: draft.author,
            body: draft.body,
            parent_id: draft.parent_id,
            created_at: current_timestamp_millis(),
            seq,
            votes: VoteLedger::new(),
        })
    }

    /// True if this comment sits directly under its post.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Derived score: |upvotes| - |downvotes|.
    pub fn score(&self) -> i64 {
        self.votes.score()
    }

    /// Fails with an authorization error unless `username` wrote this comment.
    pub fn ensure_author(&self, username: &str) -> Result<()> {
        if self.author != username {
            return Err(SoapboxError::authorization(
                "only the author can modify this comment",
            ));
        }
        Ok(())
    }

    /// Replaces the body after validating the new text.
    pub fn set_body(&mut self, body: &str) -> Result<()> {
        validate_comment_body(body)?;
        self.body = body.to_string();
        Ok(())
    }

    /// Applies one vote by `username`.
    pub fn apply_vote(&mut self, username: &str, kind: VoteKind) -> Result<VoteOutcome> {
        validate_username(username)?;
        Ok(self.votes.apply(username, kind))
    }
}

/// A comment with its nested replies, as produced by tree assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentNode {
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    /// Total number of comments in this subtree, including the root.
    pub fn subtree_len(&self) -> usize {
        1 + self.replies.iter().map(CommentNode::subtree_len).sum::<usize>()
    }
}
