//! Posts: the root entities of the board.
//!
//! A post owns its vote ledger and, through [`super::state::BoardState`],
//! a forest of comments. Construction validates every field against the
//! limits in [`super::constants`], so an instance that exists is in-bounds
//! by construction.

use crate::board::current_timestamp_millis;
use crate::board::validation::{
    validate_description, validate_picture, validate_tags, validate_title, validate_username,
};
use crate::board::votes::{VoteKind, VoteLedger, VoteOutcome};
use crate::error::{Result, SoapboxError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque unique identifier of a post.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PostId(Uuid);

impl PostId {
    /// Generates a fresh random id.
    pub fn generate() -> Self {
        PostId(Uuid::new_v4())
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PostId {
    type Err = SoapboxError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(PostId)
            .map_err(|_| SoapboxError::validation(format!("'{}' is not a valid post id", s)))
    }
}

/// The caller-supplied fields of a new post.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub description: String,
    pub picture: String,
    pub author: String,
    pub tags: Vec<String>,
}

/// A partial update to an existing post. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub picture: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl PostUpdate {
    /// Returns true if no field would change.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.picture.is_none()
            && self.tags.is_none()
    }
}

/// A board post with metadata and an embedded vote ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub description: String,
    pub picture: String,
    pub author: String,
    pub tags: Vec<String>,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
    /// Insertion sequence assigned by the owning state; orders listings
    /// deterministically, including across restarts.
    pub seq: u64,
    pub votes: VoteLedger,
}

/// Normalizes a title for the uniqueness index: trimmed and lowercased.
pub fn title_key(title: &str) -> String {
    title.trim().to_lowercase()
}

impl Post {
    /// Validates the draft and builds a post.
    ///
    /// `seq` is the insertion sequence assigned by the owning state.
    /// Title uniqueness is a board-level property and is checked by the
    /// state before the post is committed, not here.
    pub fn new(draft: PostDraft, seq: u64) -> Result<Self> {
        validate_username(&draft.author)?;
        validate_title(&draft.title)?;
        validate_description(&draft.description)?;
        validate_picture(&draft.picture)?;
        validate_tags(&draft.tags)?;

        Ok(Post {
            id: PostId::generate(),
            title: draft.title,
            description: draft.description,
            picture: draft.picture,
            author: draft.author,
            tags: draft.tags,
            created_at: current_timestamp_millis(),
            seq,
            votes: VoteLedger::new(),
        })
    }

    /// The uniqueness key of this post's title.
    pub fn title_key(&self) -> String {
        title_key(&self.title)
    }

    /// Derived score: |upvotes| - |downvotes|.
    pub fn score(&self) -> i64 {
        self.votes.score()
    }

    /// Fails with an authorization error unless `username` wrote this post.
    pub fn ensure_author(&self, username: &str) -> Result<()> {
        if self.author != username {
            return Err(SoapboxError::authorization(format!(
                "only the author can modify post '{}'",
                self.title
            )));
        }
        Ok(())
    }

    /// Applies one vote by `username`.
    pub fn apply_vote(&mut self, username: &str, kind: VoteKind) -> Result<VoteOutcome> {
        validate_username(username)?;
        Ok(self.votes.apply(username, kind))
    }

    /// Applies a partial update. All present fields are validated before
    /// any of them is written, so a failed update leaves the post intact.
    pub fn apply_update(&mut self, update: PostUpdate) -> Result<()> {
        if let Some(title) = &update.title {
            validate_title(title)?;
        }
        if let Some(description) = &update.description {
            validate_description(description)?;
        }
        if let Some(picture) = &update.picture {
            validate_picture(picture)?;
        }
        if let Some(tags) = &update.tags {
            validate_tags(tags)?;
        }

        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(picture) = update.picture {
            self.picture = picture;
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        Ok(())
    }
}
