//! Vote ledgers: per-entity upvote/downvote sets with a derived score.
//!
//! A ledger holds two disjoint username sets. Repeating a vote revokes it,
//! and voting the other way moves the user across in one step, so a user is
//! never present in both sets. The score is always derived from the sets at
//! read time; there is no separately maintained counter to drift.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// The two vote directions a user can cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Upvote,
    Downvote,
}

impl VoteKind {
    /// Returns the opposing direction.
    pub fn opposite(self) -> Self {
        match self {
            VoteKind::Upvote => VoteKind::Downvote,
            VoteKind::Downvote => VoteKind::Upvote,
        }
    }
}

impl fmt::Display for VoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteKind::Upvote => write!(f, "upvote"),
            VoteKind::Downvote => write!(f, "downvote"),
        }
    }
}

/// What applying a vote actually did, for logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The user had no standing vote; one was added.
    Cast,
    /// The user repeated their standing vote; it was removed.
    Revoked,
    /// The user had the opposite vote; it was moved across.
    Switched,
}

impl fmt::Display for VoteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteOutcome::Cast => write!(f, "cast"),
            VoteOutcome::Revoked => write!(f, "revoked"),
            VoteOutcome::Switched => write!(f, "switched"),
        }
    }
}

/// Upvote/downvote username sets embedded in every post and comment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteLedger {
    upvotes: HashSet<String>,
    downvotes: HashSet<String>,
}

impl VoteLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one vote by `username` in direction `kind`.
    ///
    /// Repeating the standing vote revokes it; voting the other way moves
    /// the user between the sets. Both membership mutations happen inside
    /// this single call, which the owning state serializes under its write
    /// lock, so the disjointness invariant cannot be observed broken.
    pub fn apply(&mut self, username: &str, kind: VoteKind) -> VoteOutcome {
        let (chosen, other) = match kind {
            VoteKind::Upvote => (&mut self.upvotes, &mut self.downvotes),
            VoteKind::Downvote => (&mut self.downvotes, &mut self.upvotes),
        };

        if chosen.remove(username) {
            VoteOutcome::Revoked
        } else if other.remove(username) {
            chosen.insert(username.to_string());
            VoteOutcome::Switched
        } else {
            chosen.insert(username.to_string());
            VoteOutcome::Cast
        }
    }

    /// Score derived from the sets: |upvotes| - |downvotes|.
    pub fn score(&self) -> i64 {
        self.upvotes.len() as i64 - self.downvotes.len() as i64
    }

    /// Returns the direction of `username`'s standing vote, if any.
    pub fn current(&self, username: &str) -> Option<VoteKind> {
        if self.upvotes.contains(username) {
            Some(VoteKind::Upvote)
        } else if self.downvotes.contains(username) {
            Some(VoteKind::Downvote)
        } else {
            None
        }
    }

    /// The set of usernames that upvoted.
    pub fn upvotes(&self) -> &HashSet<String> {
        &self.upvotes
    }

    /// The set of usernames that downvoted.
    pub fn downvotes(&self) -> &HashSet<String> {
        &self.downvotes
    }

    /// Total number of standing votes in either direction.
    pub fn total_votes(&self) -> usize {
        self.upvotes.len() + self.downvotes.len()
    }
}
