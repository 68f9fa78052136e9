//! Board domain: posts, threaded comments, and vote ledgers.
//!
//! [`BoardState`] owns every entity and index; the submodules hold the
//! entity types and their validation rules. All mutations go through
//! `BoardState` so the indexes never drift from the entity maps.

pub mod comment;
pub mod constants;
pub mod post;
pub mod query;
pub mod state;
pub mod validation;
pub mod votes;

pub use comment::{Comment, CommentDraft, CommentId, CommentNode};
pub use post::{Post, PostDraft, PostId, PostUpdate};
pub use query::{PageRequest, PostFilter, PostPage};
pub use state::{BoardState, CommentRemoval};
pub use votes::{VoteKind, VoteLedger, VoteOutcome};

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, saturating to zero on clock skew.
pub fn current_timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
