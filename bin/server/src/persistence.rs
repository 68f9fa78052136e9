//! Write-through persistence for board records.
//!
//! Posts and comments live in their own column families. Comment keys are
//! `{post_id}:{comment_id}` so a post deletion can drop its whole comment
//! set with one prefix delete.
//!
//! The in-memory state is authoritative: every committed mutation is
//! mirrored here afterwards, and on startup [`BoardPersistence::load_into`]
//! rebuilds the state by replaying records in insertion order. Records
//! that fail to decode or no longer resolve (orphaned comments) are
//! skipped and counted rather than blocking startup.

use soapbox::board::{BoardState, Comment, CommentId, Post, PostId};
use soapbox::storage::{composite_key, DbConfig, DbHandle};
use soapbox::{Result, SoapboxError};
use std::path::Path;
use tracing::{info, warn};

const CF_POSTS: &str = "posts";
const CF_COMMENTS: &str = "comments";
const CF_META: &str = "meta";

const FORMAT_VERSION: u32 = 1;
const FORMAT_VERSION_KEY: &[u8] = b"format_version";

/// What a reload brought back, and what it had to leave behind.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoadStats {
    pub posts: usize,
    pub comments: usize,
    pub skipped: usize,
}

/// RocksDB mirror of the board.
#[derive(Debug)]
pub struct BoardPersistence {
    db: DbHandle,
}

impl BoardPersistence {
    /// Opens (or creates) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = DbHandle::open(path, &DbConfig::default(), &[CF_POSTS, CF_COMMENTS, CF_META])?;
        let store = Self { db };
        store.check_format()?;
        Ok(store)
    }

    /// Refuses to touch data written by an incompatible format.
    fn check_format(&self) -> Result<()> {
        match self.db.get::<u32>(CF_META, FORMAT_VERSION_KEY)? {
            Some(version) if version == FORMAT_VERSION => Ok(()),
            Some(version) => Err(SoapboxError::storage(format!(
                "data directory uses format version {}, this build expects {}",
                version, FORMAT_VERSION
            ))),
            None => self.db.put(CF_META, FORMAT_VERSION_KEY, &FORMAT_VERSION),
        }
    }

    fn post_key(id: &PostId) -> Vec<u8> {
        id.to_string().into_bytes()
    }

    fn comment_key(post_id: &PostId, id: &CommentId) -> Vec<u8> {
        composite_key(post_id.to_string().as_bytes(), id.to_string().as_bytes())
    }

    fn comment_prefix(post_id: &PostId) -> Vec<u8> {
        let mut prefix = post_id.to_string().into_bytes();
        prefix.push(b':');
        prefix
    }

    /// Writes one post record.
    pub fn save_post(&self, post: &Post) -> Result<()> {
        self.db.put(CF_POSTS, &Self::post_key(&post.id), post)
    }

    /// Removes a post record and every comment record under it.
    pub fn delete_post(&self, id: &PostId) -> Result<usize> {
        self.db.delete(CF_POSTS, &Self::post_key(id))?;
        self.db.prefix_delete(CF_COMMENTS, &Self::comment_prefix(id))
    }

    /// Writes one comment record.
    pub fn save_comment(&self, comment: &Comment) -> Result<()> {
        self.db.put(
            CF_COMMENTS,
            &Self::comment_key(&comment.post_id, &comment.id),
            comment,
        )
    }

    /// Removes one comment record.
    pub fn delete_comment(&self, post_id: &PostId, id: &CommentId) -> Result<()> {
        self.db.delete(CF_COMMENTS, &Self::comment_key(post_id, id))
    }

    /// Replays every stored record into `state`.
    ///
    /// Posts load before comments, each sorted by insertion sequence so
    /// parents precede replies and ordering survives the restart.
    pub fn load_into(&self, state: &mut BoardState) -> Result<LoadStats> {
        let mut stats = LoadStats::default();

        let (mut posts, undecodable) = self.db.collect_all::<Post>(CF_POSTS)?;
        stats.skipped += undecodable;
        posts.sort_by_key(|p| p.seq);
        for post in posts {
            let id = post.id;
            match state.restore_post(post) {
                Ok(()) => stats.posts += 1,
                Err(e) => {
                    stats.skipped += 1;
                    warn!(post_id = %id, error = %e, "skipping stored post");
                }
            }
        }

        let (mut comments, undecodable) = self.db.collect_all::<Comment>(CF_COMMENTS)?;
        stats.skipped += undecodable;
        comments.sort_by_key(|c| c.seq);
        for comment in comments {
            let id = comment.id;
            match state.restore_comment(comment) {
                Ok(()) => stats.comments += 1,
                Err(e) => {
                    stats.skipped += 1;
                    warn!(comment_id = %id, error = %e, "skipping stored comment");
                }
            }
        }

        info!(
            posts = stats.posts,
            comments = stats.comments,
            skipped = stats.skipped,
            "board reloaded from disk"
        );
        Ok(stats)
    }
}
