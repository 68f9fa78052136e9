//! Shared server state: the in-memory board plus its optional disk mirror.
//!
//! Mutations commit to memory first under the board lock (votes stay a
//! single atomic set update that way), then mirror to disk outside the
//! lock. A failed mirror write surfaces as a storage error even though
//! memory already moved on; the entity is mirrored again on its next
//! write, so the disk copy converges.

use crate::auth::TokenStore;
use crate::persistence::BoardPersistence;
use soapbox::board::{
    BoardState, Comment, CommentDraft, CommentId, CommentNode, CommentRemoval, PageRequest, Post,
    PostDraft, PostFilter, PostId, PostPage, PostUpdate, VoteKind,
};
use soapbox::Result;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;

/// Board state with write-through persistence.
#[derive(Debug)]
pub struct PersistentBoard {
    state: RwLock<BoardState>,
    store: Option<BoardPersistence>,
}

impl PersistentBoard {
    /// A board that lives only as long as the process.
    pub fn in_memory() -> Self {
        PersistentBoard {
            state: RwLock::new(BoardState::new()),
            store: None,
        }
    }

    /// Opens the store at `path` and reloads the board from it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let store = BoardPersistence::open(path)?;
        let mut state = BoardState::new();
        store.load_into(&mut state)?;
        Ok(PersistentBoard {
            state: RwLock::new(state),
            store: Some(store),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, BoardState> {
        self.state.read().unwrap_or_else(|poisoned| {
            warn!("board state was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, BoardState> {
        self.state.write().unwrap_or_else(|poisoned| {
            warn!("board state was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    // =========================================================================
    // Posts
    // =========================================================================

    pub fn create_post(&self, draft: PostDraft) -> Result<Post> {
        let post = self.write().create_post(draft)?;
        self.mirror_post(&post)?;
        Ok(post)
    }

    pub fn post(&self, id: &PostId) -> Result<Post> {
        Ok(self.read().post(id)?.clone())
    }

    pub fn update_post(&self, id: &PostId, username: &str, update: PostUpdate) -> Result<Post> {
        let post = self.write().update_post(id, username, update)?;
        self.mirror_post(&post)?;
        Ok(post)
    }

    pub fn delete_post(&self, id: &PostId, username: &str) -> Result<usize> {
        let removed = self.write().delete_post(id, username)?;
        if let Some(store) = &self.store {
            store.delete_post(id)?;
        }
        Ok(removed)
    }

    pub fn vote_post(&self, id: &PostId, username: &str, vote: VoteKind) -> Result<Post> {
        let post = self.write().vote_post(id, username, vote)?;
        self.mirror_post(&post)?;
        Ok(post)
    }

    pub fn list_posts(&self, filter: &PostFilter, page: PageRequest) -> PostPage {
        self.read().list_posts(filter, page)
    }

    // =========================================================================
    // Comments
    // =========================================================================

    pub fn create_comment(&self, draft: CommentDraft) -> Result<Comment> {
        let comment = self.write().create_comment(draft)?;
        self.mirror_comment(&comment)?;
        Ok(comment)
    }

    pub fn update_comment(&self, id: &CommentId, username: &str, body: &str) -> Result<Comment> {
        let comment = self.write().update_comment(id, username, body)?;
        self.mirror_comment(&comment)?;
        Ok(comment)
    }

    pub fn delete_comment(&self, id: &CommentId, username: &str) -> Result<CommentRemoval> {
        let removal = self.write().delete_comment(id, username)?;
        if let Some(store) = &self.store {
            for comment_id in &removal.removed {
                store.delete_comment(&removal.post_id, comment_id)?;
            }
        }
        Ok(removal)
    }

    pub fn vote_comment(&self, id: &CommentId, username: &str, vote: VoteKind) -> Result<Comment> {
        let comment = self.write().vote_comment(id, username, vote)?;
        self.mirror_comment(&comment)?;
        Ok(comment)
    }

    pub fn comment_tree(&self, post_id: &PostId) -> Result<Vec<CommentNode>> {
        self.read().comment_tree(post_id)
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    pub fn post_count(&self) -> usize {
        self.read().post_count()
    }

    pub fn comment_count(&self) -> usize {
        self.read().comment_count()
    }

    fn mirror_post(&self, post: &Post) -> Result<()> {
        if let Some(store) = &self.store {
            store.save_post(post)?;
        }
        Ok(())
    }

    fn mirror_comment(&self, comment: &Comment) -> Result<()> {
        if let Some(store) = &self.store {
            store.save_comment(comment)?;
        }
        Ok(())
    }
}

/// Everything a handler needs.
#[derive(Clone)]
pub struct AppState {
    pub board: Arc<PersistentBoard>,
    pub tokens: Arc<TokenStore>,
}
