//! In-memory board state: flat entity maps plus the secondary indexes that
//! make listing, uniqueness checks, and tree assembly cheap.
//!
//! ## Index maintenance
//!
//! Every mutation keeps four indexes in sync with the entity maps:
//! - `titles`: normalized title -> post id, for O(1) uniqueness checks
//! - `post_comments`: post id -> comment ids in insertion order
//! - `comment_replies`: comment id -> direct reply ids in insertion order
//! - `next_seq`: monotonically increasing insertion sequence
//!
//! ## Tree assembly
//!
//! `comment_tree` materializes the nested reply forest in O(n) for a post
//! with n comments: one breadth-first pass over the children index yields
//! an order where parents precede children, and folding that order in
//! reverse builds every subtree before its parent needs it. No recursion,
//! so reply depth is limited by memory, not stack.

use crate::board::comment::{Comment, CommentDraft, CommentId, CommentNode};
use crate::board::constants::{MAX_COMMENTS_PER_POST, MAX_POSTS};
use crate::board::post::{title_key, Post, PostDraft, PostId, PostUpdate};
use crate::board::query::{PageRequest, PostFilter, PostPage};
use crate::board::votes::VoteKind;
use crate::error::{Result, SoapboxError};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// The result of deleting a comment: which records went away.
#[derive(Debug, Clone)]
pub struct CommentRemoval {
    /// The post the removed comments belonged to.
    pub post_id: PostId,
    /// The deleted comment followed by all of its descendants.
    pub removed: Vec<CommentId>,
}

/// All posts and comments of one board, with their lookup indexes.
#[derive(Debug, Default)]
pub struct BoardState {
    posts: HashMap<PostId, Post>,
    comments: HashMap<CommentId, Comment>,
    /// Normalized title -> owning post, for the global uniqueness rule.
    titles: HashMap<String, PostId>,
    /// Post -> all of its comments (any depth), insertion order.
    post_comments: HashMap<PostId, Vec<CommentId>>,
    /// Comment -> direct replies, insertion order.
    comment_replies: HashMap<CommentId, Vec<CommentId>>,
    next_seq: u64,
}

impl BoardState {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// Creates a post from a draft.
    ///
    /// Fails with a conflict error if another post already uses the same
    /// title (compared case-insensitively on the trimmed title), and with
    /// validation/unauthenticated errors per the field rules.
    pub fn create_post(&mut self, draft: PostDraft) -> Result<Post> {
        if self.posts.len() >= MAX_POSTS {
            return Err(SoapboxError::validation("post limit reached"));
        }

        let seq = self.take_seq();
        let post = Post::new(draft, seq)?;

        let key = post.title_key();
        if self.titles.contains_key(&key) {
            return Err(SoapboxError::conflict(format!(
                "a post titled '{}' already exists",
                post.title
            )));
        }

        self.titles.insert(key, post.id);
        self.post_comments.insert(post.id, Vec::new());
        self.posts.insert(post.id, post.clone());

        debug!(post_id = %post.id, author = %post.author, "post created");
        Ok(post)
    }

    /// Looks up a post by id.
    pub fn post(&self, id: &PostId) -> Result<&Post> {
        self.posts
            .get(id)
            .ok_or_else(|| SoapboxError::not_found(format!("post {} not found", id)))
    }

    /// Applies a partial update to a post. Author-only.
    pub fn update_post(&mut self, id: &PostId, username: &str, update: PostUpdate) -> Result<Post> {
        let post = self.post(id)?;
        post.ensure_author(username)?;
        let old_key = post.title_key();

        // A title change must not collide with any other post.
        let new_key = update.title.as_deref().map(title_key);
        if let Some(key) = &new_key {
            if key != &old_key && self.titles.contains_key(key) {
                return Err(SoapboxError::conflict(format!(
                    "a post titled '{}' already exists",
                    update.title.as_deref().unwrap_or_default()
                )));
            }
        }

        let post = self
            .posts
            .get_mut(id)
            .ok_or_else(|| SoapboxError::not_found(format!("post {} not found", id)))?;
        post.apply_update(update)?;
        let updated = post.clone();

        if let Some(key) = new_key {
            if key != old_key {
                self.titles.remove(&old_key);
                self.titles.insert(key, *id);
            }
        }

        debug!(post_id = %id, "post updated");
        Ok(updated)
    }

    /// Deletes a post and every comment under it. Author-only.
    ///
    /// Returns the number of comments removed by the cascade.
    pub fn delete_post(&mut self, id: &PostId, username: &str) -> Result<usize> {
        self.post(id)?.ensure_author(username)?;

        let Some(post) = self.posts.remove(id) else {
            return Err(SoapboxError::not_found(format!("post {} not found", id)));
        };
        self.titles.remove(&post.title_key());

        let comment_ids = self.post_comments.remove(id).unwrap_or_default();
        for comment_id in &comment_ids {
            self.comments.remove(comment_id);
            self.comment_replies.remove(comment_id);
        }

        debug!(
            post_id = %id,
            removed_comments = comment_ids.len(),
            "post deleted with comment cascade"
        );
        Ok(comment_ids.len())
    }

    /// Applies one vote to a post and returns the updated post.
    pub fn vote_post(&mut self, id: &PostId, username: &str, kind: VoteKind) -> Result<Post> {
        let post = self
            .posts
            .get_mut(id)
            .ok_or_else(|| SoapboxError::not_found(format!("post {} not found", id)))?;
        let outcome = post.apply_vote(username, kind)?;

        debug!(
            post_id = %id,
            voter = username,
            %kind,
            %outcome,
            score = post.score(),
            "post vote applied"
        );
        Ok(post.clone())
    }

    /// Lists posts matching `filter`, newest first, paginated.
    pub fn list_posts(&self, filter: &PostFilter, page: PageRequest) -> PostPage {
        let mut matched: Vec<&Post> = self.posts.values().filter(|p| filter.matches(p)).collect();
        matched.sort_by(|a, b| b.seq.cmp(&a.seq));

        let total_posts = matched.len();
        let total_pages = total_posts.div_ceil(page.page_size);
        let posts = matched
            .into_iter()
            .skip(page.offset())
            .take(page.page_size)
            .cloned()
            .collect();

        PostPage {
            posts,
            page: page.page,
            page_size: page.page_size,
            total_posts,
            total_pages,
        }
    }

    // =========================================================================
    // Comments
    // =========================================================================

    /// Creates a comment from a draft.
    ///
    /// An unknown post id is a validation failure (the caller referenced a
    /// container that does not exist); an unknown or cross-post parent is
    /// not-found.
    pub fn create_comment(&mut self, draft: CommentDraft) -> Result<Comment> {
        if !self.posts.contains_key(&draft.post_id) {
            return Err(SoapboxError::validation(format!(
                "post {} does not exist",
                draft.post_id
            )));
        }
        let existing = self
            .post_comments
            .get(&draft.post_id)
            .map(Vec::len)
            .unwrap_or(0);
        if existing >= MAX_COMMENTS_PER_POST {
            return Err(SoapboxError::validation("comment limit reached for this post"));
        }

        if let Some(parent_id) = &draft.parent_id {
            let parent = self.comments.get(parent_id).ok_or_else(|| {
                SoapboxError::not_found(format!("parent comment {} not found", parent_id))
            })?;
            if parent.post_id != draft.post_id {
                return Err(SoapboxError::not_found(format!(
                    "parent comment {} belongs to a different post",
                    parent_id
                )));
            }
        }

        let seq = self.take_seq();
        let comment = Comment::new(draft, seq)?;

        if let Some(list) = self.post_comments.get_mut(&comment.post_id) {
            list.push(comment.id);
        }
        if let Some(parent_id) = &comment.parent_id {
            self.comment_replies
                .entry(*parent_id)
                .or_default()
                .push(comment.id);
        }
        self.comment_replies.entry(comment.id).or_default();
        self.comments.insert(comment.id, comment.clone());

        debug!(
            comment_id = %comment.id,
            post_id = %comment.post_id,
            parent = ?comment.parent_id.map(|p| p.to_string()),
            author = %comment.author,
            "comment created"
        );
        Ok(comment)
    }

    /// Looks up a comment by id.
    pub fn comment(&self, id: &CommentId) -> Result<&Comment> {
        self.comments
            .get(id)
            .ok_or_else(|| SoapboxError::not_found(format!("comment {} not found", id)))
    }

    /// Replaces a comment's text. Author-only.
    pub fn update_comment(&mut self, id: &CommentId, username: &str, body: &str) -> Result<Comment> {
        let comment = self
            .comments
            .get_mut(id)
            .ok_or_else(|| SoapboxError::not_found(format!("comment {} not found", id)))?;
        comment.ensure_author(username)?;
        comment.set_body(body)?;

        debug!(comment_id = %id, "comment updated");
        Ok(comment.clone())
    }

    /// Deletes a comment and its whole reply subtree. Author-only.
    ///
    /// Replies are casualties of their ancestor regardless of who wrote
    /// them; only the root of the deletion needs to be owned by the caller.
    pub fn delete_comment(&mut self, id: &CommentId, username: &str) -> Result<CommentRemoval> {
        let (post_id, parent_id) = {
            let comment = self.comment(id)?;
            comment.ensure_author(username)?;
            (comment.post_id, comment.parent_id)
        };

        let removed = self.collect_subtree(id);
        for comment_id in &removed {
            self.comments.remove(comment_id);
            self.comment_replies.remove(comment_id);
        }

        let removed_lookup: HashSet<&CommentId> = removed.iter().collect();
        if let Some(list) = self.post_comments.get_mut(&post_id) {
            list.retain(|c| !removed_lookup.contains(c));
        }
        if let Some(parent_id) = parent_id {
            if let Some(siblings) = self.comment_replies.get_mut(&parent_id) {
                siblings.retain(|c| c != id);
            }
        }

        debug!(
            comment_id = %id,
            post_id = %post_id,
            removed = removed.len(),
            "comment deleted with reply cascade"
        );
        Ok(CommentRemoval { post_id, removed })
    }

    /// Applies one vote to a comment and returns the updated comment.
    pub fn vote_comment(
        &mut self,
        id: &CommentId,
        username: &str,
        kind: VoteKind,
    ) -> Result<Comment> {
        let comment = self
            .comments
            .get_mut(id)
            .ok_or_else(|| SoapboxError::not_found(format!("comment {} not found", id)))?;
        let outcome = comment.apply_vote(username, kind)?;

        debug!(
            comment_id = %id,
            voter = username,
            %kind,
            %outcome,
            score = comment.score(),
            "comment vote applied"
        );
        Ok(comment.clone())
    }

    /// The comment id plus all of its descendants, breadth-first.
    fn collect_subtree(&self, root: &CommentId) -> Vec<CommentId> {
        let mut collected = vec![*root];
        let mut cursor = 0;
        while cursor < collected.len() {
            let current = collected[cursor];
            cursor += 1;
            if let Some(children) = self.comment_replies.get(&current) {
                collected.extend(children.iter().copied());
            }
        }
        collected
    }

    /// Materializes the nested reply forest of a post.
    ///
    /// Root comments appear oldest first; so do siblings at every depth.
    pub fn comment_tree(&self, post_id: &PostId) -> Result<Vec<CommentNode>> {
        let ids = self
            .post_comments
            .get(post_id)
            .ok_or_else(|| SoapboxError::not_found(format!("post {} not found", post_id)))?;

        let roots: Vec<CommentId> = ids
            .iter()
            .filter(|id| self.comments.get(id).map_or(false, Comment::is_root))
            .copied()
            .collect();

        // Breadth-first order puts every parent before its children.
        let mut order: Vec<CommentId> = Vec::with_capacity(ids.len());
        let mut queue: VecDeque<CommentId> = roots.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            order.push(id);
            if let Some(children) = self.comment_replies.get(&id) {
                queue.extend(children.iter().copied());
            }
        }

        // Folding that order in reverse builds children before parents.
        let mut built: HashMap<CommentId, CommentNode> = HashMap::with_capacity(order.len());
        for id in order.iter().rev() {
            let replies = self
                .comment_replies
                .get(id)
                .map(|children| children.iter().filter_map(|c| built.remove(c)).collect())
                .unwrap_or_default();
            if let Some(comment) = self.comments.get(id) {
                built.insert(
                    *id,
                    CommentNode {
                        comment: comment.clone(),
                        replies,
                    },
                );
            }
        }

        Ok(roots.iter().filter_map(|r| built.remove(r)).collect())
    }

    // =========================================================================
    // Restore (persistence reload)
    // =========================================================================

    /// Re-inserts a persisted post, rebuilding its index entries.
    ///
    /// Restore feeds records in ascending `seq` order so insertion order
    /// is reproduced exactly.
    pub fn restore_post(&mut self, post: Post) -> Result<()> {
        if self.posts.contains_key(&post.id) {
            return Err(SoapboxError::validation(format!(
                "duplicate post id {}",
                post.id
            )));
        }
        let key = post.title_key();
        if self.titles.contains_key(&key) {
            return Err(SoapboxError::conflict(format!(
                "duplicate title '{}'",
                post.title
            )));
        }

        self.next_seq = self.next_seq.max(post.seq + 1);
        self.titles.insert(key, post.id);
        self.post_comments.insert(post.id, Vec::new());
        self.posts.insert(post.id, post);
        Ok(())
    }

    /// Re-inserts a persisted comment, rebuilding its index entries.
    ///
    /// Fails on comments whose post or parent is missing, or whose parent
    /// lives under a different post; the loader skips and counts those.
    pub fn restore_comment(&mut self, comment: Comment) -> Result<()> {
        if self.comments.contains_key(&comment.id) {
            return Err(SoapboxError::validation(format!(
                "duplicate comment id {}",
                comment.id
            )));
        }
        if !self.posts.contains_key(&comment.post_id) {
            return Err(SoapboxError::validation(format!(
                "comment {} references missing post {}",
                comment.id, comment.post_id
            )));
        }
        if let Some(parent_id) = &comment.parent_id {
            match self.comments.get(parent_id) {
                None => {
                    return Err(SoapboxError::validation(format!(
                        "comment {} references missing parent {}",
                        comment.id, parent_id
                    )));
                }
                Some(parent) if parent.post_id != comment.post_id => {
                    return Err(SoapboxError::validation(format!(
                        "comment {} parent belongs to a different post",
                        comment.id
                    )));
                }
                Some(_) => {}
            }
        }

        self.next_seq = self.next_seq.max(comment.seq + 1);
        if let Some(list) = self.post_comments.get_mut(&comment.post_id) {
            list.push(comment.id);
        }
        if let Some(parent_id) = &comment.parent_id {
            self.comment_replies
                .entry(*parent_id)
                .or_default()
                .push(comment.id);
        }
        self.comment_replies.entry(comment.id).or_default();
        self.comments.insert(comment.id, comment);
        Ok(())
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Number of posts on the board.
    pub fn post_count(&self) -> usize {
        self.posts.len()
    }

    /// Number of comments across all posts.
    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    /// Iterates over all posts in unspecified order.
    pub fn posts(&self) -> impl Iterator<Item = &Post> {
        self.posts.values()
    }

    /// Iterates over all comments in unspecified order.
    pub fn comments(&self) -> impl Iterator<Item = &Comment> {
        self.comments.values()
    }
}
