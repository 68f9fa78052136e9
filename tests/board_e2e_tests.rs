//! End-to-end tests for the board library.
//!
//! These tests drive complete workflows through [`BoardState`] the way the
//! server does: posts, threaded comments, votes, listing, and the cascades
//! that tie them together.

use soapbox::board::{
    BoardState, CommentDraft, CommentId, CommentNode, PageRequest, PostDraft, PostFilter, PostId,
    PostUpdate, VoteKind,
};
use soapbox::SoapboxError;

/// Helper to build a post draft with sensible defaults.
fn draft_post(title: &str, author: &str, tags: &[&str]) -> PostDraft {
    PostDraft {
        title: title.to_string(),
        description: format!("All about {}", title),
        picture: String::new(),
        author: author.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

/// Helper to build a comment draft.
fn draft_comment(
    post_id: PostId,
    author: &str,
    body: &str,
    parent_id: Option<CommentId>,
) -> CommentDraft {
    CommentDraft {
        post_id,
        author: author.to_string(),
        body: body.to_string(),
        parent_id,
    }
}

/// Collects comment ids from a tree in depth-first order.
fn flatten_tree(nodes: &[CommentNode], into: &mut Vec<CommentId>) {
    for node in nodes {
        into.push(node.comment.id);
        flatten_tree(&node.replies, into);
    }
}

// =============================================================================
// Full Workflow Tests
// =============================================================================

/// Complete board workflow: posts -> comments -> votes -> edits -> deletion.
///
/// This test verifies the whole lifecycle end to end:
/// 1. Two users publish posts
/// 2. A comment thread grows under the first post
/// 3. Votes land on both posts and comments
/// 4. Authors edit their own content
/// 5. Deleting a comment cascades to its replies
/// 6. Deleting a post cascades to every remaining comment
#[test]
fn test_complete_board_workflow() {
    let mut board = BoardState::new();

    // =========================================================================
    // Step 1: Alice and Bob publish posts
    // =========================================================================
    let bread = board
        .create_post(draft_post("Sourdough starter diary", "alice", &["baking"]))
        .expect("Failed to create first post");
    let bikes = board
        .create_post(draft_post("Commuting by bike", "bob", &["cycling"]))
        .expect("Failed to create second post");

    assert_eq!(board.post_count(), 2);
    assert_eq!(bread.author, "alice");
    assert_eq!(bread.score(), 0);

    // Listing is newest first.
    let page = board.list_posts(&PostFilter::default(), PageRequest::default());
    assert_eq!(page.total_posts, 2);
    assert_eq!(page.posts[0].id, bikes.id);
    assert_eq!(page.posts[1].id, bread.id);

    // =========================================================================
    // Step 2: A thread grows under the bread post
    // =========================================================================
    let root = board
        .create_comment(draft_comment(bread.id, "bob", "Does rye work too?", None))
        .expect("Failed to create root comment");
    let reply = board
        .create_comment(draft_comment(
            bread.id,
            "alice",
            "Rye works, feed it more often.",
            Some(root.id),
        ))
        .expect("Failed to create reply");
    let nested = board
        .create_comment(draft_comment(
            bread.id,
            "carol",
            "Seconding the rye advice.",
            Some(reply.id),
        ))
        .expect("Failed to create nested reply");

    let tree = board.comment_tree(&bread.id).expect("Failed to build tree");
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].comment.id, root.id);
    assert_eq!(tree[0].replies[0].comment.id, reply.id);
    assert_eq!(tree[0].replies[0].replies[0].comment.id, nested.id);

    // The other post has no thread at all.
    assert!(board
        .comment_tree(&bikes.id)
        .expect("Failed to build empty tree")
        .is_empty());

    // =========================================================================
    // Step 3: Votes land on posts and comments
    // =========================================================================
    board
        .vote_post(&bread.id, "bob", VoteKind::Upvote)
        .expect("Failed to vote");
    board
        .vote_post(&bread.id, "carol", VoteKind::Upvote)
        .expect("Failed to vote");
    let bread_after = board
        .vote_post(&bread.id, "dave", VoteKind::Downvote)
        .expect("Failed to vote");
    assert_eq!(bread_after.score(), 1);
    assert_eq!(bread_after.votes.total_votes(), 3);

    let root_after = board
        .vote_comment(&root.id, "alice", VoteKind::Upvote)
        .expect("Failed to vote on comment");
    assert_eq!(root_after.score(), 1);

    // =========================================================================
    // Step 4: Authors edit their own content
    // =========================================================================
    let renamed = board
        .update_post(
            &bread.id,
            "alice",
            PostUpdate {
                description: Some("Week two: the starter lives.".to_string()),
                ..Default::default()
            },
        )
        .expect("Failed to update post");
    assert_eq!(renamed.description, "Week two: the starter lives.");
    // Votes survive an edit.
    assert_eq!(renamed.score(), 1);

    let rewritten = board
        .update_comment(&reply.id, "alice", "Rye works. Feed twice daily.")
        .expect("Failed to update comment");
    assert_eq!(rewritten.body, "Rye works. Feed twice daily.");

    // =========================================================================
    // Step 5: Deleting the reply cascades to its nested reply
    // =========================================================================
    let removal = board
        .delete_comment(&reply.id, "alice")
        .expect("Failed to delete comment");
    assert_eq!(removal.removed.len(), 2);
    assert!(removal.removed.contains(&reply.id));
    assert!(removal.removed.contains(&nested.id));

    let tree = board.comment_tree(&bread.id).expect("Failed to rebuild tree");
    assert_eq!(tree.len(), 1);
    assert!(tree[0].replies.is_empty());
    assert_eq!(board.comment_count(), 1);

    // =========================================================================
    // Step 6: Deleting the post removes the rest of the thread
    // =========================================================================
    let removed_comments = board
        .delete_post(&bread.id, "alice")
        .expect("Failed to delete post");
    assert_eq!(removed_comments, 1);
    assert_eq!(board.post_count(), 1);
    assert_eq!(board.comment_count(), 0);
    assert!(matches!(
        board.post(&bread.id),
        Err(SoapboxError::NotFound(_))
    ));
}

// =============================================================================
// Vote Ledger Invariant Tests
// =============================================================================

/// Runs a long scripted vote sequence and checks the ledger invariants
/// after every single step: a user is never in both sets, and the score
/// always equals upvotes minus downvotes.
#[test]
fn test_vote_ledger_invariants_hold_under_churn() {
    let mut board = BoardState::new();
    let post = board
        .create_post(draft_post("Vote churn target", "alice", &[]))
        .expect("Failed to create post");

    // Every transition appears at least once per user: fresh vote, repeat
    // (revoke), opposite (switch), and re-vote after a revoke.
    let script: Vec<(&str, VoteKind)> = vec![
        ("bob", VoteKind::Upvote),
        ("carol", VoteKind::Downvote),
        ("bob", VoteKind::Upvote),   // revoke
        ("bob", VoteKind::Downvote), // fresh again
        ("carol", VoteKind::Upvote), // switch
        ("dave", VoteKind::Upvote),
        ("erin", VoteKind::Downvote),
        ("dave", VoteKind::Downvote), // switch
        ("dave", VoteKind::Downvote), // revoke
        ("erin", VoteKind::Downvote), // revoke
        ("erin", VoteKind::Upvote),
        ("bob", VoteKind::Downvote), // revoke
        ("frank", VoteKind::Downvote),
        ("frank", VoteKind::Upvote), // switch
        ("carol", VoteKind::Upvote), // revoke
    ];

    for (step, (user, kind)) in script.iter().enumerate() {
        let updated = board
            .vote_post(&post.id, user, *kind)
            .expect("Failed to apply vote");

        let ups = updated.votes.upvotes();
        let downs = updated.votes.downvotes();
        assert!(
            ups.is_disjoint(downs),
            "step {}: {:?} appears in both sets",
            step,
            ups.intersection(downs).collect::<Vec<_>>()
        );
        assert_eq!(
            updated.score(),
            ups.len() as i64 - downs.len() as i64,
            "step {}: score drifted from set sizes",
            step
        );
    }

    // The script nets out to: carol none, bob down, dave none, erin up,
    // frank up.
    let final_post = board.post(&post.id).expect("Failed to fetch post");
    assert_eq!(final_post.votes.current("bob"), Some(VoteKind::Downvote));
    assert_eq!(final_post.votes.current("carol"), None);
    assert_eq!(final_post.votes.current("dave"), None);
    assert_eq!(final_post.votes.current("erin"), Some(VoteKind::Upvote));
    assert_eq!(final_post.votes.current("frank"), Some(VoteKind::Upvote));
    assert_eq!(final_post.score(), 1);
}

/// Many users voting on the same comment never corrupt each other's
/// entries.
#[test]
fn test_vote_ledger_scales_to_many_users() {
    let mut board = BoardState::new();
    let post = board
        .create_post(draft_post("Popular post", "alice", &[]))
        .expect("Failed to create post");
    let comment = board
        .create_comment(draft_comment(post.id, "bob", "hot take", None))
        .expect("Failed to create comment");

    for i in 0..200 {
        let user = format!("user{}", i);
        let kind = if i % 3 == 0 {
            VoteKind::Downvote
        } else {
            VoteKind::Upvote
        };
        board
            .vote_comment(&comment.id, &user, kind)
            .expect("Failed to vote");
    }

    let stored = board.comment(&comment.id).expect("Failed to fetch comment");
    // 0,3,..,198 -> 67 downvotes, the rest upvotes.
    assert_eq!(stored.votes.downvotes().len(), 67);
    assert_eq!(stored.votes.upvotes().len(), 133);
    assert_eq!(stored.score(), 133 - 67);
}

// =============================================================================
// Comment Tree Tests
// =============================================================================

/// Sibling order is stable (oldest first) at every level of the tree.
#[test]
fn test_sibling_order_is_oldest_first_at_every_level() {
    let mut board = BoardState::new();
    let post = board
        .create_post(draft_post("Discussion", "alice", &[]))
        .expect("Failed to create post");

    let mut roots = Vec::new();
    for i in 0..4 {
        let comment = board
            .create_comment(draft_comment(post.id, "bob", &format!("root {}", i), None))
            .expect("Failed to create root");
        roots.push(comment.id);
    }
    let mut replies = Vec::new();
    for i in 0..3 {
        let comment = board
            .create_comment(draft_comment(
                post.id,
                "carol",
                &format!("reply {}", i),
                Some(roots[1]),
            ))
            .expect("Failed to create reply");
        replies.push(comment.id);
    }

    let tree = board.comment_tree(&post.id).expect("Failed to build tree");
    let root_ids: Vec<CommentId> = tree.iter().map(|n| n.comment.id).collect();
    assert_eq!(root_ids, roots);

    let reply_ids: Vec<CommentId> = tree[1].replies.iter().map(|n| n.comment.id).collect();
    assert_eq!(reply_ids, replies);

    // Rebuilding yields the identical shape.
    let again = board.comment_tree(&post.id).expect("Failed to rebuild");
    assert_eq!(tree, again);
}

/// A deeply nested chain survives tree assembly and cascade deletion
/// without recursion limits getting in the way.
#[test]
fn test_deep_thread_assembly_and_cascade() {
    let mut board = BoardState::new();
    let post = board
        .create_post(draft_post("Deep thread", "alice", &[]))
        .expect("Failed to create post");

    let mut parent = None;
    let mut chain = Vec::new();
    for i in 0..300 {
        let comment = board
            .create_comment(draft_comment(
                post.id,
                "bob",
                &format!("level {}", i),
                parent,
            ))
            .expect("Failed to extend chain");
        parent = Some(comment.id);
        chain.push(comment.id);
    }
    assert_eq!(board.comment_count(), 300);

    // The tree is a single spine in insertion order.
    let tree = board.comment_tree(&post.id).expect("Failed to build tree");
    let mut flattened = Vec::new();
    flatten_tree(&tree, &mut flattened);
    assert_eq!(flattened, chain);

    // Deleting the tenth link removes everything below it.
    let removal = board
        .delete_comment(&chain[10], "bob")
        .expect("Failed to delete mid-chain");
    assert_eq!(removal.removed.len(), 290);
    assert_eq!(board.comment_count(), 10);

    let tree = board.comment_tree(&post.id).expect("Failed to rebuild");
    let mut flattened = Vec::new();
    flatten_tree(&tree, &mut flattened);
    assert_eq!(flattened, chain[..10].to_vec());
}

/// Deleting one root thread leaves unrelated threads untouched.
#[test]
fn test_cascade_is_scoped_to_one_subtree() {
    let mut board = BoardState::new();
    let post = board
        .create_post(draft_post("Two threads", "alice", &[]))
        .expect("Failed to create post");

    let doomed = board
        .create_comment(draft_comment(post.id, "bob", "thread one", None))
        .expect("Failed to create first root");
    board
        .create_comment(draft_comment(post.id, "carol", "nested", Some(doomed.id)))
        .expect("Failed to create nested reply");
    let survivor = board
        .create_comment(draft_comment(post.id, "dave", "thread two", None))
        .expect("Failed to create second root");

    board
        .delete_comment(&doomed.id, "bob")
        .expect("Failed to delete thread");

    let tree = board.comment_tree(&post.id).expect("Failed to rebuild");
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].comment.id, survivor.id);
    assert_eq!(board.comment_count(), 1);
}

// =============================================================================
// Listing and Search Tests
// =============================================================================

/// Walking every page of a large listing visits each post exactly once,
/// newest first, with no overlap between pages.
#[test]
fn test_pagination_walks_the_whole_collection() {
    let mut board = BoardState::new();
    let mut created = Vec::new();
    for i in 0..23 {
        let post = board
            .create_post(draft_post(&format!("Post number {}", i), "alice", &[]))
            .expect("Failed to create post");
        created.push(post.id);
    }

    let mut seen = Vec::new();
    for page_number in 1..=5 {
        let page = board.list_posts(&PostFilter::default(), PageRequest::new(page_number, 5));
        assert_eq!(page.total_posts, 23);
        assert_eq!(page.total_pages, 5);
        seen.extend(page.posts.iter().map(|p| p.id));
    }

    // Newest first means the reverse of creation order.
    created.reverse();
    assert_eq!(seen, created);

    // Past the last page comes back empty, not an error.
    let beyond = board.list_posts(&PostFilter::default(), PageRequest::new(6, 5));
    assert!(beyond.posts.is_empty());
    assert_eq!(beyond.total_posts, 23);
}

/// Filters compose: category, author, and search term all narrow the
/// same listing.
#[test]
fn test_listing_filters_compose() {
    let mut board = BoardState::new();
    board
        .create_post(draft_post("Sourdough basics", "alice", &["baking"]))
        .expect("Failed to create post");
    board
        .create_post(draft_post("Sourdough rescue", "bob", &["baking"]))
        .expect("Failed to create post");
    board
        .create_post(draft_post("Bike maintenance", "alice", &["cycling"]))
        .expect("Failed to create post");

    let by_category = board.list_posts(
        &PostFilter {
            category: Some("baking".to_string()),
            ..Default::default()
        },
        PageRequest::default(),
    );
    assert_eq!(by_category.total_posts, 2);

    let by_author = board.list_posts(
        &PostFilter {
            username: Some("alice".to_string()),
            ..Default::default()
        },
        PageRequest::default(),
    );
    assert_eq!(by_author.total_posts, 2);

    // Search is case-insensitive and reaches descriptions too.
    let by_search = board.list_posts(
        &PostFilter {
            search_term: Some("SOURDOUGH".to_string()),
            ..Default::default()
        },
        PageRequest::default(),
    );
    assert_eq!(by_search.total_posts, 2);

    let combined = board.list_posts(
        &PostFilter {
            category: Some("baking".to_string()),
            username: Some("alice".to_string()),
            search_term: Some("basics".to_string()),
        },
        PageRequest::default(),
    );
    assert_eq!(combined.total_posts, 1);
    assert_eq!(combined.posts[0].title, "Sourdough basics");
}

// =============================================================================
// Title Registry Tests
// =============================================================================

/// Title uniqueness follows a post through its whole life: claimed at
/// creation, moved by renames, released by deletion.
#[test]
fn test_title_registry_follows_the_post_lifecycle() {
    let mut board = BoardState::new();
    let post = board
        .create_post(draft_post("Original title", "alice", &[]))
        .expect("Failed to create post");

    // Case variants collide.
    assert!(matches!(
        board.create_post(draft_post("ORIGINAL TITLE", "bob", &[])),
        Err(SoapboxError::Conflict(_))
    ));

    // A rename frees the old title and claims the new one.
    board
        .update_post(
            &post.id,
            "alice",
            PostUpdate {
                title: Some("Renamed title".to_string()),
                ..Default::default()
            },
        )
        .expect("Failed to rename");
    board
        .create_post(draft_post("Original title", "bob", &[]))
        .expect("Old title should be free after rename");
    assert!(matches!(
        board.create_post(draft_post("renamed TITLE", "bob", &[])),
        Err(SoapboxError::Conflict(_))
    ));

    // Deletion releases the claim.
    board
        .delete_post(&post.id, "alice")
        .expect("Failed to delete");
    board
        .create_post(draft_post("Renamed title", "carol", &[]))
        .expect("Title should be free after deletion");
}
