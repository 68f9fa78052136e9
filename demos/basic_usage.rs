//! Basic Soapbox Usage Example
//!
//! This example shows the basic usage of the board: creating a post,
//! growing a small comment thread, and watching votes move the score.
//!
//! Run with: cargo run --example basic_usage

use soapbox::board::{BoardState, CommentDraft, PostDraft, VoteKind};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🚀 Basic Soapbox Usage Example");
    println!("==============================");
    println!();

    let mut board = BoardState::new();

    // Create a post
    println!("📝 Step 1: Creating a post...");
    let post = board.create_post(PostDraft {
        title: "Sourdough starter diary".to_string(),
        description: "Day one: flour, water, and unjustified optimism.".to_string(),
        picture: String::new(),
        author: "alice".to_string(),
        tags: vec!["baking".to_string()],
    })?;
    println!("✅ Post created:");
    println!("   id: {}", post.id);
    println!("   title: \"{}\"", post.title);
    println!("   author: {}", post.author);
    println!();

    // Comment on it
    println!("💬 Step 2: Starting a thread...");
    let root = board.create_comment(CommentDraft {
        post_id: post.id,
        author: "bob".to_string(),
        body: "Does rye flour work too?".to_string(),
        parent_id: None,
    })?;
    let reply = board.create_comment(CommentDraft {
        post_id: post.id,
        author: "alice".to_string(),
        body: "It does, just feed it more often.".to_string(),
        parent_id: Some(root.id),
    })?;
    println!("✅ Thread started:");
    println!("   root comment by {}: \"{}\"", root.author, root.body);
    println!("   reply by {}: \"{}\"", reply.author, reply.body);
    println!();

    // Vote on the post
    println!("🔼 Step 3: Voting...");
    let post = board.vote_post(&post.id, "bob", VoteKind::Upvote)?;
    println!("   bob upvotes -> score {}", post.score());
    let post = board.vote_post(&post.id, "carol", VoteKind::Upvote)?;
    println!("   carol upvotes -> score {}", post.score());
    // The same vote again takes it back.
    let post = board.vote_post(&post.id, "bob", VoteKind::Upvote)?;
    println!("   bob upvotes again (revoke) -> score {}", post.score());
    assert_eq!(post.score(), 1);
    println!("✅ Vote toggling works!");
    println!();

    // Read the thread back as a tree
    println!("🌳 Step 4: Assembling the comment tree...");
    let tree = board.comment_tree(&post.id)?;
    for node in &tree {
        println!("   {} — \"{}\"", node.comment.author, node.comment.body);
        for child in &node.replies {
            println!("      └ {} — \"{}\"", child.comment.author, child.comment.body);
        }
    }
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].replies.len(), 1);
    println!("✅ One root, one nested reply, oldest first.");
    println!();

    println!("🎉 Basic usage complete!");
    Ok(())
}
