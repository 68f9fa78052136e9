//! Complete Soapbox Workflow Example
//!
//! This example demonstrates a full day on the board:
//! - Several users publishing posts
//! - Listing with pagination, search, and category filters
//! - Threaded conversations with nested replies
//! - Vote casting, switching, and revoking on posts and comments
//! - Author-only edits and the cascades behind deletion
//!
//! Run with: cargo run --example full_workflow

use soapbox::board::{
    BoardState, CommentDraft, PageRequest, PostDraft, PostFilter, PostUpdate, VoteKind,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔔 Soapbox - Complete Workflow Example");
    println!("======================================");
    println!();

    let mut board = BoardState::new();

    // =========================================================================
    // Step 1: Users publish posts
    // =========================================================================
    println!("📝 Step 1: Publishing posts...");
    let posts = [
        ("Sourdough starter diary", "alice", "baking"),
        ("Commuting by bike in winter", "bob", "cycling"),
        ("Sourdough rescue thread", "carol", "baking"),
        ("Budget bike maintenance", "bob", "cycling"),
        ("First crumb shot", "alice", "baking"),
    ];
    let mut ids = Vec::new();
    for (title, author, tag) in posts {
        let post = board.create_post(PostDraft {
            title: title.to_string(),
            description: format!("Everything about {}.", title.to_lowercase()),
            picture: String::new(),
            author: author.to_string(),
            tags: vec![tag.to_string()],
        })?;
        ids.push(post.id);
    }
    println!("✅ {} posts published", board.post_count());

    // Duplicate titles are refused, whatever the case.
    let duplicate = board.create_post(PostDraft {
        title: "SOURDOUGH STARTER DIARY".to_string(),
        description: "Copycat.".to_string(),
        picture: String::new(),
        author: "mallory".to_string(),
        tags: vec![],
    });
    println!("🚫 Duplicate title rejected: {}", duplicate.unwrap_err());
    println!();

    // =========================================================================
    // Step 2: Listing, search, and filters
    // =========================================================================
    println!("📚 Step 2: Browsing the board...");
    let page = board.list_posts(&PostFilter::default(), PageRequest::new(1, 3));
    println!(
        "   page 1 of {} ({} posts total, newest first):",
        page.total_pages, page.total_posts
    );
    for post in &page.posts {
        println!("      \"{}\" by {}", post.title, post.author);
    }

    let baking = board.list_posts(
        &PostFilter {
            category: Some("baking".to_string()),
            ..Default::default()
        },
        PageRequest::default(),
    );
    println!("   category=baking matches {}", baking.total_posts);

    let search = board.list_posts(
        &PostFilter {
            search_term: Some("SOURDOUGH".to_string()),
            ..Default::default()
        },
        PageRequest::default(),
    );
    println!("   search \"SOURDOUGH\" matches {}", search.total_posts);
    println!();

    // =========================================================================
    // Step 3: A conversation grows
    // =========================================================================
    println!("💬 Step 3: A conversation under \"{}\"...", posts[0].0);
    let diary = ids[0];
    let q = board.create_comment(CommentDraft {
        post_id: diary,
        author: "bob".to_string(),
        body: "What hydration are you running?".to_string(),
        parent_id: None,
    })?;
    let a = board.create_comment(CommentDraft {
        post_id: diary,
        author: "alice".to_string(),
        body: "Eighty percent, it forgives mistakes.".to_string(),
        parent_id: Some(q.id),
    })?;
    board.create_comment(CommentDraft {
        post_id: diary,
        author: "carol".to_string(),
        body: "Eighty is where I landed too.".to_string(),
        parent_id: Some(a.id),
    })?;
    board.create_comment(CommentDraft {
        post_id: diary,
        author: "dave".to_string(),
        body: "Crumb shot or it didn't happen.".to_string(),
        parent_id: None,
    })?;

    let tree = board.comment_tree(&diary)?;
    println!("   {} root comments, {} comments total", tree.len(), board.comment_count());

    // =========================================================================
    // Step 4: Votes move scores
    // =========================================================================
    println!();
    println!("🔼 Step 4: Votes...");
    board.vote_post(&diary, "bob", VoteKind::Upvote)?;
    board.vote_post(&diary, "carol", VoteKind::Upvote)?;
    board.vote_post(&diary, "dave", VoteKind::Downvote)?;
    // dave reconsiders and switches sides.
    let post = board.vote_post(&diary, "dave", VoteKind::Upvote)?;
    println!(
        "   post score {} ({} up / {} down)",
        post.score(),
        post.votes.upvotes().len(),
        post.votes.downvotes().len()
    );

    let comment = board.vote_comment(&q.id, "alice", VoteKind::Upvote)?;
    println!("   comment by {} now at score {}", comment.author, comment.score());

    // =========================================================================
    // Step 5: Authors edit their own content
    // =========================================================================
    println!();
    println!("✏️ Step 5: Edits...");
    board.update_post(
        &diary,
        "alice",
        PostUpdate {
            description: Some("Day four: it rose. I am a believer now.".to_string()),
            ..Default::default()
        },
    )?;
    println!("   alice updated her description");

    let hijack = board.update_comment(&q.id, "mallory", "buy my flour");
    println!("   mallory editing bob's comment: {}", hijack.unwrap_err());

    // =========================================================================
    // Step 6: Deletion cascades
    // =========================================================================
    println!();
    println!("🗑️ Step 6: Cascades...");
    let removal = board.delete_comment(&q.id, "bob")?;
    println!(
        "   deleting bob's question removed {} comments (the whole subtree)",
        removal.removed.len()
    );

    let removed_comments = board.delete_post(&diary, "alice")?;
    println!(
        "   deleting the post removed its last {} comment(s)",
        removed_comments
    );
    println!(
        "   board now holds {} posts and {} comments",
        board.post_count(),
        board.comment_count()
    );

    println!();
    println!("🎉 Workflow complete!");
    Ok(())
}
