//! # Soapbox - Posts, Threaded Comments, and Votes
//!
//! The core library behind the soapbox discussion server: an in-memory
//! board of posts with arbitrarily nested comments and per-user vote
//! ledgers, the wire types of its JSON API, optional RocksDB persistence,
//! and an async client that mirrors every endpoint.
//!
//! ## Features
//!
//! - **Vote ledgers**: one vote per user per entity, with toggle and
//!   switch semantics applied as a single atomic set update
//! - **Threaded comments**: unbounded reply depth, trees assembled in
//!   linear time, siblings ordered oldest first
//! - **Post board**: globally unique titles, paginated listing, and
//!   combined category/author/text search
//! - **Sync client**: silent one-shot token refresh and a short-TTL read
//!   cache
//!
//! ## Examples
//!
//! ### Working with a board directly
//!
//! ```rust
//! use soapbox::board::{BoardState, CommentDraft, PostDraft, VoteKind};
//! # fn main() -> soapbox::Result<()> {
//! let mut board = BoardState::new();
//! let post = board.create_post(PostDraft {
//!     title: "Hello soapbox".to_string(),
//!     description: "First post".to_string(),
//!     picture: String::new(),
//!     author: "alice".to_string(),
//!     tags: vec!["meta".to_string()],
//! })?;
//!
//! let comment = board.create_comment(CommentDraft {
//!     post_id: post.id,
//!     author: "bob".to_string(),
//!     body: "Welcome!".to_string(),
//!     parent_id: None,
//! })?;
//!
//! let post = board.vote_post(&post.id, "bob", VoteKind::Upvote)?;
//! assert_eq!(post.score(), 1);
//! assert_eq!(board.comment_tree(&post.id)?.len(), 1);
//! # let _ = comment;
//! # Ok(())
//! # }
//! ```
//!
//! ### Talking to a running server
//!
//! ```rust,no_run
//! use soapbox::client::BoardClient;
//! use soapbox::api::ListPostsParams;
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = BoardClient::new("http://127.0.0.1:8087");
//! client.open_session("alice").await?;
//! let page = client.list_posts(&ListPostsParams::default()).await?;
//! println!("{} posts on the board", page.total_posts);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod board;
pub mod client;
pub mod error;
pub mod storage;

pub use error::{Result, SoapboxError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
