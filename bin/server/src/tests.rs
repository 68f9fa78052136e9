//! End-to-end tests: a real server on an ephemeral port, exercised
//! through the library client and, where the wire shape itself is under
//! test, raw HTTP.

use crate::auth::TokenStore;
use crate::build_app;
use crate::state::{AppState, PersistentBoard};
use serde_json::{json, Value};
use soapbox::api::{
    CreateCommentRequest, CreatePostRequest, ErrorCode, ListPostsParams, UpdateCommentRequest,
    UpdatePostRequest,
};
use soapbox::board::VoteKind;
use soapbox::client::{BoardClient, ClientError};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

async fn spawn_app(board: Arc<PersistentBoard>, access_ttl: Duration) -> String {
    let state = AppState {
        board,
        tokens: Arc::new(TokenStore::new(access_ttl)),
    };
    let app = build_app(state, false);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("serve");
    });
    format!("http://{}", addr)
}

async fn spawn_default_app() -> String {
    spawn_app(
        Arc::new(PersistentBoard::in_memory()),
        Duration::from_secs(900),
    )
    .await
}

/// A client whose read cache never returns hits.
fn uncached_client(base_url: &str) -> BoardClient {
    BoardClient::with_cache_ttl(base_url, Duration::ZERO)
}

fn post_request(title: &str, username: &str) -> CreatePostRequest {
    CreatePostRequest {
        title: title.to_string(),
        description: format!("description of {}", title),
        picture: String::new(),
        username: username.to_string(),
        tags: vec!["general".to_string()],
    }
}

fn comment_request(
    post_id: soapbox::board::PostId,
    name: &str,
    text: &str,
    parent: Option<soapbox::board::CommentId>,
) -> CreateCommentRequest {
    CreateCommentRequest {
        post_id,
        name: name.to_string(),
        comments: text.to_string(),
        parent_id: parent,
    }
}

fn assert_api_error<T: std::fmt::Debug>(
    result: Result<T, ClientError>,
    expected: ErrorCode,
) {
    match result {
        Err(ClientError::Api { code, .. }) => assert_eq!(code, expected),
        other => panic!("expected {:?} error, got {:?}", expected, other),
    }
}

#[tokio::test]
async fn test_post_lifecycle() {
    let base = spawn_default_app().await;
    let client = uncached_client(&base);
    client.open_session("alice").await.unwrap();

    println!("=== Step 1: Create a post ===");
    let post = client
        .create_post(&post_request("Hello board", "alice"))
        .await
        .unwrap();
    assert_eq!(post.username, "alice");
    assert_eq!(post.score, 0);
    assert!(post.upvotes.is_empty());

    println!("=== Step 2: Fetch it back ===");
    let fetched = client.post(&post.id).await.unwrap();
    assert_eq!(fetched.title, "Hello board");
    assert_eq!(fetched.created_at, post.created_at);

    println!("=== Step 3: Update the description ===");
    let updated = client
        .update_post(
            &post.id,
            &UpdatePostRequest {
                username: "alice".to_string(),
                description: Some("rewritten".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Hello board");
    assert_eq!(updated.description, "rewritten");

    println!("=== Step 4: Vote toggle scenario ===");
    let after_up = client
        .vote_post(&post.id, "bob", VoteKind::Upvote)
        .await
        .unwrap();
    assert_eq!(after_up.score, 1);
    assert_eq!(after_up.upvotes, vec!["bob".to_string()]);

    let after_switch = client
        .vote_post(&post.id, "bob", VoteKind::Downvote)
        .await
        .unwrap();
    assert_eq!(after_switch.score, -1);
    assert!(after_switch.upvotes.is_empty());
    assert_eq!(after_switch.downvotes, vec!["bob".to_string()]);

    let after_revoke = client
        .vote_post(&post.id, "bob", VoteKind::Downvote)
        .await
        .unwrap();
    assert_eq!(after_revoke.score, 0);
    assert!(after_revoke.downvotes.is_empty());

    println!("=== Step 5: Listing and search ===");
    let page = client.list_posts(&ListPostsParams::default()).await.unwrap();
    assert_eq!(page.total_posts, 1);
    assert_eq!(page.posts[0].id, post.id);

    let hits = client
        .search_posts(&ListPostsParams {
            search_term: Some("HELLO".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(hits.total_posts, 1);

    let misses = client
        .search_posts(&ListPostsParams {
            username: Some("nobody".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(misses.total_posts, 0);

    println!("=== Step 6: Delete ===");
    let deleted = client.delete_post(&post.id, "alice").await.unwrap();
    assert!(deleted.deleted);
    assert_eq!(deleted.removed_comments, 0);
    assert_api_error(client.post(&post.id).await, ErrorCode::NotFound);
}

#[tokio::test]
async fn test_error_codes_on_the_wire() {
    let base = spawn_default_app().await;
    let client = uncached_client(&base);
    client.open_session("alice").await.unwrap();

    let post = client
        .create_post(&post_request("Unique title", "alice"))
        .await
        .unwrap();

    // Duplicate title, case-insensitive.
    assert_api_error(
        client
            .create_post(&post_request("UNIQUE title", "bob"))
            .await,
        ErrorCode::Conflict,
    );

    // Empty description.
    let mut invalid = post_request("Another", "alice");
    invalid.description = "   ".to_string();
    assert_api_error(client.create_post(&invalid).await, ErrorCode::Validation);

    // Author-only update.
    assert_api_error(
        client
            .update_post(
                &post.id,
                &UpdatePostRequest {
                    username: "mallory".to_string(),
                    description: Some("hijack".to_string()),
                    ..Default::default()
                },
            )
            .await,
        ErrorCode::Authorization,
    );

    // Unknown id.
    assert_api_error(
        client.post(&soapbox::board::PostId::generate()).await,
        ErrorCode::NotFound,
    );

    // A write without any session short-circuits client-side after the
    // server's 401, with no refresh to attempt.
    let anonymous = uncached_client(&base);
    match anonymous.create_post(&post_request("Nope", "eve")).await {
        Err(ClientError::Unauthenticated(_)) => {}
        other => panic!("expected unauthenticated, got {:?}", other),
    }

    // Raw wire checks: envelope shapes and the invalid-id case.
    let raw = reqwest::Client::new();
    let session: Value = raw
        .post(format!("{}/session/new", base))
        .json(&json!({"username": "carol"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = session["data"]["accessToken"].as_str().unwrap();

    // Reads are token-gated like everything else on the domain surface.
    let no_token = raw.get(format!("{}/posts", base)).send().await.unwrap();
    assert_eq!(no_token.status().as_u16(), 401);
    let no_token_body: Value = no_token.json().await.unwrap();
    assert_eq!(no_token_body["code"], json!("UNAUTHENTICATED"));

    let ok_body: Value = raw
        .get(format!("{}/posts", base))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ok_body["isSuccess"], json!(true));
    assert!(ok_body.get("isError").is_none());

    let bad_id = raw
        .get(format!("{}/post/not-a-uuid", base))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(bad_id.status().as_u16(), 400);
    let bad_body: Value = bad_id.json().await.unwrap();
    assert_eq!(bad_body["isError"], json!(true));
    assert_eq!(bad_body["code"], json!("VALIDATION_ERROR"));
    assert!(bad_body.get("isSuccess").is_none());

    // Unknown vote type comes back as a validation failure, not a 422.
    let sideways = raw
        .post(format!("{}/post/vote/{}", base, post.id))
        .bearer_auth(token)
        .json(&json!({"username": "carol", "voteType": "sideways"}))
        .send()
        .await
        .unwrap();
    assert_eq!(sideways.status().as_u16(), 400);
    let body: Value = sideways.json().await.unwrap();
    assert_eq!(body["code"], json!("VALIDATION_ERROR"));
}

#[tokio::test]
async fn test_comment_thread_workflow() {
    let base = spawn_default_app().await;
    let client = uncached_client(&base);
    client.open_session("alice").await.unwrap();

    let post = client
        .create_post(&post_request("Thread", "alice"))
        .await
        .unwrap();

    println!("=== Step 1: Root comment and nested reply ===");
    let root = client
        .create_comment(&comment_request(post.id, "bob", "first!", None))
        .await
        .unwrap();
    assert!(root.parent_id.is_none());
    assert!(root.replies.is_empty());

    let reply = client
        .create_comment(&comment_request(post.id, "carol", "welcome", Some(root.id)))
        .await
        .unwrap();
    assert_eq!(reply.parent_id, Some(root.id));

    let tree = client.comments(&post.id).await.unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].id, root.id);
    assert_eq!(tree[0].replies.len(), 1);
    assert_eq!(tree[0].replies[0].id, reply.id);

    println!("=== Step 2: Referential failures ===");
    assert_api_error(
        client
            .create_comment(&comment_request(
                soapbox::board::PostId::generate(),
                "bob",
                "lost",
                None,
            ))
            .await,
        ErrorCode::Validation,
    );

    let other_post = client
        .create_post(&post_request("Another thread", "alice"))
        .await
        .unwrap();
    assert_api_error(
        client
            .create_comment(&comment_request(
                other_post.id,
                "bob",
                "cross-post",
                Some(root.id),
            ))
            .await,
        ErrorCode::NotFound,
    );

    println!("=== Step 3: Author-only edit ===");
    assert_api_error(
        client
            .update_comment(
                &root.id,
                &UpdateCommentRequest {
                    name: "carol".to_string(),
                    comments: "hijacked".to_string(),
                },
            )
            .await,
        ErrorCode::Authorization,
    );
    let edited = client
        .update_comment(
            &root.id,
            &UpdateCommentRequest {
                name: "bob".to_string(),
                comments: "first, edited".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.comments, "first, edited");

    println!("=== Step 4: Comment votes ===");
    let voted = client
        .vote_comment(&root.id, "dave", VoteKind::Upvote)
        .await
        .unwrap();
    assert_eq!(voted.score, 1);

    println!("=== Step 5: Cascading delete ===");
    let removed = client.delete_comment(&root.id, "bob").await.unwrap();
    assert!(removed.deleted);
    assert_eq!(removed.removed_replies, 1);
    assert!(client.comments(&post.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_expired_token_refreshes_once_and_continues() {
    let base = spawn_app(
        Arc::new(PersistentBoard::in_memory()),
        Duration::from_millis(150),
    )
    .await;
    let client = uncached_client(&base);
    client.open_session("alice").await.unwrap();

    client
        .create_post(&post_request("Before expiry", "alice"))
        .await
        .unwrap();

    // Let the access token lapse; the next write must silently refresh.
    tokio::time::sleep(Duration::from_millis(250)).await;
    client
        .create_post(&post_request("After expiry", "alice"))
        .await
        .unwrap();
    assert!(client.has_session().await);

    // The refreshed token keeps working.
    client
        .create_post(&post_request("Still going", "alice"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unrecoverable_session_is_cleared() {
    // A zero TTL makes every access token dead on arrival, so the single
    // refresh also fails and the client must give the session up.
    let base = spawn_app(Arc::new(PersistentBoard::in_memory()), Duration::ZERO).await;
    let client = uncached_client(&base);
    client.open_session("alice").await.unwrap();
    assert!(client.has_session().await);

    match client.create_post(&post_request("Doomed", "alice")).await {
        Err(ClientError::Unauthenticated(_)) => {}
        other => panic!("expected unauthenticated, got {:?}", other),
    }
    assert!(!client.has_session().await);
}

#[tokio::test]
async fn test_read_cache_serves_stale_until_ttl() {
    let base = spawn_default_app().await;
    let client = BoardClient::with_cache_ttl(&base, Duration::from_millis(300));
    client.open_session("alice").await.unwrap();

    let post = client
        .create_post(&post_request("Cached post", "alice"))
        .await
        .unwrap();

    let first_read = client.post(&post.id).await.unwrap();
    assert_eq!(first_read.description, "description of Cached post");

    // A mutation through the same client does not touch the cache.
    client
        .update_post(
            &post.id,
            &UpdatePostRequest {
                username: "alice".to_string(),
                description: Some("brand new".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let stale = client.post(&post.id).await.unwrap();
    assert_eq!(stale.description, "description of Cached post");

    tokio::time::sleep(Duration::from_millis(400)).await;
    let fresh = client.post(&post.id).await.unwrap();
    assert_eq!(fresh.description, "brand new");
}

#[tokio::test]
async fn test_write_rate_limit_kicks_in() {
    let base = spawn_default_app().await;
    let raw = reqwest::Client::new();

    let mut denied = 0;
    let mut last_denied_body = None;
    for i in 0..45 {
        let response = raw
            .post(format!("{}/session/new", base))
            .json(&json!({ "username": format!("user{}", i) }))
            .send()
            .await
            .unwrap();
        if response.status().as_u16() == 429 {
            assert!(response.headers().get("Retry-After").is_some());
            denied += 1;
            last_denied_body = Some(response.json::<Value>().await.unwrap());
        }
    }

    assert!(denied > 0, "expected the write budget to run out");
    let body = last_denied_body.unwrap();
    assert_eq!(body["isError"], json!(true));
    assert_eq!(body["code"], json!("RATE_LIMITED"));
}

#[tokio::test]
async fn test_http_mutations_reach_the_shared_board() {
    let temp = tempfile::TempDir::new().unwrap();
    let board = Arc::new(PersistentBoard::open(temp.path()).unwrap());
    let base = spawn_app(board.clone(), Duration::from_secs(900)).await;

    let client = uncached_client(&base);
    client.open_session("alice").await.unwrap();
    let post = client
        .create_post(&post_request("Written through", "alice"))
        .await
        .unwrap();
    client
        .create_comment(&comment_request(post.id, "bob", "noted", None))
        .await
        .unwrap();

    assert_eq!(board.post_count(), 1);
    assert_eq!(board.comment_count(), 1);
    assert_eq!(board.post(&post.id).unwrap().title, "Written through");
}

#[tokio::test]
async fn test_health_probe() {
    let base = spawn_default_app().await;
    let client = uncached_client(&base);

    let health = client.health().await.unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, soapbox::VERSION);
}
