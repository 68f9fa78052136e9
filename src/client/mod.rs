//! Async HTTP client mirroring every board endpoint.
//!
//! All methods return the server's payload with the envelope already
//! unwrapped, so a mutation hands back the full updated entity.
//!
//! ## Session handling
//!
//! The client holds at most one session. When a request bounces with an
//! authentication failure and a session is present, the client silently
//! refreshes the access token and retries exactly once; a second failure
//! clears the session and surfaces [`ClientError::Unauthenticated`]. A
//! logical request therefore never triggers more than one refresh, and
//! concurrent requests that hit an expired token share one refresh
//! instead of racing.
//!
//! ## Read caching
//!
//! Read endpoints go through a short-TTL cache keyed by path and query
//! (see [`cache::ReadCache`]). Local mutations do not touch the cache.

pub mod cache;

use crate::api::{
    ApiEnvelope, CommentData, CommentDeleteData, CreateCommentRequest, CreatePostRequest,
    DeleteCommentRequest, DeletePostRequest, ErrorCode, HealthData, ListPostsParams, PostData,
    PostDeleteData, PostPageData, RefreshRequest, SessionData, SessionRequest,
    UpdateCommentRequest, UpdatePostRequest, VoteRequest,
};
use crate::board::comment::CommentId;
use crate::board::post::PostId;
use crate::board::votes::VoteKind;
use cache::{cache_key, ReadCache, DEFAULT_CACHE_TTL};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Where the board server listens unless told otherwise.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8087";

// =============================================================================
// Errors
// =============================================================================

/// Client-side failures, split by where the fault lies.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced a usable HTTP response.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with an error envelope.
    #[error("API error {code}: {message}")]
    Api { code: ErrorCode, message: String },

    /// No usable session, or the session could not be refreshed.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// The server answered with something that is not a valid envelope.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

// =============================================================================
// Client
// =============================================================================

#[derive(Debug, Clone)]
struct Session {
    username: String,
    access_token: String,
    refresh_token: String,
}

/// Handle to one board server.
///
/// Cheap to share behind [`SharedBoardClient`]; all interior state is
/// synchronized.
#[derive(Debug)]
pub struct BoardClient {
    http: reqwest::Client,
    base_url: String,
    session: RwLock<Option<Session>>,
    cache: ReadCache,
    request_id: AtomicU64,
}

/// Thread-safe shared reference to a [`BoardClient`].
pub type SharedBoardClient = Arc<BoardClient>;

fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

impl Default for BoardClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl BoardClient {
    /// Creates a client for the server at `base_url`.
    pub fn new(base_url: &str) -> Self {
        Self::with_cache_ttl(base_url, DEFAULT_CACHE_TTL)
    }

    /// Creates a client with a custom read-cache TTL.
    pub fn with_cache_ttl(base_url: &str, cache_ttl: Duration) -> Self {
        BoardClient {
            http: reqwest::Client::new(),
            base_url: normalize_base_url(base_url),
            session: RwLock::new(None),
            cache: ReadCache::new(cache_ttl),
            request_id: AtomicU64::new(1),
        }
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// True if a session is currently held.
    pub async fn has_session(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// The username of the held session, if any.
    pub async fn session_username(&self) -> Option<String> {
        self.session.read().await.as_ref().map(|s| s.username.clone())
    }

    /// Opens a session for `username` and stores its tokens.
    #[instrument(skip(self))]
    pub async fn open_session(&self, username: &str) -> ClientResult<()> {
        let request = SessionRequest {
            username: username.to_string(),
        };
        let data: SessionData = self
            .attempt(Method::POST, "/session/new", &[], Some(&request), None)
            .await?;

        info!(username = %data.username, "session opened");
        *self.session.write().await = Some(Session {
            username: data.username,
            access_token: data.access_token,
            refresh_token: data.refresh_token,
        });
        Ok(())
    }

    /// Drops the held session, if any.
    pub async fn clear_session(&self) {
        *self.session.write().await = None;
    }

    async fn access_token(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    /// Exchanges the refresh token for a new access token.
    ///
    /// Holds the session write lock across the exchange so concurrent
    /// callers serialize; whoever arrives after a successful refresh sees
    /// a token that no longer matches `failed_token` and skips the call.
    /// A failed exchange clears the session.
    async fn refresh_session(&self, failed_token: &str) -> ClientResult<()> {
        let mut guard = self.session.write().await;
        let Some(session) = guard.as_mut() else {
            return Err(ClientError::Unauthenticated(
                "no active session to refresh".to_string(),
            ));
        };
        if session.access_token != failed_token {
            return Ok(());
        }

        let request = RefreshRequest {
            refresh_token: session.refresh_token.clone(),
        };
        match self
            .attempt::<SessionData, RefreshRequest>(
                Method::POST,
                "/session/refresh",
                &[],
                Some(&request),
                None,
            )
            .await
        {
            Ok(data) => {
                debug!(username = %session.username, "access token refreshed");
                session.access_token = data.access_token;
                session.refresh_token = data.refresh_token;
                Ok(())
            }
            Err(error) => {
                warn!(%error, "session refresh failed, clearing session");
                *guard = None;
                Err(ClientError::Unauthenticated(
                    "session expired and could not be refreshed".to_string(),
                ))
            }
        }
    }

    // =========================================================================
    // Request core
    // =========================================================================

    /// Sends one request, transparently refreshing the session on an
    /// authentication failure and retrying at most once.
    async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&B>,
    ) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let token = self.access_token().await;
        let first = self
            .attempt(method.clone(), path, query, body, token.as_deref())
            .await;

        let message = match first {
            Err(ClientError::Api {
                code: ErrorCode::Unauthenticated,
                message,
            }) => message,
            other => return other,
        };

        // Without a session there is nothing to refresh.
        let Some(failed_token) = token else {
            return Err(ClientError::Unauthenticated(message));
        };

        self.refresh_session(&failed_token).await?;
        let token = self.access_token().await;
        match self.attempt(method, path, query, body, token.as_deref()).await {
            Err(ClientError::Api {
                code: ErrorCode::Unauthenticated,
                message,
            }) => {
                warn!("request still unauthenticated after refresh, clearing session");
                self.clear_session().await;
                Err(ClientError::Unauthenticated(message))
            }
            other => other,
        }
    }

    /// One HTTP round trip, no retry logic.
    async fn attempt<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&B>,
        token: Option<&str>,
    ) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request_id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let url = format!("{}{}", self.base_url, path);

        let mut builder = self.http.request(method.clone(), &url);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        debug!(request_id, %method, url = %url, "sending request");
        let response = builder.send().await?;
        let envelope: ApiEnvelope<T> = response.json().await.map_err(|e| {
            if e.is_decode() {
                ClientError::InvalidResponse(format!("malformed response body: {}", e))
            } else {
                ClientError::Network(e)
            }
        })?;

        unwrap_envelope(envelope)
    }

    /// A cached GET: cache hit short-circuits the network entirely.
    async fn get_cached<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> ClientResult<T> {
        let key = cache_key(path, query);
        if let Some(hit) = self.cache.get(&key) {
            debug!(key = %key, "read served from cache");
            return decode_payload(hit);
        }

        let fresh: Value = self.request(Method::GET, path, query, None::<&Value>).await?;
        self.cache.put(key, fresh.clone());
        decode_payload(fresh)
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// Creates a post and returns it.
    #[instrument(skip(self, request), fields(title = %request.title))]
    pub async fn create_post(&self, request: &CreatePostRequest) -> ClientResult<PostData> {
        let post: PostData = self
            .request(Method::POST, "/create", &[], Some(request))
            .await?;
        info!(post_id = %post.id, "post created");
        Ok(post)
    }

    /// Lists posts, newest first.
    #[instrument(skip(self, params))]
    pub async fn list_posts(&self, params: &ListPostsParams) -> ClientResult<PostPageData> {
        self.get_cached("/posts", &params.to_query_pairs()).await
    }

    /// Searches posts with the same parameters as [`Self::list_posts`].
    #[instrument(skip(self, params))]
    pub async fn search_posts(&self, params: &ListPostsParams) -> ClientResult<PostPageData> {
        self.get_cached("/posts/search", &params.to_query_pairs()).await
    }

    /// Fetches one post.
    #[instrument(skip(self))]
    pub async fn post(&self, id: &PostId) -> ClientResult<PostData> {
        self.get_cached(&format!("/post/{}", id), &[]).await
    }

    /// Updates a post and returns the updated entity.
    #[instrument(skip(self, request))]
    pub async fn update_post(
        &self,
        id: &PostId,
        request: &UpdatePostRequest,
    ) -> ClientResult<PostData> {
        self.request(Method::PUT, &format!("/update/{}", id), &[], Some(request))
            .await
    }

    /// Deletes a post, cascading its comments.
    #[instrument(skip(self))]
    pub async fn delete_post(&self, id: &PostId, username: &str) -> ClientResult<PostDeleteData> {
        let request = DeletePostRequest {
            username: username.to_string(),
        };
        let deleted: PostDeleteData = self
            .request(Method::DELETE, &format!("/delete/{}", id), &[], Some(&request))
            .await?;
        info!(post_id = %id, removed_comments = deleted.removed_comments, "post deleted");
        Ok(deleted)
    }

    /// Casts, switches, or revokes a vote on a post.
    #[instrument(skip(self))]
    pub async fn vote_post(
        &self,
        id: &PostId,
        username: &str,
        vote: VoteKind,
    ) -> ClientResult<PostData> {
        let request = VoteRequest {
            username: username.to_string(),
            vote_type: vote,
        };
        self.request(Method::POST, &format!("/post/vote/{}", id), &[], Some(&request))
            .await
    }

    // =========================================================================
    // Comments
    // =========================================================================

    /// Fetches the nested comment tree of a post.
    #[instrument(skip(self))]
    pub async fn comments(&self, post_id: &PostId) -> ClientResult<Vec<CommentData>> {
        self.get_cached(&format!("/comments/{}", post_id), &[]).await
    }

    /// Creates a comment (root or reply) and returns it.
    #[instrument(skip(self, request), fields(post_id = %request.post_id))]
    pub async fn create_comment(&self, request: &CreateCommentRequest) -> ClientResult<CommentData> {
        let comment: CommentData = self
            .request(Method::POST, "/comment/new", &[], Some(request))
            .await?;
        info!(comment_id = %comment.id, "comment created");
        Ok(comment)
    }

    /// Replaces a comment's text and returns the updated entity.
    #[instrument(skip(self, request))]
    pub async fn update_comment(
        &self,
        id: &CommentId,
        request: &UpdateCommentRequest,
    ) -> ClientResult<CommentData> {
        self.request(
            Method::PUT,
            &format!("/comment/update/{}", id),
            &[],
            Some(request),
        )
        .await
    }

    /// Deletes a comment, cascading its replies.
    #[instrument(skip(self))]
    pub async fn delete_comment(
        &self,
        id: &CommentId,
        name: &str,
    ) -> ClientResult<CommentDeleteData> {
        let request = DeleteCommentRequest {
            name: name.to_string(),
        };
        let deleted: CommentDeleteData = self
            .request(
                Method::DELETE,
                &format!("/comment/delete/{}", id),
                &[],
                Some(&request),
            )
            .await?;
        info!(comment_id = %id, removed_replies = deleted.removed_replies, "comment deleted");
        Ok(deleted)
    }

    /// Casts, switches, or revokes a vote on a comment.
    #[instrument(skip(self))]
    pub async fn vote_comment(
        &self,
        id: &CommentId,
        username: &str,
        vote: VoteKind,
    ) -> ClientResult<CommentData> {
        let request = VoteRequest {
            username: username.to_string(),
            vote_type: vote,
        };
        self.request(
            Method::POST,
            &format!("/comment/vote/{}", id),
            &[],
            Some(&request),
        )
        .await
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// Probes the server. Never cached.
    pub async fn health(&self) -> ClientResult<HealthData> {
        self.request(Method::GET, "/health", &[], None::<&Value>).await
    }
}

fn decode_payload<T: DeserializeOwned>(value: Value) -> ClientResult<T> {
    serde_json::from_value(value)
        .map_err(|e| ClientError::InvalidResponse(format!("unexpected payload shape: {}", e)))
}

fn unwrap_envelope<T>(envelope: ApiEnvelope<T>) -> ClientResult<T> {
    if envelope.is_success == Some(true) {
        return envelope.data.ok_or_else(|| {
            ClientError::InvalidResponse("success envelope without data".to_string())
        });
    }
    if envelope.is_error == Some(true) {
        let code = envelope.code.ok_or_else(|| {
            ClientError::InvalidResponse("error envelope without code".to_string())
        })?;
        return Err(ClientError::Api {
            code,
            message: envelope.msg.unwrap_or_default(),
        });
    }
    Err(ClientError::InvalidResponse(
        "envelope is neither success nor error".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_base_url_trims_trailing_slash() {
        assert_eq!(normalize_base_url("http://host:1/"), "http://host:1");
        assert_eq!(normalize_base_url("http://host:1"), "http://host:1");
    }

    #[test]
    fn test_unwrap_success_envelope() {
        let envelope = ApiEnvelope::success(json!({"id": "x"}));
        let value = unwrap_envelope(envelope).unwrap();
        assert_eq!(value["id"], "x");
    }

    #[test]
    fn test_unwrap_error_envelope() {
        let envelope: ApiEnvelope<Value> = ApiEnvelope::failure(ErrorCode::Conflict, "taken");
        match unwrap_envelope(envelope) {
            Err(ClientError::Api { code, message }) => {
                assert_eq!(code, ErrorCode::Conflict);
                assert_eq!(message, "taken");
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_unwrap_rejects_malformed_envelopes() {
        // Success flag without a payload.
        let envelope: ApiEnvelope<Value> = ApiEnvelope {
            is_success: Some(true),
            data: None,
            is_error: None,
            msg: None,
            code: None,
        };
        assert!(matches!(
            unwrap_envelope(envelope),
            Err(ClientError::InvalidResponse(_))
        ));

        // Neither flag set.
        let envelope: ApiEnvelope<Value> = ApiEnvelope {
            is_success: None,
            data: None,
            is_error: None,
            msg: None,
            code: None,
        };
        assert!(matches!(
            unwrap_envelope(envelope),
            Err(ClientError::InvalidResponse(_))
        ));

        // Error flag without a code.
        let envelope: ApiEnvelope<Value> = ApiEnvelope {
            is_success: None,
            data: None,
            is_error: Some(true),
            msg: Some("broken".to_string()),
            code: None,
        };
        assert!(matches!(
            unwrap_envelope(envelope),
            Err(ClientError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_session_state_is_observable() {
        let client = BoardClient::new("http://127.0.0.1:1");
        assert!(!client.has_session().await);
        assert_eq!(client.session_username().await, None);

        client.clear_session().await;
        assert!(!client.has_session().await);
    }

    #[tokio::test]
    async fn test_network_error_is_not_an_api_error() {
        // Nothing listens on port 9; the failure must surface as Network.
        let client = BoardClient::new("http://127.0.0.1:9");
        match client.health().await {
            Err(ClientError::Network(_)) => {}
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }
}
