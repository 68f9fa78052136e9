//! Request handlers for the board API.
//!
//! Every endpoint answers with the standard envelope. All domain endpoints
//! are gated by a bearer token (only the session endpoints and the health
//! probe are open); the identity a mutation acts under comes from the
//! request body, matching the public wire contract.
//!
//! Bodies are taken as raw JSON and parsed here so shape failures (missing
//! fields, unknown vote types) come back as validation errors in the
//! envelope instead of a bare rejection.

use crate::auth::bearer_token;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use soapbox::api::{
    ApiEnvelope, CommentData, CommentDeleteData, CreateCommentRequest, CreatePostRequest,
    DeleteCommentRequest, DeletePostRequest, ErrorCode, HealthData, ListPostsParams, PostData,
    PostDeleteData, PostPageData, RefreshRequest, SessionRequest, UpdateCommentRequest,
    UpdatePostRequest, VoteRequest,
};
use soapbox::board::{CommentDraft, CommentId, PostDraft, PostId, PostUpdate};
use soapbox::{Result, SoapboxError};
use tracing::{debug, error, instrument};

/// Every handler resolves to a status plus an envelope.
pub type ApiResult = (StatusCode, Json<ApiEnvelope<Value>>);

// =============================================================================
// Response helpers
// =============================================================================

fn ok_response<T: Serialize>(data: T) -> ApiResult {
    match serde_json::to_value(data) {
        Ok(value) => (StatusCode::OK, Json(ApiEnvelope::success(value))),
        Err(e) => {
            error!("failed to serialize response payload: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiEnvelope::failure(
                    ErrorCode::Server,
                    "something went wrong, please try again later",
                )),
            )
        }
    }
}

fn err_response(error: &SoapboxError) -> ApiResult {
    let code = ErrorCode::from(error);
    if code == ErrorCode::Server {
        error!(%error, "request failed");
    } else {
        debug!(%error, code = %code, "request rejected");
    }

    let status =
        StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ApiEnvelope::failure(code, error.user_message())))
}

/// Checks the bearer token against the session store.
fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<()> {
    let token = bearer_token(headers)
        .ok_or_else(|| SoapboxError::unauthenticated("a bearer token is required"))?;
    let username = state
        .tokens
        .verify(token)
        .ok_or_else(|| SoapboxError::unauthenticated("invalid or expired access token"))?;
    debug!(session_user = %username, "request authenticated");
    Ok(())
}

fn parse_body<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| SoapboxError::validation(format!("invalid request body: {}", e)))
}

// =============================================================================
// Session endpoints
// =============================================================================

#[instrument(skip(state, body))]
pub async fn open_session(State(state): State<AppState>, Json(body): Json<Value>) -> ApiResult {
    let request: SessionRequest = match parse_body(body) {
        Ok(request) => request,
        Err(error) => return err_response(&error),
    };
    match state.tokens.open_session(&request.username) {
        Ok(session) => ok_response(session),
        Err(error) => err_response(&error),
    }
}

#[instrument(skip(state, body))]
pub async fn refresh_session(State(state): State<AppState>, Json(body): Json<Value>) -> ApiResult {
    let request: RefreshRequest = match parse_body(body) {
        Ok(request) => request,
        Err(error) => return err_response(&error),
    };
    match state.tokens.refresh(&request.refresh_token) {
        Some(session) => ok_response(session),
        None => err_response(&SoapboxError::unauthenticated("invalid refresh token")),
    }
}

// =============================================================================
// Read endpoints
// =============================================================================

#[instrument(skip(state, headers, params))]
pub async fn list_posts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListPostsParams>,
) -> ApiResult {
    if let Err(error) = authenticate(&state, &headers) {
        return err_response(&error);
    }
    let page = state.board.list_posts(&params.to_filter(), params.to_page());
    ok_response(PostPageData::from(&page))
}

#[instrument(skip(state, headers))]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult {
    if let Err(error) = authenticate(&state, &headers) {
        return err_response(&error);
    }
    let id: PostId = match id.parse() {
        Ok(id) => id,
        Err(error) => return err_response(&error),
    };
    match state.board.post(&id) {
        Ok(post) => ok_response(PostData::from(&post)),
        Err(error) => err_response(&error),
    }
}

#[instrument(skip(state, headers))]
pub async fn get_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult {
    if let Err(error) = authenticate(&state, &headers) {
        return err_response(&error);
    }
    let post_id: PostId = match post_id.parse() {
        Ok(id) => id,
        Err(error) => return err_response(&error),
    };
    match state.board.comment_tree(&post_id) {
        Ok(tree) => {
            let comments: Vec<CommentData> = tree.iter().map(CommentData::from_node).collect();
            ok_response(comments)
        }
        Err(error) => err_response(&error),
    }
}

pub async fn health() -> ApiResult {
    ok_response(HealthData {
        status: "ok".to_string(),
        version: soapbox::VERSION.to_string(),
    })
}

// =============================================================================
// Post endpoints
// =============================================================================

#[instrument(skip(state, headers, body))]
pub async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult {
    if let Err(error) = authenticate(&state, &headers) {
        return err_response(&error);
    }
    let request: CreatePostRequest = match parse_body(body) {
        Ok(request) => request,
        Err(error) => return err_response(&error),
    };

    let draft = PostDraft {
        title: request.title,
        description: request.description,
        picture: request.picture,
        author: request.username,
        tags: request.tags,
    };
    match state.board.create_post(draft) {
        Ok(post) => ok_response(PostData::from(&post)),
        Err(error) => err_response(&error),
    }
}

#[instrument(skip(state, headers, body))]
pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult {
    if let Err(error) = authenticate(&state, &headers) {
        return err_response(&error);
    }
    let id: PostId = match id.parse() {
        Ok(id) => id,
        Err(error) => return err_response(&error),
    };
    let request: UpdatePostRequest = match parse_body(body) {
        Ok(request) => request,
        Err(error) => return err_response(&error),
    };

    let update = PostUpdate {
        title: request.title,
        description: request.description,
        picture: request.picture,
        tags: request.tags,
    };
    match state.board.update_post(&id, &request.username, update) {
        Ok(post) => ok_response(PostData::from(&post)),
        Err(error) => err_response(&error),
    }
}

#[instrument(skip(state, headers, body))]
pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult {
    if let Err(error) = authenticate(&state, &headers) {
        return err_response(&error);
    }
    let id: PostId = match id.parse() {
        Ok(id) => id,
        Err(error) => return err_response(&error),
    };
    let request: DeletePostRequest = match parse_body(body) {
        Ok(request) => request,
        Err(error) => return err_response(&error),
    };

    match state.board.delete_post(&id, &request.username) {
        Ok(removed_comments) => ok_response(PostDeleteData {
            deleted: true,
            removed_comments,
        }),
        Err(error) => err_response(&error),
    }
}

#[instrument(skip(state, headers, body))]
pub async fn vote_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult {
    if let Err(error) = authenticate(&state, &headers) {
        return err_response(&error);
    }
    let id: PostId = match id.parse() {
        Ok(id) => id,
        Err(error) => return err_response(&error),
    };
    let request: VoteRequest = match parse_body(body) {
        Ok(request) => request,
        Err(error) => return err_response(&error),
    };

    match state.board.vote_post(&id, &request.username, request.vote_type) {
        Ok(post) => ok_response(PostData::from(&post)),
        Err(error) => err_response(&error),
    }
}

// =============================================================================
// Comment endpoints
// =============================================================================

#[instrument(skip(state, headers, body))]
pub async fn create_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult {
    if let Err(error) = authenticate(&state, &headers) {
        return err_response(&error);
    }
    let request: CreateCommentRequest = match parse_body(body) {
        Ok(request) => request,
        Err(error) => return err_response(&error),
    };

    let draft = CommentDraft {
        post_id: request.post_id,
        author: request.name,
        body: request.comments,
        parent_id: request.parent_id,
    };
    match state.board.create_comment(draft) {
        Ok(comment) => ok_response(CommentData::from(&comment)),
        Err(error) => err_response(&error),
    }
}

#[instrument(skip(state, headers, body))]
pub async fn update_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult {
    if let Err(error) = authenticate(&state, &headers) {
        return err_response(&error);
    }
    let id: CommentId = match id.parse() {
        Ok(id) => id,
        Err(error) => return err_response(&error),
    };
    let request: UpdateCommentRequest = match parse_body(body) {
        Ok(request) => request,
        Err(error) => return err_response(&error),
    };

    match state
        .board
        .update_comment(&id, &request.name, &request.comments)
    {
        Ok(comment) => ok_response(CommentData::from(&comment)),
        Err(error) => err_response(&error),
    }
}

#[instrument(skip(state, headers, body))]
pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult {
    if let Err(error) = authenticate(&state, &headers) {
        return err_response(&error);
    }
    let id: CommentId = match id.parse() {
        Ok(id) => id,
        Err(error) => return err_response(&error),
    };
    let request: DeleteCommentRequest = match parse_body(body) {
        Ok(request) => request,
        Err(error) => return err_response(&error),
    };

    match state.board.delete_comment(&id, &request.name) {
        Ok(removal) => ok_response(CommentDeleteData {
            deleted: true,
            removed_replies: removal.removed.len().saturating_sub(1),
        }),
        Err(error) => err_response(&error),
    }
}

#[instrument(skip(state, headers, body))]
pub async fn vote_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult {
    if let Err(error) = authenticate(&state, &headers) {
        return err_response(&error);
    }
    let id: CommentId = match id.parse() {
        Ok(id) => id,
        Err(error) => return err_response(&error),
    };
    let request: VoteRequest = match parse_body(body) {
        Ok(request) => request,
        Err(error) => return err_response(&error),
    };

    match state
        .board
        .vote_comment(&id, &request.username, request.vote_type)
    {
        Ok(comment) => ok_response(CommentData::from(&comment)),
        Err(error) => err_response(&error),
    }
}
