//! Field-level validation shared by post and comment constructors.
//!
//! Every check runs inside the entity constructors, so the limits hold no
//! matter which entry point creates or edits an entity.

use crate::board::constants::{
    MAX_COMMENT_BODY_SIZE, MAX_DESCRIPTION_SIZE, MAX_PICTURE_URL_SIZE, MAX_TAGS_COUNT,
    MAX_TAG_SIZE, MAX_TITLE_SIZE, MAX_USERNAME_SIZE,
};
use crate::error::{Result, SoapboxError};

/// Validates a voter or author username.
///
/// An empty username means the request carries no usable identity, which is
/// an authentication failure rather than a validation one.
pub(crate) fn validate_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(SoapboxError::unauthenticated("a username is required"));
    }
    if username.len() > MAX_USERNAME_SIZE {
        return Err(SoapboxError::validation(format!(
            "username exceeds {} bytes",
            MAX_USERNAME_SIZE
        )));
    }
    Ok(())
}

/// Validates a post title.
pub(crate) fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(SoapboxError::validation("title cannot be empty"));
    }
    if title.len() > MAX_TITLE_SIZE {
        return Err(SoapboxError::validation(format!(
            "title exceeds {} bytes",
            MAX_TITLE_SIZE
        )));
    }
    Ok(())
}

/// Validates a post description.
pub(crate) fn validate_description(description: &str) -> Result<()> {
    if description.trim().is_empty() {
        return Err(SoapboxError::validation("description cannot be empty"));
    }
    if description.len() > MAX_DESCRIPTION_SIZE {
        return Err(SoapboxError::validation(format!(
            "description exceeds {} bytes",
            MAX_DESCRIPTION_SIZE
        )));
    }
    Ok(())
}

/// Validates a picture URL. An empty URL is allowed (no picture).
pub(crate) fn validate_picture(picture: &str) -> Result<()> {
    if picture.len() > MAX_PICTURE_URL_SIZE {
        return Err(SoapboxError::validation(format!(
            "picture URL exceeds {} bytes",
            MAX_PICTURE_URL_SIZE
        )));
    }
    Ok(())
}

/// Validates a post tag list.
pub(crate) fn validate_tags(tags: &[String]) -> Result<()> {
    if tags.len() > MAX_TAGS_COUNT {
        return Err(SoapboxError::validation(format!(
            "at most {} tags allowed",
            MAX_TAGS_COUNT
        )));
    }
    for tag in tags {
        if tag.trim().is_empty() {
            return Err(SoapboxError::validation("tags cannot be empty"));
        }
        if tag.len() > MAX_TAG_SIZE {
            return Err(SoapboxError::validation(format!(
                "tag '{}' exceeds {} bytes",
                tag, MAX_TAG_SIZE
            )));
        }
    }
    Ok(())
}

/// Validates a comment body.
pub(crate) fn validate_comment_body(body: &str) -> Result<()> {
    if body.trim().is_empty() {
        return Err(SoapboxError::validation("comment text cannot be empty"));
    }
    if body.len() > MAX_COMMENT_BODY_SIZE {
        return Err(SoapboxError::validation(format!(
            "comment text exceeds {} bytes",
            MAX_COMMENT_BODY_SIZE
        )));
    }
    Ok(())
}
