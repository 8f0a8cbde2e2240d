use chrono::{DateTime, Utc};

use super::{Actor, LifecycleError};
use crate::db::models::travel_request::{Comment, TravelRequest};
use crate::utils::ids::{generate_id, COMMENT_PREFIX};

/// Builds a thread message authored by `author`. Content is checked on append.
pub fn new_comment(author: &Actor, content: &str, at: DateTime<Utc>) -> Comment {
    Comment {
        id: generate_id(COMMENT_PREFIX),
        author: author.name.clone(),
        role: author.role,
        content: content.to_string(),
        created_at: at,
    }
}

/// Appends to the thread. Comments are independent of the request status and
/// do not enter the audit trail. Callers authorize first.
pub fn append(request: &mut TravelRequest, comment: Comment) -> Result<(), LifecycleError> {
    if comment.content.trim().is_empty() {
        return Err(LifecycleError::Validation("comment must not be empty".to_string()));
    }
    request.comments.push(comment);
    Ok(())
}
