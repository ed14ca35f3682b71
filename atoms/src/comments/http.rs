use lambda_http::{http::StatusCode, Body, Error, Response};

use super::model::CreateCommentPayload;
use super::service::{self, CommentError};
use crate::http;
use crate::session::Session;
use crate::store::DocumentStore;

/// POST a comment on `task_id` as the session's user
pub async fn add_comment(
    store: &dyn DocumentStore,
    session: &Session,
    task_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    if !session.is_authenticated() {
        return http::unauthorized();
    }

    let payload: CreateCommentPayload = match http::parse_body(body) {
        Ok(payload) => payload,
        Err(resp) => return Ok(resp),
    };

    match service::add_comment(store, session, task_id, &payload.comment).await {
        Ok(Some(comment)) => http::json(StatusCode::CREATED, &comment),
        Ok(None) => http::no_content(),
        Err(e) => {
            tracing::error!("Failed to save comment on {}: {}", task_id, e);
            http::not_saved("saved")
        }
    }
}

/// DELETE one of the caller's own comments
pub async fn delete_comment(
    store: &dyn DocumentStore,
    session: &Session,
    task_id: &str,
    comment_id: &str,
) -> Result<Response<Body>, Error> {
    let Some(email) = session.email() else {
        return http::unauthorized();
    };

    match service::delete_comment(store, email, task_id, comment_id).await {
        Ok(_) => http::no_content(),
        Err(CommentError::NotFound) => http::error(StatusCode::NOT_FOUND, "Comment not found"),
        Err(CommentError::Forbidden { .. }) => {
            http::error(StatusCode::FORBIDDEN, "Not the comment author")
        }
        Err(CommentError::Store(e)) => {
            tracing::error!("Failed to delete comment {}: {}", comment_id, e);
            http::not_saved("deleted")
        }
    }
}
