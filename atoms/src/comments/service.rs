use super::model::{comment_fields, Comment, COMMENTS_COLLECTION};
use crate::session::Session;
use crate::store::{now_timestamp, DocumentStore, Query, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum CommentError {
    #[error("Comment not found")]
    NotFound,

    #[error("Comment {comment_id} was written by someone else")]
    Forbidden { comment_id: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// All comments on a task. The store gives no ordering guarantee.
pub async fn list_task_comments(
    store: &dyn DocumentStore,
    task_id: &str,
) -> Result<Vec<Comment>, StoreError> {
    let query = Query::collection(COMMENTS_COLLECTION).where_eq("taskId", task_id);
    let docs = store.query(&query).await?;
    Ok(docs.iter().map(Comment::from_document).collect())
}

/// Append a comment as the session's user.
///
/// A no-op (`None`) when the text is empty or the session lacks either an
/// email or a display name.
pub async fn add_comment(
    store: &dyn DocumentStore,
    session: &Session,
    task_id: &str,
    text: &str,
) -> Result<Option<Comment>, StoreError> {
    if text.is_empty() {
        return Ok(None);
    }

    let (Some(email), Some(name)) = (session.email(), session.name()) else {
        tracing::debug!(task_id, "Comment skipped: session has no email or name");
        return Ok(None);
    };

    let created = now_timestamp();
    let doc = store
        .add(
            COMMENTS_COLLECTION,
            comment_fields(task_id, text, email, name, &created),
        )
        .await?;

    Ok(Some(Comment::from_document(&doc)))
}

/// Delete a comment on `task_id`. Only its author may delete it; the parent
/// task is never touched.
pub async fn delete_comment(
    store: &dyn DocumentStore,
    caller: &str,
    task_id: &str,
    comment_id: &str,
) -> Result<Comment, CommentError> {
    let comment = store
        .get(COMMENTS_COLLECTION, comment_id)
        .await?
        .map(|doc| Comment::from_document(&doc))
        .filter(|c| c.task_id == task_id)
        .ok_or(CommentError::NotFound)?;

    if !comment.is_authored_by(caller) {
        tracing::warn!(comment_id, "Rejected comment delete by non-author");
        return Err(CommentError::Forbidden {
            comment_id: comment_id.to_string(),
        });
    }

    store.delete(COMMENTS_COLLECTION, comment_id).await?;
    Ok(comment)
}
