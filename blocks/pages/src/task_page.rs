use chrono::{DateTime, Utc};
use lambda_http::{http::StatusCode, Body, Error, Response};
use std::fmt::Write;

use crate::types::{Page, Redirect, TaskItem, TaskPageProps};
use tarefas_atoms::comments::{self, Comment};
use tarefas_atoms::http;
use tarefas_atoms::session::Session;
use tarefas_atoms::store::{DocumentStore, StoreError};
use tarefas_atoms::tasks::{self, Task};

/// Render a stored RFC 3339 timestamp as a display date.
///
/// Unparseable input (or a bad pattern) yields the raw value.
pub fn format_created(created: &str, date_format: &str) -> String {
    let Ok(at) = DateTime::parse_from_rfc3339(created) else {
        tracing::warn!(created, "Task has an unreadable creation time");
        return created.to_string();
    };

    let mut out = String::new();
    match write!(out, "{}", at.with_timezone(&Utc).format(date_format)) {
        Ok(()) => out,
        Err(_) => created.to_string(),
    }
}

fn task_item(task: &Task, date_format: &str) -> TaskItem {
    TaskItem {
        task: task.task.clone(),
        public: task.public,
        created: format_created(&task.created, date_format),
        user: task.user.clone(),
        task_id: task.id.clone(),
    }
}

/// Server-side fetch for the task detail page.
///
/// Missing or private tasks redirect home; otherwise the task is joined with
/// every comment that points at it.
pub async fn load_task_page(
    store: &dyn DocumentStore,
    task_id: &str,
    date_format: &str,
) -> Result<Page<TaskPageProps>, StoreError> {
    let Some(task) = tasks::get_public_task(store, task_id).await? else {
        return Ok(Page::Redirect(Redirect::home()));
    };

    let all_comments = comments::list_task_comments(store, task_id).await?;

    Ok(Page::Render(TaskPageProps {
        item: task_item(&task, date_format),
        all_comments,
    }))
}

/// Comment list held by a rendered detail page.
///
/// Starts from the server-loaded comments and is updated locally after each
/// successful write; store failures are logged and leave the list as is.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentThread {
    task_id: String,
    comments: Vec<Comment>,
}

impl CommentThread {
    pub fn new(props: &TaskPageProps) -> Self {
        Self {
            task_id: props.item.task_id.clone(),
            comments: props.all_comments.clone(),
        }
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// Whether the trash action is offered for `comment`.
    pub fn can_delete(&self, session: &Session, comment: &Comment) -> bool {
        session.email().is_some_and(|email| comment.is_authored_by(email))
    }

    pub async fn submit(
        &mut self,
        store: &dyn DocumentStore,
        session: &Session,
        text: &str,
    ) -> Option<Comment> {
        match comments::add_comment(store, session, &self.task_id, text).await {
            Ok(Some(comment)) => {
                self.comments.push(comment.clone());
                Some(comment)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::error!("Failed to save comment: {}", e);
                None
            }
        }
    }

    pub async fn remove(
        &mut self,
        store: &dyn DocumentStore,
        session: &Session,
        comment_id: &str,
    ) -> bool {
        let Some(email) = session.email() else {
            return false;
        };

        match comments::delete_comment(store, email, &self.task_id, comment_id).await {
            Ok(_) => {
                self.comments.retain(|c| c.id != comment_id);
                true
            }
            Err(e) => {
                tracing::error!("Failed to delete comment {}: {}", comment_id, e);
                false
            }
        }
    }
}

/// GET /task/{id}
pub async fn get_task_page(
    store: &dyn DocumentStore,
    task_id: &str,
    date_format: &str,
) -> Result<Response<Body>, Error> {
    match load_task_page(store, task_id, date_format).await {
        Ok(Page::Render(props)) => http::json(StatusCode::OK, &props),
        Ok(Page::Redirect(redirect)) => http::redirect(&redirect.destination),
        Err(e) => {
            tracing::error!("Failed to load task page {}: {}", task_id, e);
            http::internal_error()
        }
    }
}

/// Comments can only be written against a task whose page is reachable.
async fn ensure_reachable(
    store: &dyn DocumentStore,
    task_id: &str,
) -> Result<Option<Response<Body>>, Error> {
    match tasks::get_public_task(store, task_id).await {
        Ok(Some(_)) => Ok(None),
        Ok(None) => Ok(Some(http::redirect(&Redirect::home().destination)?)),
        Err(e) => {
            tracing::error!("Failed to load task {}: {}", task_id, e);
            Ok(Some(http::internal_error()?))
        }
    }
}

/// POST /task/{id}/comments
pub async fn post_comment(
    store: &dyn DocumentStore,
    session: &Session,
    task_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    if let Some(resp) = ensure_reachable(store, task_id).await? {
        return Ok(resp);
    }
    comments::http::add_comment(store, session, task_id, body).await
}

/// DELETE /task/{id}/comments/{cid}
pub async fn delete_comment(
    store: &dyn DocumentStore,
    session: &Session,
    task_id: &str,
    comment_id: &str,
) -> Result<Response<Body>, Error> {
    if let Some(resp) = ensure_reachable(store, task_id).await? {
        return Ok(resp);
    }
    comments::http::delete_comment(store, session, task_id, comment_id).await
}
