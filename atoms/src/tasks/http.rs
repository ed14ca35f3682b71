use lambda_http::{http::StatusCode, Body, Error, Response};
use url::Url;

use super::form::{SubmitOutcome, TaskEntryForm};
use super::model::CreateTaskPayload;
use super::service::{self, TaskError};
use crate::http;
use crate::session::Session;
use crate::share;
use crate::store::DocumentStore;

/// GET /tasks - the caller's tasks, newest first
pub async fn list_user_tasks(
    store: &dyn DocumentStore,
    session: &Session,
) -> Result<Response<Body>, Error> {
    let Some(email) = session.email() else {
        return http::unauthorized();
    };

    match service::list_user_tasks(store, email).await {
        Ok(tasks) => http::json(StatusCode::OK, &tasks),
        Err(e) => {
            tracing::error!("Failed to list tasks: {}", e);
            http::internal_error()
        }
    }
}

/// POST /tasks - submit the task entry form
pub async fn create_task(
    store: &dyn DocumentStore,
    session: &Session,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let Some(email) = session.email() else {
        return http::unauthorized();
    };

    let payload: CreateTaskPayload = match http::parse_body(body) {
        Ok(payload) => payload,
        Err(resp) => return Ok(resp),
    };

    let mut form = TaskEntryForm::with_draft(payload.task, payload.public);
    match form.submit(store, email).await {
        SubmitOutcome::Created(task) => http::json(StatusCode::CREATED, &task),
        SubmitOutcome::Ignored => http::no_content(),
        // Save failures are only logged; the caller gets no error to show.
        SubmitOutcome::NotSaved => http::not_saved("saved"),
    }
}

/// DELETE /tasks/{id} - owner only
pub async fn delete_task(
    store: &dyn DocumentStore,
    session: &Session,
    task_id: &str,
) -> Result<Response<Body>, Error> {
    let Some(email) = session.email() else {
        return http::unauthorized();
    };

    match service::delete_task(store, email, task_id).await {
        Ok(_) => http::no_content(),
        Err(TaskError::NotFound) => http::error(StatusCode::NOT_FOUND, "Task not found"),
        Err(TaskError::Forbidden { .. }) => http::error(StatusCode::FORBIDDEN, "Not the task owner"),
        Err(TaskError::Store(e)) => {
            tracing::error!("Failed to delete task {}: {}", task_id, e);
            http::internal_error()
        }
    }
}

/// GET /tasks/{id}/share - share link for one of the caller's public tasks
pub async fn share_task(
    store: &dyn DocumentStore,
    session: &Session,
    base_url: &Url,
    task_id: &str,
) -> Result<Response<Body>, Error> {
    let Some(email) = session.email() else {
        return http::unauthorized();
    };

    let task = match service::get_task(store, task_id).await {
        Ok(task) => task,
        Err(e) => {
            tracing::error!("Failed to load task {}: {}", task_id, e);
            return http::internal_error();
        }
    };

    match task {
        Some(task) if task.public && task.is_owned_by(email) => {
            match share::share_link(base_url, &task.id) {
                Ok(link) => http::json(StatusCode::OK, &link),
                Err(e) => {
                    tracing::error!("Cannot build share link: {}", e);
                    http::internal_error()
                }
            }
        }
        _ => http::error(StatusCode::NOT_FOUND, "Task not found"),
    }
}
