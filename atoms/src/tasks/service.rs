use super::model::{task_fields, CreateTaskPayload, Task, TASKS_COLLECTION};
use crate::store::{now_timestamp, Direction, DocumentStore, Query, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Task not found")]
    NotFound,

    #[error("Task {task_id} is not owned by the caller")]
    Forbidden { task_id: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The owner's tasks, newest first.
pub fn owner_query(email: &str) -> Query {
    Query::collection(TASKS_COLLECTION)
        .where_eq("user", email)
        .order_by("created", Direction::Desc)
}

/// Load all tasks owned by `email` (pure domain logic, no HTTP)
pub async fn list_user_tasks(store: &dyn DocumentStore, email: &str) -> Result<Vec<Task>, StoreError> {
    let docs = store.query(&owner_query(email)).await?;
    Ok(docs.iter().map(Task::from_document).collect())
}

/// Create a new task owned by `owner`.
///
/// Returns `None` without writing anything when the text is empty.
pub async fn create_task(
    store: &dyn DocumentStore,
    owner: &str,
    payload: CreateTaskPayload,
) -> Result<Option<Task>, StoreError> {
    if payload.task.is_empty() {
        return Ok(None);
    }

    let created = now_timestamp();
    let doc = store
        .add(
            TASKS_COLLECTION,
            task_fields(owner, &payload.task, payload.public, &created),
        )
        .await?;

    tracing::info!(task_id = %doc.id, public = payload.public, "Task created");
    Ok(Some(Task::from_document(&doc)))
}

/// Get a specific task
pub async fn get_task(store: &dyn DocumentStore, task_id: &str) -> Result<Option<Task>, StoreError> {
    let doc = store.get(TASKS_COLLECTION, task_id).await?;
    Ok(doc.as_ref().map(Task::from_document))
}

/// A task that may be shown on its detail page: it exists and is public.
pub async fn get_public_task(
    store: &dyn DocumentStore,
    task_id: &str,
) -> Result<Option<Task>, StoreError> {
    Ok(get_task(store, task_id).await?.filter(|task| task.public))
}

/// Delete a task on behalf of `caller`. Only the owner may delete.
///
/// Comments pointing at the task are left in place.
pub async fn delete_task(
    store: &dyn DocumentStore,
    caller: &str,
    task_id: &str,
) -> Result<Task, TaskError> {
    let task = get_task(store, task_id).await?.ok_or(TaskError::NotFound)?;

    if !task.is_owned_by(caller) {
        tracing::warn!(task_id, "Rejected task delete by non-owner");
        return Err(TaskError::Forbidden {
            task_id: task_id.to_string(),
        });
    }

    store.delete(TASKS_COLLECTION, task_id).await?;
    Ok(task)
}
