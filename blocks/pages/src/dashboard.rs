use lambda_http::{http::StatusCode, Body, Error, Response};

use crate::types::{DashboardProps, DashboardUser, Page, Redirect};
use tarefas_atoms::http;
use tarefas_atoms::session::Session;
use tarefas_atoms::store::{DocumentStore, StoreError};
use tarefas_atoms::tasks;

/// Server-side fetch for the dashboard: signed-in users only.
pub async fn load_dashboard(
    store: &dyn DocumentStore,
    session: &Session,
) -> Result<Page<DashboardProps>, StoreError> {
    let Some(email) = session.email() else {
        return Ok(Page::Redirect(Redirect::home()));
    };

    let tasks = tasks::list_user_tasks(store, email).await?;

    Ok(Page::Render(DashboardProps {
        user: DashboardUser {
            email: email.to_string(),
        },
        tasks,
    }))
}

/// GET /dashboard
pub async fn get_dashboard(
    store: &dyn DocumentStore,
    session: &Session,
) -> Result<Response<Body>, Error> {
    match load_dashboard(store, session).await {
        Ok(Page::Render(props)) => http::json(StatusCode::OK, &props),
        Ok(Page::Redirect(redirect)) => http::redirect(&redirect.destination),
        Err(e) => {
            tracing::error!("Failed to load dashboard: {}", e);
            http::internal_error()
        }
    }
}
