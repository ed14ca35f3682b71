use std::sync::Arc;

use lambda_http::{run, service_fn, Error, Request};
use tarefas_shared::{telemetry, AppState};

mod http_handler;
use http_handler::function_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    telemetry::init();

    let state = Arc::new(AppState::from_env().await?);

    run(service_fn(move |event: Request| {
        let state = Arc::clone(&state);
        async move { function_handler(event, state).await }
    }))
    .await
}
