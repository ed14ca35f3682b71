use std::sync::Arc;

use aws_lambda_events::apigw::ApiGatewayWebsocketProxyRequest;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tarefas_shared::{telemetry, AppState};

mod handler;
use handler::function_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    telemetry::init();

    let state = Arc::new(AppState::from_env().await?);

    run(service_fn(move |event: LambdaEvent<ApiGatewayWebsocketProxyRequest>| {
        let state = Arc::clone(&state);
        async move { function_handler(event, state).await }
    }))
    .await
}
