use aws_lambda_events::apigw::{ApiGatewayProxyResponse, ApiGatewayWebsocketProxyRequest};
use aws_lambda_events::encodings::Body;
use lambda_runtime::{Error, LambdaEvent};
use std::sync::Arc;

use tarefas_atoms::session::Session;
use tarefas_shared::sockets::{self, WebSocketAction, WebSocketMessage};
use tarefas_shared::AppState;

fn response(status_code: i64, message: &str) -> ApiGatewayProxyResponse {
    ApiGatewayProxyResponse {
        status_code,
        body: Some(Body::Text(
            serde_json::json!({ "message": message }).to_string(),
        )),
        ..Default::default()
    }
}

/// WebSocket route handler: `$connect`, `$disconnect`, and message routes.
pub(crate) async fn function_handler(
    event: LambdaEvent<ApiGatewayWebsocketProxyRequest>,
    state: Arc<AppState>,
) -> Result<ApiGatewayProxyResponse, Error> {
    let request = event.payload;
    let route = request
        .request_context
        .route_key
        .clone()
        .unwrap_or_else(|| "$default".to_string());
    let Some(connection_id) = request.request_context.connection_id.clone() else {
        tracing::warn!("WebSocket event without a connection id on route {}", route);
        return Ok(response(400, "Missing connection id"));
    };
    tracing::info!("WebSocket {} on {}", route, connection_id);

    match route.as_str() {
        "$connect" => {
            let session = state.resolve_session(&request.headers).await;
            Ok(connect(&state, &connection_id, &session).await)
        }
        "$disconnect" => Ok(disconnect(&state, &connection_id).await),
        _ => Ok(on_message(&state, &connection_id, request.body.as_deref()).await),
    }
}

/// Only signed-in users may open a connection; it is keyed to their email.
async fn connect(state: &AppState, connection_id: &str, session: &Session) -> ApiGatewayProxyResponse {
    let Some(email) = session.email() else {
        return response(401, "Not signed in");
    };

    match sockets::register_connection(state.store(), connection_id, email).await {
        Ok(()) => response(200, "Connected"),
        Err(e) => {
            tracing::error!("Failed to register connection {}: {}", connection_id, e);
            response(500, "Failed to connect")
        }
    }
}

async fn disconnect(state: &AppState, connection_id: &str) -> ApiGatewayProxyResponse {
    if let Err(e) = sockets::remove_connection(state.store(), connection_id).await {
        tracing::warn!("Failed to remove connection {}: {}", connection_id, e);
    }
    response(200, "Disconnected")
}

async fn on_message(state: &AppState, connection_id: &str, body: Option<&str>) -> ApiGatewayProxyResponse {
    let message: WebSocketMessage = match body.map(serde_json::from_str::<WebSocketMessage>) {
        Some(Ok(message)) => message,
        _ => return response(400, "Invalid message"),
    };

    match message.parsed_action() {
        Some(WebSocketAction::Subscribe) => subscribe(state, connection_id).await,
        None => {
            tracing::info!("Ignoring unknown action {}", message.action);
            response(400, "Unknown action")
        }
    }
}

/// Reply with the owner's current task list; later writes push fresh snapshots.
async fn subscribe(state: &AppState, connection_id: &str) -> ApiGatewayProxyResponse {
    let owner = match sockets::connection_owner(state.store(), connection_id).await {
        Ok(Some(owner)) => owner,
        Ok(None) => return response(403, "Unknown connection"),
        Err(e) => {
            tracing::error!("Failed to look up connection {}: {}", connection_id, e);
            return response(500, "Failed to subscribe");
        }
    };

    if let Some(sink) = &state.sockets {
        sockets::send_task_snapshot(state.store(), sink.as_ref(), &owner, connection_id).await;
    }
    response(200, "Subscribed")
}
