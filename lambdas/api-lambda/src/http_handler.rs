use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, RequestExt, Response,
};
use pages_block::{dashboard, header, task_page};
use std::sync::Arc;
use tarefas_atoms::session::Session;
use tarefas_atoms::tasks;
use tarefas_shared::{auth, cors, AppState};

use lambda_http::http::header::{HeaderValue, VARY};

fn with_cors_headers(mut resp: Response<Body>, cors_origin: &str) -> Response<Body> {
    let headers = resp.headers_mut();
    headers.insert(
        "Access-Control-Allow-Origin",
        HeaderValue::from_str(cors_origin).unwrap_or_else(|_| HeaderValue::from_static("*")),
    );
    headers.insert("Access-Control-Allow-Credentials", HeaderValue::from_static("true"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET,POST,DELETE,OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type,Authorization,Cookie"),
    );
    headers.append(VARY, HeaderValue::from_static("Origin"));

    resp
}

fn finalize_response(resp: Result<Response<Body>, Error>, cors_origin: &str) -> Result<Response<Body>, Error> {
    resp.map(|r| with_cors_headers(r, cors_origin))
}

/// Main Lambda handler - resolves the session, then routes
pub(crate) async fn function_handler(event: Request, state: Arc<AppState>) -> Result<Response<Body>, Error> {
    let request_origin = event.headers().get("Origin").and_then(|v| v.to_str().ok());
    let cors_origin = cors::get_cors_origin(&state.config.allowed_origins, request_origin);
    tracing::info!("API invoked - Method: {} Path: {}", event.method(), event.uri().path());

    // Handle CORS preflight
    if event.method() == Method::OPTIONS {
        let resp = Response::builder()
            .status(StatusCode::OK)
            .body(Body::Empty)
            .map_err(Box::new)?;
        return Ok(with_cors_headers(resp, &cors_origin));
    }

    let session = state.resolve_session(event.headers()).await;
    finalize_response(route(&event, &state, &session).await, &cors_origin)
}

async fn route(event: &Request, state: &AppState, session: &Session) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    let body: &[u8] = event.body().as_ref();
    let store = state.store();

    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match (method, parts.as_slice()) {
        // GET /session - header view
        (&Method::GET, ["session"]) => header::get_session(session),

        // Sign-in flow
        (&Method::GET, ["auth", "signin", provider]) => auth::signin(&state.config, provider),
        (&Method::GET, ["auth", "callback"]) => {
            let params = event.query_string_parameters_ref();
            let code = params.and_then(|params| params.first("code"));
            let oauth_state = params.and_then(|params| params.first("state"));
            auth::callback(
                &state.http_client,
                &state.config,
                event.headers(),
                code,
                oauth_state,
            )
            .await
        }
        (&Method::POST, ["auth", "signout"]) => auth::signout(),

        // GET /dashboard - signed-in landing page
        (&Method::GET, ["dashboard"]) => dashboard::get_dashboard(store, session).await,

        // Task list
        (&Method::GET, ["tasks"]) => tasks::http::list_user_tasks(store, session).await,
        (&Method::POST, ["tasks"]) => {
            let resp = tasks::http::create_task(store, session, body).await?;
            if resp.status() == StatusCode::CREATED {
                publish_for(state, session).await;
            }
            Ok(resp)
        }
        (&Method::DELETE, ["tasks", task_id]) => {
            let resp = tasks::http::delete_task(store, session, task_id).await?;
            if resp.status() == StatusCode::NO_CONTENT {
                publish_for(state, session).await;
            }
            Ok(resp)
        }
        (&Method::GET, ["tasks", task_id, "share"]) => {
            tasks::http::share_task(store, session, &state.config.public_url, task_id).await
        }

        // Public task page and its comments
        (&Method::GET, ["task", task_id]) => {
            task_page::get_task_page(store, task_id, &state.config.date_format).await
        }
        (&Method::POST, ["task", task_id, "comments"]) => {
            task_page::post_comment(store, session, task_id, body).await
        }
        (&Method::DELETE, ["task", task_id, "comments", comment_id]) => {
            task_page::delete_comment(store, session, task_id, comment_id).await
        }

        _ => {
            tracing::warn!("No route for {} {}", method, path);
            not_found()
        }
    }
}

async fn publish_for(state: &AppState, session: &Session) {
    if let Some(email) = session.email() {
        state.publish_tasks(email).await;
    }
}

fn not_found() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(serde_json::json!({"error": "Not found"}).to_string().into())
        .map_err(Box::new)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use tarefas_atoms::session::SessionUser;
    use tarefas_atoms::store::MemoryStore;
    use tarefas_shared::config::AppConfig;
    use tarefas_shared::sockets::{register_connection, SinkError, SnapshotSink};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<serde_json::Value>>,
    }

    #[async_trait]
    impl SnapshotSink for RecordingSink {
        async fn post(&self, _connection_id: &str, payload: &[u8]) -> Result<(), SinkError> {
            self.sent.lock().await.push(serde_json::from_slice(payload).unwrap());
            Ok(())
        }
    }

    fn state() -> AppState {
        let config = AppConfig::from_lookup(|name| match name {
            "PUBLIC_URL" => Some("https://tarefas.example.com".to_string()),
            _ => None,
        })
        .unwrap();
        AppState::new(config, Arc::new(MemoryStore::new()))
    }

    fn ana() -> Session {
        Session::signed_in(SessionUser {
            email: Some("ana@x.com".to_string()),
            name: Some("Ana".to_string()),
            image: None,
        })
    }

    fn request(method: &str, uri: &str, body: &str) -> Request {
        lambda_http::http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn json_body(resp: &Response<Body>) -> serde_json::Value {
        serde_json::from_slice(resp.body().as_ref()).unwrap()
    }

    async fn create(state: &AppState, session: &Session, text: &str, public: bool) -> serde_json::Value {
        let body = serde_json::json!({ "task": text, "public": public }).to_string();
        let resp = route(&request("POST", "/tasks", &body), state, session).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        json_body(&resp)
    }

    #[tokio::test]
    async fn test_preflight_carries_cors_headers() {
        let state = Arc::new(state());
        let mut req = request("OPTIONS", "/tasks", "");
        req.headers_mut()
            .insert("Origin", HeaderValue::from_static("https://tarefas.example.com"));

        let resp = function_handler(req, state).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("Access-Control-Allow-Origin").unwrap(),
            "https://tarefas.example.com"
        );
    }

    #[tokio::test]
    async fn test_anonymous_requests() {
        let state = Arc::new(state());

        let resp = function_handler(request("POST", "/tasks", r#"{"task":"x"}"#), state.clone())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = function_handler(request("GET", "/dashboard", ""), state.clone()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(resp.headers().get("Location").unwrap(), "/");

        let resp = function_handler(request("GET", "/session", ""), state.clone()).await.unwrap();
        assert_eq!(json_body(&resp)["status"], "unauthenticated");

        let resp = function_handler(request("GET", "/nope", ""), state).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_task_lifecycle() {
        let state = state();
        let session = ana();

        let created = create(&state, &session, "Estudar Rust", true).await;
        let task_id = created["id"].as_str().unwrap().to_string();

        let resp = route(&request("GET", "/tasks", ""), &state, &session).await.unwrap();
        assert_eq!(json_body(&resp).as_array().unwrap().len(), 1);

        let resp = route(&request("GET", &format!("/tasks/{}/share", task_id), ""), &state, &session)
            .await
            .unwrap();
        assert_eq!(
            json_body(&resp)["url"],
            format!("https://tarefas.example.com/task/{}", task_id)
        );

        let resp = route(&request("DELETE", &format!("/tasks/{}", task_id), ""), &state, &session)
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = route(&request("GET", "/tasks", ""), &state, &session).await.unwrap();
        assert_eq!(json_body(&resp), serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_empty_task_is_ignored() {
        let state = state();

        let resp = route(&request("POST", "/tasks", r#"{"task":""}"#), &state, &ana())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_public_page_and_comments() {
        let state = state();
        let session = ana();
        let created = create(&state, &session, "Ler", true).await;
        let task_id = created["id"].as_str().unwrap();

        let path = format!("/task/{}/comments", task_id);
        let resp = route(&request("POST", &path, r#"{"comment":"Boa!"}"#), &state, &session)
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let comment_id = json_body(&resp)["id"].as_str().unwrap().to_string();

        let resp = route(&request("GET", &format!("/task/{}", task_id), ""), &state, &Session::anonymous())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let page = json_body(&resp);
        assert_eq!(page["item"]["task"], "Ler");
        assert_eq!(page["allComments"][0]["comment"], "Boa!");

        let resp = route(
            &request("DELETE", &format!("{}/{}", path, comment_id), ""),
            &state,
            &session,
        )
        .await
        .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_private_task_page_redirects_home() {
        let state = state();
        let created = create(&state, &ana(), "Segredo", false).await;

        let path = format!("/task/{}", created["id"].as_str().unwrap());
        let resp = route(&request("GET", &path, ""), &state, &ana()).await.unwrap();

        assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    }

    #[tokio::test]
    async fn test_writes_publish_snapshots() {
        let sink = Arc::new(RecordingSink::default());
        let state = state().with_sockets(sink.clone());
        register_connection(state.store(), "conn-1", "ana@x.com").await.unwrap();

        create(&state, &ana(), "Primeira", false).await;
        create(&state, &ana(), "Segunda", false).await;

        let sent = sink.sent.lock().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1]["type"], "tasks_snapshot");
        let texts: Vec<&str> = sent[1]["tasks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["task"].as_str().unwrap())
            .collect();
        assert_eq!(texts.len(), 2);
        assert!(texts.contains(&"Primeira") && texts.contains(&"Segunda"));
    }
}
