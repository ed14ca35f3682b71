use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::Serialize;

/// JSON response with the permissive CORS header every atom route carries.
pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(value)?.into())
        .map_err(Box::new)?)
}

pub fn error(status: StatusCode, message: &str) -> Result<Response<Body>, Error> {
    json(status, &serde_json::json!({ "error": message }))
}

pub fn no_content() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .body(Body::Empty)
        .map_err(Box::new)?)
}

/// Non-permanent redirect (307).
pub fn redirect(destination: &str) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::TEMPORARY_REDIRECT)
        .header("Location", destination)
        .header("Access-Control-Allow-Origin", "*")
        .body(Body::Empty)
        .map_err(Box::new)?)
}

pub fn unauthorized() -> Result<Response<Body>, Error> {
    error(StatusCode::UNAUTHORIZED, "Not signed in")
}

/// 500 without any backend detail; the cause is logged by the caller.
pub fn internal_error() -> Result<Response<Body>, Error> {
    error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

/// Write the store rejected. Logged only; the caller is told nothing failed
/// beyond `{"<flag>": false}`.
pub fn not_saved(flag: &str) -> Result<Response<Body>, Error> {
    let mut body = serde_json::Map::new();
    body.insert(flag.to_string(), serde_json::Value::Bool(false));
    json(StatusCode::ACCEPTED, &body)
}

/// Parse a JSON request body, mapping failures to a 400 response.
pub fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, Response<Body>> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::warn!("Invalid request body: {}", e);
        let message = format!("Invalid request body: {}", e);
        Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(serde_json::json!({ "error": message }).to_string().into())
            .unwrap_or_else(|_| Response::new(Body::Empty))
    })
}
