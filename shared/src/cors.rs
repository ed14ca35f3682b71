/// Origin echoed in `Access-Control-Allow-Origin`.
///
/// The request origin is echoed when it is on the allow list; anything else
/// gets the first allowed origin.
pub fn get_cors_origin(allowed: &[String], request_origin: Option<&str>) -> String {
    match request_origin {
        Some(origin) if allowed.iter().any(|a| a == origin) => origin.to_string(),
        _ => allowed
            .first()
            .cloned()
            .unwrap_or_else(|| "*".to_string()),
    }
}
