use lambda_http::{http::StatusCode, Body, Error, Response};

use crate::types::{HeaderLinks, HeaderView, SessionStatus};
use tarefas_atoms::http;
use tarefas_atoms::session::Session;

pub fn header_view(session: &Session) -> HeaderView {
    let status = if session.is_authenticated() {
        SessionStatus::Authenticated
    } else {
        SessionStatus::Unauthenticated
    };

    HeaderView {
        status,
        user: session.user.clone(),
        links: HeaderLinks {
            dashboard: session.is_authenticated(),
        },
    }
}

/// GET /session
pub fn get_session(session: &Session) -> Result<Response<Body>, Error> {
    http::json(StatusCode::OK, &header_view(session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarefas_atoms::session::SessionUser;

    #[test]
    fn test_signed_in_header() {
        let session = Session::signed_in(SessionUser {
            email: Some("a@x.com".to_string()),
            name: Some("Ana".to_string()),
            image: Some("https://img.example.com/ana.png".to_string()),
        });

        let view = header_view(&session);

        assert_eq!(view.status, SessionStatus::Authenticated);
        assert!(view.links.dashboard);
        assert_eq!(view.user.unwrap().name.as_deref(), Some("Ana"));
    }

    #[test]
    fn test_anonymous_header_serializes() {
        let view = header_view(&Session::anonymous());

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "unauthenticated",
                "user": null,
                "links": {"dashboard": false}
            })
        );
    }
}
