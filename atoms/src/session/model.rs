use serde::{Deserialize, Serialize};

/// Identity fields supplied by the identity provider.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct SessionUser {
    pub email: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
}

/// Per-request view of the visitor's identity.
///
/// The application never stores sessions; one is resolved from the request
/// and passed explicitly to whatever needs it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user: Option<SessionUser>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl Session {
    pub fn anonymous() -> Self {
        Self { user: None }
    }

    pub fn signed_in(user: SessionUser) -> Self {
        Self { user: Some(user) }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn email(&self) -> Option<&str> {
        self.user.as_ref().and_then(|u| non_empty(&u.email))
    }

    pub fn name(&self) -> Option<&str> {
        self.user.as_ref().and_then(|u| non_empty(&u.name))
    }

    pub fn image(&self) -> Option<&str> {
        self.user.as_ref().and_then(|u| non_empty(&u.image))
    }
}
