use serde::Serialize;
use url::Url;

pub const SHARE_CONFIRMATION: &str = "URL copiada com sucesso!";

#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("base URL {0} cannot carry a path")]
    CannotBeBase(String),
}

/// Link handed to the client for its clipboard, with the confirmation text.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ShareLink {
    pub url: String,
    pub message: String,
}

/// `{base}/task/{task_id}`; the id is percent-encoded as a path segment.
pub fn share_url(base: &Url, task_id: &str) -> Result<Url, ShareError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ShareError::CannotBeBase(base.to_string()))?
        .pop_if_empty()
        .push("task")
        .push(task_id);
    Ok(url)
}

pub fn share_link(base: &Url, task_id: &str) -> Result<ShareLink, ShareError> {
    Ok(ShareLink {
        url: share_url(base, task_id)?.to_string(),
        message: SHARE_CONFIRMATION.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_url_from_root() {
        let base = Url::parse("https://tarefas.example.com").unwrap();
        assert_eq!(
            share_url(&base, "abc123").unwrap().as_str(),
            "https://tarefas.example.com/task/abc123"
        );
    }

    #[test]
    fn test_share_url_keeps_base_path() {
        let base = Url::parse("https://example.com/app/").unwrap();
        assert_eq!(
            share_url(&base, "abc").unwrap().as_str(),
            "https://example.com/app/task/abc"
        );

        let base = Url::parse("https://example.com/app").unwrap();
        assert_eq!(
            share_url(&base, "abc").unwrap().as_str(),
            "https://example.com/app/task/abc"
        );
    }

    #[test]
    fn test_share_url_encodes_id() {
        let base = Url::parse("https://example.com").unwrap();
        assert_eq!(
            share_url(&base, "a/b c").unwrap().as_str(),
            "https://example.com/task/a%2Fb%20c"
        );
    }

    #[test]
    fn test_cannot_be_base_is_rejected() {
        let base = Url::parse("mailto:someone@example.com").unwrap();
        assert!(share_url(&base, "abc").is_err());
    }
}
