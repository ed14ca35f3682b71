use chrono::format::{Item, StrftimeItems};
use std::env;
use url::Url;

pub const DEFAULT_TABLE_NAME: &str = "tarefas";
pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:3000";
pub const DEFAULT_DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is not a valid URL: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("STORE_BACKEND must be `dynamo` or `memory`, got `{0}`")]
    UnknownBackend(String),

    #[error("DATE_FORMAT `{0}` is not a valid strftime pattern")]
    InvalidDateFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Dynamo,
    Memory,
}

/// OAuth client used for the hosted sign-in flow.
#[derive(Debug, Clone, PartialEq)]
pub struct CognitoSettings {
    pub client_id: String,
    pub client_secret: Option<String>,
    /// Hosted UI base, always with a scheme
    pub domain: Url,
    pub redirect_uri: String,
}

/// Everything read from the environment at cold start.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub table_name: String,
    pub public_url: Url,
    pub store_backend: StoreBackend,
    pub date_format: String,
    pub cognito: Option<CognitoSettings>,
    pub websocket_endpoint: Option<String>,
    pub allowed_origins: Vec<String>,
}

fn parse_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|source| ConfigError::InvalidUrl { name, source })
}

fn is_valid_date_format(pattern: &str) -> bool {
    StrftimeItems::new(pattern).all(|item| !matches!(item, Item::Error))
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the config from any variable source (the process environment in
    /// production, a map in tests). Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let table_name = var("TABLE_NAME").unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string());

        let public_url = var("PUBLIC_URL")
            .or_else(|| var("NEXT_PUBLIC_URL"))
            .unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_string());
        let public_url = parse_url("PUBLIC_URL", &public_url)?;

        let store_backend = match var("STORE_BACKEND").as_deref() {
            None | Some("dynamo") => StoreBackend::Dynamo,
            Some("memory") => StoreBackend::Memory,
            Some(other) => return Err(ConfigError::UnknownBackend(other.to_string())),
        };

        let date_format = var("DATE_FORMAT").unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string());
        if !is_valid_date_format(&date_format) {
            return Err(ConfigError::InvalidDateFormat(date_format));
        }

        let cognito = match (var("COGNITO_CLIENT_ID"), var("COGNITO_DOMAIN")) {
            (Some(client_id), Some(domain)) => {
                let domain = if domain.contains("://") {
                    domain
                } else {
                    format!("https://{}", domain)
                };
                let redirect_uri = var("AUTH_REDIRECT_URI").unwrap_or_else(|| {
                    format!("{}/auth/callback", public_url.as_str().trim_end_matches('/'))
                });
                Some(CognitoSettings {
                    client_id,
                    client_secret: var("COGNITO_CLIENT_SECRET"),
                    domain: parse_url("COGNITO_DOMAIN", &domain)?,
                    redirect_uri,
                })
            }
            _ => None,
        };

        let allowed_origins = match var("ALLOWED_ORIGINS") {
            Some(list) => list
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            None => vec![public_url.origin().ascii_serialization()],
        };

        Ok(AppConfig {
            table_name,
            public_url,
            store_backend,
            date_format,
            cognito,
            websocket_endpoint: var("WEBSOCKET_ENDPOINT"),
            allowed_origins,
        })
    }
}
