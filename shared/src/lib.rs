//! Per-process state and cross-cutting plumbing shared by the Lambda binaries.

pub mod auth;
pub mod config;
pub mod cors;
pub mod sockets;
pub mod telemetry;

use std::sync::Arc;

use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use aws_sdk_dynamodb::Client as DynamoClient;
use lambda_http::http::HeaderMap;

use config::{AppConfig, ConfigError, StoreBackend};
use sockets::{ApiGatewaySink, SnapshotSink};
use tarefas_atoms::session::Session;
use tarefas_atoms::store::{DocumentStore, DynamoStore, LiveStore, MemoryStore};

/// Built once at cold start and shared by every invocation.
pub struct AppState {
    pub config: AppConfig,
    pub store: LiveStore,
    pub cognito_client: Option<CognitoClient>,
    pub sockets: Option<Arc<dyn SnapshotSink>>,
    pub http_client: reqwest::Client,
}

impl AppState {
    pub async fn from_env() -> Result<Self, ConfigError> {
        let config = AppConfig::from_env()?;
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

        let inner: Arc<dyn DocumentStore> = match config.store_backend {
            StoreBackend::Dynamo => Arc::new(DynamoStore::new(
                DynamoClient::new(&sdk_config),
                config.table_name.clone(),
            )),
            StoreBackend::Memory => {
                tracing::warn!("Using the in-memory store; data is lost on cold start");
                Arc::new(MemoryStore::new())
            }
        };

        let cognito_client = config
            .cognito
            .as_ref()
            .map(|_| CognitoClient::new(&sdk_config));

        let sockets = config.websocket_endpoint.as_deref().map(|endpoint| {
            Arc::new(ApiGatewaySink::new(&sdk_config, endpoint)) as Arc<dyn SnapshotSink>
        });

        tracing::info!(
            table = %config.table_name,
            backend = ?config.store_backend,
            sign_in = cognito_client.is_some(),
            realtime = sockets.is_some(),
            "App state ready"
        );

        Ok(Self {
            store: LiveStore::new(inner),
            cognito_client,
            sockets,
            http_client: reqwest::Client::new(),
            config,
        })
    }

    /// State without any AWS clients, for local runs and tests.
    pub fn new(config: AppConfig, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            config,
            store: LiveStore::new(store),
            cognito_client: None,
            sockets: None,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn with_sockets(mut self, sink: Arc<dyn SnapshotSink>) -> Self {
        self.sockets = Some(sink);
        self
    }

    pub fn store(&self) -> &dyn DocumentStore {
        &self.store
    }

    pub async fn resolve_session(&self, headers: &HeaderMap) -> Session {
        auth::resolve_session(self.cognito_client.as_ref(), headers).await
    }

    /// Push `owner`'s refreshed task list to their open websocket connections.
    pub async fn publish_tasks(&self, owner: &str) {
        if let Some(sink) = &self.sockets {
            sockets::publish_task_snapshot(&self.store, sink.as_ref(), owner).await;
        }
    }
}
