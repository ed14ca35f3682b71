pub mod broadcast;
pub mod connections;
pub mod messages;

pub use broadcast::{publish_task_snapshot, send_task_snapshot, ApiGatewaySink, SinkError, SnapshotSink};
pub use connections::{connection_owner, register_connection, remove_connection, CONNECTIONS_COLLECTION};
pub use messages::{BroadcastMessage, WebSocketAction, WebSocketMessage};
