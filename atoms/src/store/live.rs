use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use super::{Document, DocumentStore, Fields, Query, StoreResult};

const CHANGE_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Replaced,
    Deleted,
}

/// Notification published after every successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub collection: String,
    pub id: String,
    pub kind: ChangeKind,
}

/// A [`DocumentStore`] wrapper that publishes a [`Change`] for each write and
/// serves live queries on top of that feed.
#[derive(Clone)]
pub struct LiveStore {
    inner: Arc<dyn DocumentStore>,
    changes: broadcast::Sender<Change>,
}

impl LiveStore {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self { inner, changes }
    }

    /// Raw change feed.
    pub fn changes(&self) -> broadcast::Receiver<Change> {
        self.changes.subscribe()
    }

    fn publish(&self, collection: &str, id: &str, kind: ChangeKind) {
        // No listeners is the normal case outside of live views.
        let _ = self.changes.send(Change {
            collection: collection.to_string(),
            id: id.to_string(),
            kind,
        });
    }

    /// Register `observer` for the full result set of `query`.
    ///
    /// The observer receives one snapshot right away and a fresh snapshot
    /// after every change to the queried collection, in the order the
    /// changes were published. Dropping the returned [`Subscription`]
    /// releases the listener. Must be called from within a Tokio runtime.
    pub fn subscribe<F>(&self, query: Query, mut observer: F) -> Subscription
    where
        F: FnMut(Vec<Document>) + Send + 'static,
    {
        // Listen before the first read so no write slips between the two.
        let mut rx = self.changes.subscribe();
        let store = Arc::clone(&self.inner);

        let handle = tokio::spawn(async move {
            deliver(store.as_ref(), &query, &mut observer).await;

            loop {
                match rx.recv().await {
                    Ok(change) if change.collection == query.collection => {
                        deliver(store.as_ref(), &query, &mut observer).await;
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            collection = %query.collection,
                            skipped,
                            "live query lagged, re-reading snapshot"
                        );
                        deliver(store.as_ref(), &query, &mut observer).await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Subscription { handle }
    }
}

async fn deliver<F>(store: &dyn DocumentStore, query: &Query, observer: &mut F)
where
    F: FnMut(Vec<Document>),
{
    match store.query(query).await {
        Ok(docs) => observer(docs),
        Err(e) => {
            tracing::error!(collection = %query.collection, error = %e, "live query failed");
        }
    }
}

/// Handle for a live query. The listener stops when this is dropped.
#[derive(Debug)]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn cancel(self) {
        self.handle.abort();
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[async_trait]
impl DocumentStore for LiveStore {
    async fn add(&self, collection: &str, fields: Fields) -> StoreResult<Document> {
        let doc = self.inner.add(collection, fields).await?;
        self.publish(collection, &doc.id, ChangeKind::Added);
        Ok(doc)
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<Document> {
        let doc = self.inner.set(collection, id, fields).await?;
        self.publish(collection, id, ChangeKind::Replaced);
        Ok(doc)
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        self.inner.get(collection, id).await
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.inner.delete(collection, id).await?;
        self.publish(collection, id, ChangeKind::Deleted);
        Ok(())
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        self.inner.query(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Direction, MemoryStore};
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    fn live() -> LiveStore {
        LiveStore::new(Arc::new(MemoryStore::new()))
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<Vec<Document>>) -> Vec<Document> {
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("snapshot in time")
            .expect("subscription alive")
    }

    #[tokio::test]
    async fn test_write_publishes_change() {
        let store = live();
        let mut changes = store.changes();

        let doc = store.add("tarefas", fields(json!({"tarefa": "x"}))).await.unwrap();
        store.delete("tarefas", &doc.id).await.unwrap();

        let added = changes.recv().await.unwrap();
        assert_eq!(added.kind, ChangeKind::Added);
        assert_eq!(added.id, doc.id);
        let deleted = changes.recv().await.unwrap();
        assert_eq!(deleted.kind, ChangeKind::Deleted);
    }

    #[tokio::test]
    async fn test_subscription_redelivers_full_snapshot() {
        let store = live();
        store
            .add("tarefas", fields(json!({"user": "a@x.com", "created": "2024-01-01T00:00:00.000Z"})))
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let query = Query::collection("tarefas")
            .where_eq("user", "a@x.com")
            .order_by("created", Direction::Desc);
        let _sub = store.subscribe(query, move |docs| {
            let _ = tx.send(docs);
        });

        assert_eq!(next(&mut rx).await.len(), 1);

        store
            .add("tarefas", fields(json!({"user": "a@x.com", "created": "2024-01-02T00:00:00.000Z"})))
            .await
            .unwrap();
        let snapshot = next(&mut rx).await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].str_field("created"), Some("2024-01-02T00:00:00.000Z"));

        // writes by other users still trigger a re-read, filtered out of the set
        store
            .add("tarefas", fields(json!({"user": "b@x.com", "created": "2024-01-03T00:00:00.000Z"})))
            .await
            .unwrap();
        assert_eq!(next(&mut rx).await.len(), 2);
    }

    #[tokio::test]
    async fn test_other_collections_do_not_notify() {
        let store = live();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = store.subscribe(Query::collection("tarefas"), move |docs| {
            let _ = tx.send(docs);
        });
        assert!(next(&mut rx).await.is_empty());

        store.add("comments", fields(json!({"comment": "x"}))).await.unwrap();

        assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_err());
    }

    #[tokio::test]
    async fn test_dropped_subscription_stops_delivery() {
        let store = live();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sub = store.subscribe(Query::collection("tarefas"), move |docs| {
            let _ = tx.send(docs);
        });
        next(&mut rx).await;

        sub.cancel();
        store.add("tarefas", fields(json!({"tarefa": "late"}))).await.unwrap();

        // the observer (and its sender) is dropped with the aborted task
        let received = timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
        assert!(received.is_none());
    }
}
