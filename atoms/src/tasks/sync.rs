use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use super::model::Task;
use super::service::owner_query;
use crate::store::{LiveStore, Subscription};

/// The published list plus the binding generation it belongs to.
///
/// Both are only touched under `generation`'s lock, so a snapshot for an
/// older binding can never land after `reset` has cleared the list.
struct ListSlot {
    generation: Mutex<u64>,
    tasks: watch::Sender<Vec<Task>>,
}

impl ListSlot {
    fn new() -> Self {
        let (tasks, _) = watch::channel(Vec::new());
        Self {
            generation: Mutex::new(0),
            tasks,
        }
    }

    /// Start a new binding: empty list, new generation.
    fn reset(&self) -> u64 {
        let mut generation = self.generation.lock().unwrap_or_else(|e| e.into_inner());
        *generation += 1;
        self.tasks.send_replace(Vec::new());
        *generation
    }

    /// Replace the list if `generation` is still current.
    fn publish(&self, generation: u64, tasks: Vec<Task>) -> bool {
        let current = self.generation.lock().unwrap_or_else(|e| e.into_inner());
        if *current != generation {
            return false;
        }
        self.tasks.send_replace(tasks);
        true
    }
}

/// Live view of one user's task list.
///
/// Bound to an email, it keeps a single subscription over that user's tasks
/// and replaces its list wholesale with every snapshot. Re-binding to a new
/// identity (or dropping the sync) releases the old subscription.
pub struct TaskListSync {
    store: LiveStore,
    email: Option<String>,
    subscription: Option<Subscription>,
    slot: Arc<ListSlot>,
}

impl TaskListSync {
    pub fn new(store: LiveStore) -> Self {
        Self {
            store,
            email: None,
            subscription: None,
            slot: Arc::new(ListSlot::new()),
        }
    }

    /// Point the list at `email`. `None` (or an empty email) clears the list
    /// and leaves no subscription open.
    pub fn bind(&mut self, email: Option<&str>) {
        let email = email.filter(|e| !e.is_empty());

        if email.is_some() && self.email.as_deref() == email && self.is_subscribed() {
            return;
        }

        self.subscription = None;
        let generation = self.slot.reset();
        self.email = email.map(|e| e.to_string());

        let Some(email) = email else {
            return;
        };

        tracing::debug!(email, "Subscribing to task list");

        let slot = Arc::clone(&self.slot);
        self.subscription = Some(self.store.subscribe(owner_query(email), move |docs| {
            slot.publish(generation, docs.iter().map(Task::from_document).collect());
        }));
    }

    pub fn unbind(&mut self) {
        self.bind(None);
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.as_ref().is_some_and(|s| s.is_active())
    }

    /// Current list.
    pub fn tasks(&self) -> Vec<Task> {
        self.slot.tasks.borrow().clone()
    }

    /// Receiver notified whenever the list is replaced.
    pub fn watch(&self) -> watch::Receiver<Vec<Task>> {
        self.slot.tasks.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStore, MemoryStore};
    use crate::tasks::{create_task, delete_task, CreateTaskPayload};
    use std::time::Duration;
    use tokio::time::timeout;

    fn live() -> LiveStore {
        LiveStore::new(Arc::new(MemoryStore::new()))
    }

    async fn add(store: &dyn DocumentStore, owner: &str, text: &str) -> Task {
        create_task(
            store,
            owner,
            CreateTaskPayload {
                task: text.to_string(),
                public: false,
            },
        )
        .await
        .unwrap()
        .unwrap()
    }

    /// Wait until the list satisfies `pred`.
    async fn wait_for<F>(rx: &mut watch::Receiver<Vec<Task>>, pred: F) -> Vec<Task>
    where
        F: Fn(&[Task]) -> bool,
    {
        timeout(Duration::from_secs(2), async {
            loop {
                {
                    let current = rx.borrow_and_update();
                    if pred(&current) {
                        return current.clone();
                    }
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .expect("list reached expected state")
    }

    #[tokio::test]
    async fn test_unbound_sync_has_no_subscription() {
        let mut sync = TaskListSync::new(live());

        sync.bind(None);

        assert!(!sync.is_subscribed());
        assert!(sync.tasks().is_empty());
        assert_eq!(sync.email(), None);
    }

    #[tokio::test]
    async fn test_list_tracks_owner_tasks() {
        let store = live();
        add(&store, "a@x.com", "existing").await;
        add(&store, "b@x.com", "not mine").await;

        let mut sync = TaskListSync::new(store.clone());
        let mut rx = sync.watch();
        sync.bind(Some("a@x.com"));

        let tasks = wait_for(&mut rx, |t| t.len() == 1).await;
        assert_eq!(tasks[0].task, "existing");

        let added = add(&store, "a@x.com", "new one").await;
        let tasks = wait_for(&mut rx, |t| t.len() == 2).await;
        assert!(tasks.iter().all(|t| t.user == "a@x.com"));

        delete_task(&store, "a@x.com", &added.id).await.unwrap();
        let tasks = wait_for(&mut rx, |t| t.len() == 1).await;
        assert_eq!(tasks[0].task, "existing");
    }

    #[tokio::test]
    async fn test_rebind_drops_previous_filter() {
        let store = live();
        add(&store, "a@x.com", "from a").await;
        add(&store, "b@x.com", "from b").await;

        let mut sync = TaskListSync::new(store.clone());
        let mut rx = sync.watch();
        sync.bind(Some("a@x.com"));
        wait_for(&mut rx, |t| t.len() == 1 && t[0].user == "a@x.com").await;

        sync.bind(Some("b@x.com"));
        wait_for(&mut rx, |t| t.len() == 1 && t[0].user == "b@x.com").await;

        add(&store, "a@x.com", "another from a").await;
        add(&store, "b@x.com", "another from b").await;
        let tasks = wait_for(&mut rx, |t| t.len() == 2).await;
        assert!(tasks.iter().all(|t| t.user == "b@x.com"));
        assert_eq!(sync.email(), Some("b@x.com"));
    }

    #[tokio::test]
    async fn test_unbind_clears_list() {
        let store = live();
        add(&store, "a@x.com", "x").await;

        let mut sync = TaskListSync::new(store);
        let mut rx = sync.watch();
        sync.bind(Some("a@x.com"));
        wait_for(&mut rx, |t| t.len() == 1).await;

        sync.unbind();

        assert!(!sync.is_subscribed());
        assert!(sync.tasks().is_empty());
    }

    #[test]
    fn test_stale_snapshot_after_reset_is_dropped() {
        let slot = ListSlot::new();
        let first = slot.reset();
        let stale = Task {
            id: "t1".to_string(),
            task: "old identity".to_string(),
            created: "2024-01-01T00:00:00.000Z".to_string(),
            user: "a@x.com".to_string(),
            public: false,
        };
        assert!(slot.publish(first, vec![stale.clone()]));

        // unbind while a snapshot for the first binding is still in flight
        slot.reset();

        assert!(!slot.publish(first, vec![stale]));
        assert!(slot.tasks.borrow().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_unbind_races_in_flight_snapshots() {
        let slot = Arc::new(ListSlot::new());
        let generation = slot.reset();
        let task = Task {
            id: "t1".to_string(),
            task: "x".to_string(),
            created: String::new(),
            user: "a@x.com".to_string(),
            public: false,
        };

        let writers: Vec<_> = (0..4)
            .map(|_| {
                let slot = Arc::clone(&slot);
                let task = task.clone();
                tokio::spawn(async move {
                    for _ in 0..500 {
                        slot.publish(generation, vec![task.clone()]);
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();
        tokio::task::yield_now().await;
        slot.reset();
        for writer in writers {
            writer.await.unwrap();
        }

        assert!(slot.tasks.borrow().is_empty());
    }
}
