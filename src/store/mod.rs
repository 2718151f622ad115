//! In-memory correlation state: tasks waiting for a result, and the
//! deliveries already handled.

pub mod ledger;

use indexmap::IndexMap;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::channel::ReplyTarget;
use crate::classify::Category;

pub use ledger::DedupLedger;

/// A submitted task whose result has not arrived yet.
#[derive(Debug, Clone)]
pub struct PendingTask {
    pub task_id: String,
    /// The command argument text that was submitted.
    pub query: String,
    pub category: Category,
    pub reply_to: ReplyTarget,
    pub submitted_at: Instant,
    /// Cancels the staleness notice.
    pub cancel: CancellationToken,
}

impl PendingTask {
    pub fn new(
        task_id: impl Into<String>,
        query: impl Into<String>,
        category: Category,
        reply_to: ReplyTarget,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            query: query.into(),
            category,
            reply_to,
            submitted_at: Instant::now(),
            cancel: CancellationToken::new(),
        }
    }
}

/// Pending tasks keyed by task id, iterated in insertion order.
#[derive(Debug, Default)]
pub struct ResultStore {
    tasks: IndexMap<String, PendingTask>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Task ids come from the task API and are assumed unique.
    pub fn insert(&mut self, task: PendingTask) {
        self.tasks.insert(task.task_id.clone(), task);
    }

    pub fn get(&self, task_id: &str) -> Option<&PendingTask> {
        self.tasks.get(task_id)
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.tasks.contains_key(task_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingTask> {
        self.tasks.values()
    }

    /// Remove a task and cancel its staleness notice.
    pub fn remove(&mut self, task_id: &str) -> Option<PendingTask> {
        let task = self.tasks.shift_remove(task_id)?;
        task.cancel.cancel();
        Some(task)
    }

    /// Remove every task submitted more than `ttl` before `now`.
    pub fn expire(&mut self, ttl: Duration, now: Instant) -> Vec<PendingTask> {
        let expired: Vec<String> = self
            .tasks
            .values()
            .filter(|t| now.saturating_duration_since(t.submitted_at) > ttl)
            .map(|t| t.task_id.clone())
            .collect();

        expired
            .iter()
            .filter_map(|id| self.remove(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, query: &str) -> PendingTask {
        PendingTask::new(id, query, Category::General, ReplyTarget::new("c1", id))
    }

    #[test]
    fn insert_get_contains() {
        let mut store = ResultStore::new();
        store.insert(task("T1", "tea"));
        assert!(store.contains("T1"));
        assert_eq!(store.get("T1").unwrap().query, "tea");
        assert!(store.get("T2").is_none());
    }

    #[test]
    fn iter_preserves_insertion_order() {
        let mut store = ResultStore::new();
        for id in ["c", "a", "b"] {
            store.insert(task(id, id));
        }
        store.remove("a");
        store.insert(task("d", "d"));
        let ids: Vec<_> = store.iter().map(|t| t.task_id.as_str()).collect();
        assert_eq!(ids, ["c", "b", "d"]);
    }

    #[test]
    fn remove_cancels_token() {
        let mut store = ResultStore::new();
        let t = task("T1", "tea");
        let token = t.cancel.clone();
        store.insert(t);

        assert!(!token.is_cancelled());
        let removed = store.remove("T1").unwrap();
        assert_eq!(removed.task_id, "T1");
        assert!(token.is_cancelled());
        assert!(store.is_empty());
    }

    #[test]
    fn remove_missing_returns_none() {
        let mut store = ResultStore::new();
        assert!(store.remove("nope").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn expire_removes_only_old_tasks() {
        let mut store = ResultStore::new();
        store.insert(task("old", "a"));
        tokio::time::advance(Duration::from_secs(120)).await;
        store.insert(task("new", "b"));

        let expired = store.expire(Duration::from_secs(60), Instant::now());
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].task_id, "old");
        assert!(expired[0].cancel.is_cancelled());
        assert!(store.contains("new"));
        assert_eq!(store.len(), 1);
    }
}
