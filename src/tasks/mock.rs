use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{TaskApi, TaskApiError};

/// A scripted task API for tests. Hands out `T1`, `T2`, ... and records
/// every submission.
#[derive(Default)]
pub struct MockTaskApi {
    counter: AtomicUsize,
    fail: bool,
    submissions: Mutex<Vec<(String, String)>>,
}

impl MockTaskApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every submission fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// `(query, webhook_url)` pairs seen so far.
    pub fn submissions(&self) -> Vec<(String, String)> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskApi for MockTaskApi {
    async fn submit(&self, query: &str, webhook_url: &str) -> Result<String, TaskApiError> {
        self.submissions
            .lock()
            .unwrap()
            .push((query.to_string(), webhook_url.to_string()));
        if self.fail {
            return Err(TaskApiError::Other("MockTaskApi: submission refused".to_string()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("T{n}"))
    }
}
