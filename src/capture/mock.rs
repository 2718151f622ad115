use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::{CaptureSource, Delivery};

/// A capture endpoint for tests. Serves whatever deliveries were pushed,
/// newest first, and can be told to fail.
#[derive(Default)]
pub struct MockCapture {
    deliveries: Mutex<Vec<Delivery>>,
    failing: AtomicBool,
    fetches: AtomicUsize,
}

impl MockCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture a new delivery. It becomes the newest.
    pub fn push(&self, delivery: Delivery) {
        self.deliveries.lock().unwrap().insert(0, delivery);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of fetch calls, failed ones included.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureSource for MockCapture {
    fn webhook_url(&self) -> String {
        "https://capture.test/hook".to_string()
    }

    async fn fetch(&self) -> Result<Vec<Delivery>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            bail!("MockCapture: endpoint unavailable");
        }
        Ok(self.deliveries.lock().unwrap().clone())
    }
}
