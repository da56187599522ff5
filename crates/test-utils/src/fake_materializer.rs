use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use deploysync::exec::{MaterializationRequest, Materializer};

/// A fake materializer that:
/// - records every request it receives
/// - succeeds, unless told to fail.
#[derive(Debug, Clone, Default)]
pub struct FakeMaterializer {
    requests: Arc<Mutex<Vec<MaterializationRequest>>>,
    fail: Arc<AtomicBool>,
}

impl FakeMaterializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let fake = Self::default();
        fake.set_failing(true);
        fake
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<MaterializationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Materializer for FakeMaterializer {
    fn materialize<'a>(
        &'a self,
        request: &'a MaterializationRequest,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("fake materialization failure");
            }
            Ok(())
        })
    }
}
