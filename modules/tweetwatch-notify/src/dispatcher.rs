use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use tweetwatch_common::{DispatchError, Record, Target};

use crate::backend::NotifyBackend;
use crate::format::format_message;

/// Base backoff for transient transport failures. Actual delay is
/// base * 2^attempt plus random jitter (0-250ms).
const RETRY_BASE: Duration = Duration::from_secs(1);

/// Formats records and delivers them through a backend, retrying transient
/// failures up to a bounded attempt count. Permanent failures surface
/// immediately.
pub struct Dispatcher {
    backend: Arc<dyn NotifyBackend>,
    max_retries: u32,
    retry_base: Duration,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn NotifyBackend>, max_retries: u32) -> Self {
        Self {
            backend,
            max_retries,
            retry_base: RETRY_BASE,
        }
    }

    /// Override the backoff base. Test hook; production uses `RETRY_BASE`.
    pub fn with_retry_base(mut self, base: Duration) -> Self {
        self.retry_base = base;
        self
    }

    /// Deliver one record as one outbound message. Exactly one message is
    /// sent per `Ok`; a transient failure that actually landed upstream
    /// before timing out locally can still double-send under retry.
    pub async fn deliver(&self, record: &Record, target: &Target) -> Result<(), DispatchError> {
        let message = format_message(record, target);

        let mut attempt = 0u32;
        loop {
            match self.backend.send(&message).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let backoff = self.retry_base * 2u32.pow(attempt);
                    let jitter = Duration::from_millis(rand::rng().random_range(0..250));
                    warn!(
                        target = %target.id,
                        record = %record.external_id,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Transient dispatch failure, retrying after backoff"
                    );
                    tokio::time::sleep(backoff + jitter).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
