use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::AdmissionError;

/// Bounds how many pipelines run at once.
///
/// Callers beyond the slot count wait in a queue of at most `max_queued`
/// entries (unbounded when `None`); once that is full `admit` fails fast
/// instead of piling up more waiters. Every admitted caller sleeps for the
/// pacing delay while already holding its slot, which caps the cadence of
/// each slot rather than the aggregate rate.
#[derive(Debug)]
pub struct AdmissionController {
    slots: Arc<Semaphore>,
    max_concurrent: usize,
    max_queued: Option<usize>,
    queued: AtomicUsize,
    pacing: Duration,
}

/// Permission to run one pipeline. The slot is returned when this is dropped.
#[derive(Debug)]
pub struct AdmissionSlot {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionController {
    pub fn new(max_concurrent: usize, max_queued: Option<usize>, pacing: Duration) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            slots: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            max_queued,
            queued: AtomicUsize::new(0),
            pacing,
        }
    }

    pub async fn admit(&self) -> Result<AdmissionSlot, AdmissionError> {
        let permit = match self.slots.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                let _waiting = QueuedGuard::enter(&self.queued, self.max_queued)?;
                self.slots
                    .clone()
                    .acquire_owned()
                    .await
                    .expect("admission semaphore is never closed")
            }
        };

        if !self.pacing.is_zero() {
            tokio::time::sleep(self.pacing).await;
        }

        Ok(AdmissionSlot { _permit: permit })
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Slots currently held.
    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.slots.available_permits()
    }

    /// Callers currently waiting for a slot.
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }
}

/// Holds a place in the wait queue; released on drop, including when the
/// waiting future is dropped because the client went away.
struct QueuedGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> QueuedGuard<'a> {
    fn enter(counter: &'a AtomicUsize, limit: Option<usize>) -> Result<Self, AdmissionError> {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| match limit {
                Some(limit) if current >= limit => None,
                _ => Some(current + 1),
            })
            .map_err(AdmissionError::QueueFull)?;
        Ok(Self { counter })
    }
}

impl Drop for QueuedGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_slot_released_on_drop() {
    let admission = AdmissionController::new(1, None, Duration::ZERO);
    let slot = admission.admit().await.unwrap();
    assert_eq!(admission.in_flight(), 1);
    drop(slot);
    assert_eq!(admission.in_flight(), 0);

    let _slot = admission.admit().await.unwrap();
    assert_eq!(admission.in_flight(), 1);
}

#[test]
fn test_zero_concurrency_is_clamped() {
    let admission = AdmissionController::new(0, None, Duration::ZERO);
    assert_eq!(admission.max_concurrent(), 1);
}
