use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Limits concurrent API calls and remembers when the remote quota resets.
///
/// Callers take a slot with [`Throttler::acquire`] before each request. When a response reports
/// that the quota is exhausted, [`Throttler::pause_until`] records the reset time; until then
/// [`Throttler::acquire`] refuses to hand out slots so no request is wasted.
///
/// Overlapping pauses keep the later reset time.
#[derive(Debug)]
pub struct Throttler {
    semaphore: Arc<Semaphore>,
    resume_at: Mutex<Option<DateTime<Utc>>>,
}

impl Throttler {
    /// Create a throttler that allows at most `max_concurrent` requests at a time.
    #[must_use]
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            resume_at: Mutex::new(None),
        }
    }

    /// Wait for a concurrency slot, or return the reset time if requests are currently paused.
    ///
    /// The returned permit must be held for the duration of the request.
    pub async fn acquire(&self, now: DateTime<Utc>) -> Result<OwnedSemaphorePermit, DateTime<Utc>> {
        if let Some(resume_at) = self.paused_until(now) {
            return Err(resume_at);
        }

        Ok(Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .expect("semaphore is never closed"))
    }

    /// The time requests resume, if they are paused at `now`.
    ///
    /// An expired pause is cleared.
    pub fn paused_until(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut guard = self.resume_at.lock().expect("lock not poisoned");
        match *guard {
            Some(resume_at) if resume_at > now => Some(resume_at),
            Some(_) => {
                *guard = None;
                None
            }
            None => None,
        }
    }

    /// Refuse requests until `resume_at`.
    ///
    /// Returns `false` when an equal or later pause is already in effect.
    pub fn pause_until(&self, resume_at: DateTime<Utc>) -> bool {
        let mut guard = self.resume_at.lock().expect("lock not poisoned");
        if guard.is_some_and(|existing| existing >= resume_at) {
            return false;
        }

        *guard = Some(resume_at);
        true
    }
}
