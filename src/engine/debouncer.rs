use core::time::Duration;
use std::sync::{Arc, Mutex};

/// Work that a [`Debouncer`] runs on demand.
pub trait Job: Send + Sync + 'static {
    fn run(&self) -> impl Future<Output = ()> + Send;
}

/// Coalesces bursts of requests into single deferred runs of a [`Job`].
///
/// - [`Debouncer::schedule`] while nothing is pending arms a run that starts after the interval.
/// - While a run is armed but has not started, further requests are absorbed by it.
/// - While a run is in progress, requests collapse into exactly one follow-up run, armed again
///   with the full interval once the current run completes.
///
/// Two runs of the job never overlap.
#[derive(Debug)]
pub struct Debouncer<J> {
    inner: Arc<Inner<J>>,
}

#[derive(Debug)]
struct Inner<J> {
    job: Arc<J>,
    interval: Duration,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    scheduled: bool,
    running: bool,
    rerun: bool,
}

impl<J> Clone for Debouncer<J> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<J: Job> Debouncer<J> {
    #[must_use]
    pub fn new(job: Arc<J>, interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                job,
                interval,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Request a run of the job.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self) {
        {
            let mut state = self.inner.state.lock().expect("lock not poisoned");
            if state.scheduled {
                return;
            }

            if state.running {
                state.rerun = true;
                return;
            }

            state.scheduled = true;
        }

        drop(tokio::spawn(run_loop(Arc::clone(&self.inner))));
    }

    /// Whether no run is armed or in progress.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        let state = self.inner.state.lock().expect("lock not poisoned");
        !state.scheduled && !state.running
    }
}

async fn run_loop<J: Job>(inner: Arc<Inner<J>>) {
    loop {
        tokio::time::sleep(inner.interval).await;

        {
            let mut state = inner.state.lock().expect("lock not poisoned");
            state.scheduled = false;
            state.running = true;
        }

        inner.job.run().await;

        let mut state = inner.state.lock().expect("lock not poisoned");
        state.running = false;
        if !state.rerun {
            return;
        }

        state.rerun = false;
        state.scheduled = true;
    }
}
