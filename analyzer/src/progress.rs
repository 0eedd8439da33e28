//! Periodic "files remaining" reporting for long runs.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use stylebridge_types::InputFile;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Default)]
struct ProgressState {
    total: usize,
    done: usize,
    current: Option<String>,
}

/// Counts files as the orchestrator dispatches them; a background ticker logs
/// the count at a fixed interval without touching the main loop.
///
/// Dropping the report stops the ticker.
#[derive(Debug)]
pub struct ProgressReport {
    state: Arc<Mutex<ProgressState>>,
    ticker: Option<JoinHandle<()>>,
}

fn lock(state: &Mutex<ProgressState>) -> MutexGuard<'_, ProgressState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

impl ProgressReport {
    /// Log the batch size and start ticking every `interval`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(total: usize, interval: Duration) -> Self {
        tracing::info!("{total} source file{} to be analyzed", plural(total));
        let state = Arc::new(Mutex::new(ProgressState {
            total,
            ..ProgressState::default()
        }));

        let ticker = tokio::spawn({
            let state = Arc::clone(&state);
            async move {
                let mut ticks = tokio::time::interval_at(Instant::now() + interval, interval);
                ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticks.tick().await;
                    let progress = lock(&state);
                    match &progress.current {
                        Some(current) => tracing::info!(
                            "{}/{} source files have been analyzed, current file: {current}",
                            progress.done,
                            progress.total
                        ),
                        None => tracing::info!(
                            "{}/{} source files have been analyzed",
                            progress.done,
                            progress.total
                        ),
                    }
                }
            }
        });

        Self {
            state,
            ticker: Some(ticker),
        }
    }

    pub fn start_file(&self, file: &InputFile) {
        lock(&self.state).current = Some(file.to_string());
    }

    pub fn finish_file(&self) {
        let mut state = lock(&self.state);
        state.done += 1;
        state.current = None;
    }

    #[must_use]
    pub fn done(&self) -> usize {
        lock(&self.state).done
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        let state = lock(&self.state);
        state.total.saturating_sub(state.done)
    }

    /// Stop ticking and log completion.
    pub fn stop(mut self) {
        self.halt();
        let state = lock(&self.state);
        tracing::info!(
            "{}/{} source file{} have been analyzed",
            state.done,
            state.total,
            plural(state.total)
        );
    }

    /// Stop ticking and log how far the run got.
    pub fn cancel(mut self) {
        self.halt();
        let state = lock(&self.state);
        tracing::info!(
            "Analysis cancelled after {}/{} source files",
            state.done,
            state.total
        );
    }

    fn halt(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

impl Drop for ProgressReport {
    fn drop(&mut self) {
        self.halt();
    }
}
