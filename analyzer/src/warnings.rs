use std::sync::{Arc, Mutex, MutexGuard};

/// User-visible warnings of one host session, each distinct message once.
///
/// Clones share the same list, so one instance can outlive many runs.
#[derive(Debug, Clone, Default)]
pub struct AnalysisWarnings {
    messages: Arc<Mutex<Vec<String>>>,
}

impl AnalysisWarnings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        match self.messages.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Record `message` unless an identical one exists. Returns whether it was added.
    pub fn add_unique(&self, message: impl Into<String>) -> bool {
        let message = message.into();
        let mut messages = self.lock();
        if messages.contains(&message) {
            return false;
        }
        messages.push(message);
        true
    }

    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.lock().clone()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
