//! Process-wide poison flag.
//!
//! Once a collaborator detects a fault the service cannot recover from, the
//! state is poisoned for the rest of the process lifetime. Later calls to
//! [`PoisonState::poison`] replace the advertised reason; nothing clears it.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::error;

const POISON_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::poison");

/// Shared health flag consulted before every command execution.
#[derive(Debug, Default)]
pub struct PoisonState {
    reason: RwLock<Option<Arc<str>>>,
}

impl PoisonState {
    /// Creates a healthy state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the service as poisoned with a human-readable reason.
    pub fn poison(&self, reason: impl Into<String>) {
        let reason: Arc<str> = Arc::from(reason.into());
        error!(
            target: POISON_TARGET,
            reason = %reason,
            "service poisoned; non-immune commands will be refused until restart"
        );
        let mut slot = self.reason.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(reason);
    }

    /// Returns the poison reason, or `None` while healthy.
    #[must_use]
    pub fn check(&self) -> Option<Arc<str>> {
        self.reason
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns true once the service has been poisoned.
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.check().is_some()
    }
}
