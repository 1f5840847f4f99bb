//! Built-in commands registered by every daemon and CLI build.
//!
//! The CLI registers the same descriptors so its preflight can run their
//! validators, but it never invokes the handlers.

mod capabilities;
mod debug;
mod process;
mod version;

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::commands::{CapabilityRegistry, CommandRegistry, PoisonState};
use crate::process::ShutdownLatch;

pub use self::debug::DEFAULT_POISON_REASON;

/// Read-only view of the capability set, published once startup finishes.
///
/// Handlers are registered before the capability set is complete, so they
/// hold this view instead of a snapshot.
#[derive(Debug, Clone, Default)]
pub struct CapabilityView(Arc<OnceCell<CapabilityRegistry>>);

impl CapabilityView {
    /// Creates an unpublished view.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes the final capability set. Only the first call takes effect.
    ///
    /// Returns false when a set had already been published.
    pub fn publish(&self, capabilities: &CapabilityRegistry) -> bool {
        self.0.set(capabilities.clone()).is_ok()
    }

    /// Returns true once a set has been published.
    #[must_use]
    pub fn is_published(&self) -> bool {
        self.0.get().is_some()
    }

    /// Returns true when `name` is advertised. Always false before
    /// publication.
    #[must_use]
    pub fn supports(&self, name: &str) -> bool {
        self.0.get().is_some_and(|set| set.supports(name))
    }

    /// Every advertised capability, sorted for display.
    #[must_use]
    pub fn sorted(&self) -> Vec<String> {
        let mut names = self.0.get().map(CapabilityRegistry::list).unwrap_or_default();
        names.sort_unstable();
        names
    }
}

/// Shared services the built-in handlers act on.
#[derive(Debug, Clone, Default)]
pub struct BuiltinServices {
    /// Process-wide health flag.
    pub poison: Arc<PoisonState>,
    /// Latch released by `shutdown-server`.
    pub shutdown: Arc<ShutdownLatch>,
    /// Capability set consulted by `version` and `list-capabilities`.
    pub capabilities: CapabilityView,
}

/// Registers every built-in command into `registry`.
pub fn register_builtins(registry: &mut CommandRegistry, services: &BuiltinServices) {
    registry.register(version::descriptor(services.capabilities.clone()));
    registry.register(capabilities::descriptor(services.capabilities.clone()));
    registry.register(process::get_pid_descriptor());
    registry.register(process::shutdown_descriptor(Arc::clone(&services.shutdown)));
    registry.register(debug::descriptor(Arc::clone(&services.poison)));
}

/// Builds a registry holding only the built-in commands, with the capability
/// view published.
#[must_use]
pub fn builtin_registry(services: &BuiltinServices) -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    register_builtins(&mut registry, services);
    services.capabilities.publish(registry.capabilities());
    registry
}
