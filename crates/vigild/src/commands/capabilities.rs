//! Capability registry used for protocol negotiation.
//!
//! Capabilities are opaque feature names. Every registered command
//! contributes `cmd-<name>`; other subsystems may add feature flags of their
//! own during startup.

use std::collections::HashSet;

/// Prefix applied to command-derived capability names.
pub const COMMAND_CAPABILITY_PREFIX: &str = "cmd-";

/// Builds the capability name advertised for a command.
#[must_use]
pub fn command_capability(name: &str) -> String {
    format!("{COMMAND_CAPABILITY_PREFIX}{name}")
}

/// Set of capability names advertised by this build.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    names: HashSet<String>,
}

impl CapabilityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a capability. Registering an existing name has no effect.
    pub fn register(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    /// Returns true when `name` has been registered.
    #[must_use]
    pub fn supports(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Enumerates every capability. Iteration order is unspecified.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Collects every capability; ordering carries no meaning.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.names.iter().cloned().collect()
    }

    /// Number of registered capabilities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true when nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
