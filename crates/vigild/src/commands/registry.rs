//! Command descriptors and the registry that owns them.
//!
//! Command modules register their descriptors during the single-threaded
//! startup phase. The daemon then freezes the registry behind an `Arc`, so
//! request workers only ever see a shared, read-only table.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use super::capabilities::{CapabilityRegistry, command_capability};
use super::client::ClientContext;
use super::flags::CommandFlags;
use super::request::Request;

const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// Behaviour executed for a resolved command.
///
/// Handlers report success or failure through the client's response queue;
/// the dispatcher does not inspect their outcome.
pub trait CommandHandler: Send + Sync {
    /// Executes the command for `client`.
    fn execute(&self, client: &mut ClientContext, request: &Request);
}

impl<F> CommandHandler for F
where
    F: Fn(&mut ClientContext, &Request) + Send + Sync,
{
    fn execute(&self, client: &mut ClientContext, request: &Request) {
        self(client, request);
    }
}

/// Preflight check run by the CLI before a request leaves the process.
///
/// Returns the message to report when the request is unusable.
pub type CliValidator = fn(&Request) -> Result<(), String>;

/// Static definition of one invocable command.
#[derive(Clone)]
pub struct CommandDescriptor {
    name: String,
    flags: CommandFlags,
    handler: Arc<dyn CommandHandler>,
    validator: Option<CliValidator>,
}

impl CommandDescriptor {
    /// Creates a descriptor. Lookups compare `name` exactly, so case matters.
    /// [`CommandRegistry::register`] refuses an empty name.
    pub fn new(
        name: impl Into<String>,
        flags: CommandFlags,
        handler: impl CommandHandler + 'static,
    ) -> Self {
        Self::with_shared_handler(name, flags, Arc::new(handler))
    }

    /// Creates a descriptor around an already shared handler.
    pub fn with_shared_handler(
        name: impl Into<String>,
        flags: CommandFlags,
        handler: Arc<dyn CommandHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            flags,
            handler,
            validator: None,
        }
    }

    /// Attaches a CLI preflight validator.
    #[must_use]
    pub fn with_validator(mut self, validator: CliValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Registry key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Availability and policy flags.
    #[must_use]
    pub fn flags(&self) -> CommandFlags {
        self.flags
    }

    /// Returns true when the descriptor carries every bit in `flag`.
    #[must_use]
    pub fn has_flag(&self, flag: CommandFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Returns true when a CLI validator is attached.
    #[must_use]
    pub fn has_validator(&self) -> bool {
        self.validator.is_some()
    }

    /// Runs the CLI validator, if any.
    ///
    /// # Errors
    ///
    /// Returns the validator's message when it rejects the request.
    pub fn validate(&self, request: &Request) -> Result<(), String> {
        self.validator.map_or(Ok(()), |validator| validator(request))
    }

    /// Invokes the handler.
    pub fn execute(&self, client: &mut ClientContext, request: &Request) {
        self.handler.execute(client, request);
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("has_validator", &self.validator.is_some())
            .finish_non_exhaustive()
    }
}

/// Table mapping command names to descriptors, plus the capability set the
/// commands advertise.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<CommandDescriptor>>,
    capabilities: CapabilityRegistry,
}

impl CommandRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `descriptor`, replacing any previous entry with the same name,
    /// and advertises `cmd-<name>`.
    ///
    /// Returns the replaced descriptor, if any. Descriptors with an empty
    /// name are logged and skipped.
    pub fn register(&mut self, descriptor: CommandDescriptor) -> Option<Arc<CommandDescriptor>> {
        if descriptor.name().is_empty() {
            warn!(target: REGISTRY_TARGET, "ignoring command registered without a name");
            return None;
        }
        let name = descriptor.name().to_owned();
        self.capabilities.register(command_capability(&name));
        debug!(
            target: REGISTRY_TARGET,
            command = %name,
            flags = %descriptor.flags(),
            "registered command"
        );
        self.commands.insert(name, Arc::new(descriptor))
    }

    /// Descriptor registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<CommandDescriptor>> {
        self.commands.get(name)
    }

    /// Every descriptor, sorted by name for display.
    #[must_use]
    pub fn descriptors(&self) -> Vec<&CommandDescriptor> {
        let mut descriptors: Vec<&CommandDescriptor> =
            self.commands.values().map(AsRef::as_ref).collect();
        descriptors.sort_by(|left, right| left.name().cmp(right.name()));
        descriptors
    }

    /// Number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns true when no command is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Advertises a feature capability that is not tied to a command.
    pub fn register_capability(&mut self, name: impl Into<String>) {
        self.capabilities.register(name);
    }

    /// Returns true when `name` is advertised.
    #[must_use]
    pub fn supports(&self, name: &str) -> bool {
        self.capabilities.supports(name)
    }

    /// Every advertised capability; ordering carries no meaning.
    #[must_use]
    pub fn list_capabilities(&self) -> Vec<String> {
        self.capabilities.list()
    }

    /// Read access to the capability set.
    #[must_use]
    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.capabilities
    }
}
