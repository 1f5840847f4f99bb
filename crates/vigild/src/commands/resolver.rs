//! Resolution of a decoded request into a registered command.
//!
//! The same routine backs two callers with different strictness. Session
//! dispatch passes [`ContextMode::SESSION`] and treats an unknown name as an
//! error. CLI preflight passes [`ContextMode::PERMISSIVE`] and lets unknown
//! names through so a newer daemon can still answer them.

use std::sync::Arc;

use super::errors::DispatchError;
use super::flags::ContextMode;
use super::registry::{CommandDescriptor, CommandRegistry};
use super::request::Request;

/// Looks up the command named by `request` for the given context.
///
/// Returns `Ok(None)` only in permissive mode when the name is unknown.
///
/// # Errors
///
/// Returns [`DispatchError::EmptyRequest`] or
/// [`DispatchError::MissingCommandName`] for malformed requests,
/// [`DispatchError::UnavailableInMode`] when the descriptor is not enabled
/// for `mode` and [`DispatchError::UnknownCommand`] when a strict context
/// names an unregistered command.
pub fn resolve(
    registry: &CommandRegistry,
    request: &Request,
    mode: ContextMode,
) -> Result<Option<Arc<CommandDescriptor>>, DispatchError> {
    if request.is_empty() {
        return Err(DispatchError::EmptyRequest);
    }
    let name = request
        .command_name()
        .ok_or(DispatchError::MissingCommandName)?;

    match registry.get(name) {
        Some(descriptor) => {
            if !mode.is_permissive() && !descriptor.flags().intersects(mode.flags()) {
                return Err(DispatchError::unavailable_in_mode(name));
            }
            Ok(Some(Arc::clone(descriptor)))
        }
        None if mode.is_permissive() => Ok(None),
        None => Err(DispatchError::unknown_command(name)),
    }
}
