use std::sync::Arc;

use serde_json::Value;

use crate::commands::{
    ClientContext, CommandDescriptor, CommandFlags, PoisonState, Request, Response,
};

/// Reason recorded when `debug-poison` is called without one.
pub const DEFAULT_POISON_REASON: &str = "deliberately poisoned via debug-poison";

pub(super) fn descriptor(poison: Arc<PoisonState>) -> CommandDescriptor {
    CommandDescriptor::new(
        "debug-poison",
        CommandFlags::SESSION,
        move |client: &mut ClientContext, request: &Request| {
            let reason = request
                .get(1)
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_POISON_REASON);
            poison.poison(reason);
            client.send_response(Response::new().with("poisoned", reason));
        },
    )
    .with_validator(validate)
}

fn validate(request: &Request) -> Result<(), String> {
    match request.get(1) {
        None | Some(Value::String(_)) => Ok(()),
        Some(_) => Err("debug-poison: expected argument 1 to be a string reason".to_owned()),
    }
}
