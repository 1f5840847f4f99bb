use std::sync::Arc;

use crate::commands::{ClientContext, CommandDescriptor, CommandFlags, Request, Response};
use crate::process::ShutdownLatch;

pub(super) fn get_pid_descriptor() -> CommandDescriptor {
    CommandDescriptor::new(
        "get-pid",
        CommandFlags::SESSION | CommandFlags::ALLOW_ANY_USER,
        |client: &mut ClientContext, _request: &Request| {
            client.send_response(Response::new().with("pid", std::process::id()));
        },
    )
}

pub(super) fn shutdown_descriptor(latch: Arc<ShutdownLatch>) -> CommandDescriptor {
    CommandDescriptor::new(
        "shutdown-server",
        CommandFlags::SESSION | CommandFlags::POISON_IMMUNE,
        move |client: &mut ClientContext, _request: &Request| {
            latch.trigger();
            client.send_response(Response::new().with("shutdown_server", true));
        },
    )
}
