use crate::commands::{ClientContext, CommandDescriptor, CommandFlags, Request, Response};

use super::CapabilityView;

pub(super) fn descriptor(view: CapabilityView) -> CommandDescriptor {
    CommandDescriptor::new(
        "list-capabilities",
        CommandFlags::CLI
            | CommandFlags::SESSION
            | CommandFlags::ALLOW_ANY_USER
            | CommandFlags::POISON_IMMUNE,
        move |client: &mut ClientContext, _request: &Request| {
            client.send_response(Response::new().with("capabilities", view.sorted()));
        },
    )
}
