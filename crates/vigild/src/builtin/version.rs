//! `version` and capability negotiation.
//!
//! ```json
//! ["version", {"optional": ["term-debug"], "required": ["cmd-get-pid"]}]
//! ```
//!
//! The reply maps every named capability to whether this build supports it.
//! A missing required capability also sets `error` so older clients fail
//! loudly instead of misbehaving.

use serde_json::{Map, Value};

use crate::commands::{ClientContext, CommandDescriptor, CommandFlags, Request, Response};

use super::CapabilityView;

const OPTIONAL_KEY: &str = "optional";
const REQUIRED_KEY: &str = "required";

pub(super) fn descriptor(view: CapabilityView) -> CommandDescriptor {
    CommandDescriptor::new(
        "version",
        CommandFlags::CLI
            | CommandFlags::SESSION
            | CommandFlags::ALLOW_ANY_USER
            | CommandFlags::POISON_IMMUNE,
        move |client: &mut ClientContext, request: &Request| {
            client.send_response(negotiate(&view, request));
        },
    )
    .with_validator(validate)
}

fn negotiate(view: &CapabilityView, request: &Request) -> Response {
    let mut response = Response::new();
    let Some(Value::Object(query)) = request.get(1) else {
        return response;
    };

    let mut answers = Map::new();
    for name in names(query, OPTIONAL_KEY) {
        answers.insert(name.to_owned(), Value::Bool(view.supports(name)));
    }
    let mut missing = None;
    for name in names(query, REQUIRED_KEY) {
        let supported = view.supports(name);
        answers.insert(name.to_owned(), Value::Bool(supported));
        if !supported && missing.is_none() {
            missing = Some(name);
        }
    }

    response.insert("capabilities", Value::Object(answers));
    if let Some(name) = missing {
        response.insert(
            "error",
            format!("client required capability `{name}` is not supported by this server"),
        );
    }
    response
}

fn names<'a>(query: &'a Map<String, Value>, key: &str) -> impl Iterator<Item = &'a str> {
    query
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

fn validate(request: &Request) -> Result<(), String> {
    match request.get(1) {
        None => Ok(()),
        Some(Value::Object(query)) => {
            for key in [OPTIONAL_KEY, REQUIRED_KEY] {
                match query.get(key) {
                    None => {}
                    Some(Value::Array(items)) if items.iter().all(Value::is_string) => {}
                    Some(_) => {
                        return Err(format!("version: `{key}` must be an array of strings"));
                    }
                }
            }
            Ok(())
        }
        Some(_) => Err("version: expected argument 1 to be an object".to_owned()),
    }
}
