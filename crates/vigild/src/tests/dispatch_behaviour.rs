//! Behavioural tests for session dispatch over an in-process registry.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::{Value, json};

use crate::commands::{
    ClientContext, CommandDescriptor, CommandFlags, CommandRegistry, DispatchSettings, Dispatcher,
    PoisonState, Request, Response,
};

use super::support::{DispatchEvent, RecordingDispatchReporter};

type StepResult = Result<(), String>;

#[derive(Default)]
struct DispatchWorld {
    registry: CommandRegistry,
    dispatcher: Option<Dispatcher>,
    poison: Arc<PoisonState>,
    reporter: Arc<RecordingDispatchReporter>,
    calls: HashMap<String, Arc<AtomicUsize>>,
    client: Option<ClientContext>,
    handled: Option<bool>,
    responses: Vec<Response>,
}

impl DispatchWorld {
    /// Registers `name` with a handler that counts calls and answers with `tag`.
    fn register(&mut self, name: &str, flags: CommandFlags, tag: &str) {
        let calls = Arc::clone(self.calls.entry(name.to_owned()).or_default());
        let tag = tag.to_owned();
        self.registry.register(CommandDescriptor::new(
            name,
            flags,
            move |client: &mut ClientContext, _: &Request| {
                calls.fetch_add(1, Ordering::SeqCst);
                client.send_response(Response::new().with("tag", tag.as_str()));
            },
        ));
    }

    /// Freezes the registry on first dispatch, mirroring daemon startup.
    fn dispatcher(&mut self) -> Dispatcher {
        if self.dispatcher.is_none() {
            let registry = Arc::new(std::mem::take(&mut self.registry));
            self.dispatcher = Some(
                Dispatcher::new(registry, Arc::clone(&self.poison), DispatchSettings::default())
                    .with_reporter(self.reporter.clone()),
            );
        }
        self.dispatcher.clone().expect("dispatcher built")
    }

    fn run(&mut self, elements: Vec<Value>, is_owner: bool) {
        let dispatcher = self.dispatcher();
        let mut client = ClientContext::new(is_owner);
        self.handled = Some(dispatcher.dispatch(&mut client, &Request::from(elements)));
        self.responses = client.take_responses();
        self.client = Some(client);
    }

    fn calls(&self, name: &str) -> usize {
        self.calls
            .get(name)
            .map_or(0, |calls| calls.load(Ordering::SeqCst))
    }
}

#[fixture]
fn world() -> RefCell<DispatchWorld> {
    RefCell::new(DispatchWorld::default())
}

fn strip_quotes(value: &str) -> &str {
    value.trim_matches('"')
}

#[given("a session command {name}")]
fn given_session_command(world: &RefCell<DispatchWorld>, name: String) {
    let name = strip_quotes(&name);
    world.borrow_mut().register(name, CommandFlags::SESSION, name);
}

#[given("an open-access command {name}")]
fn given_open_command(world: &RefCell<DispatchWorld>, name: String) {
    let name = strip_quotes(&name);
    world
        .borrow_mut()
        .register(name, CommandFlags::SESSION | CommandFlags::ALLOW_ANY_USER, name);
}

#[given("a poison-immune command {name}")]
fn given_immune_command(world: &RefCell<DispatchWorld>, name: String) {
    let name = strip_quotes(&name);
    world
        .borrow_mut()
        .register(name, CommandFlags::SESSION | CommandFlags::POISON_IMMUNE, name);
}

#[given("a cli-only command {name}")]
fn given_cli_command(world: &RefCell<DispatchWorld>, name: String) {
    let name = strip_quotes(&name);
    world.borrow_mut().register(name, CommandFlags::CLI, name);
}

#[given("the command {name} is registered again with tag {tag}")]
fn given_reregistered(world: &RefCell<DispatchWorld>, name: String, tag: String) {
    world
        .borrow_mut()
        .register(strip_quotes(&name), CommandFlags::SESSION, strip_quotes(&tag));
}

#[given("the daemon is poisoned with {reason}")]
fn given_poisoned(world: &RefCell<DispatchWorld>, reason: String) {
    world.borrow().poison.poison(strip_quotes(&reason));
}

#[when("the owner runs {name}")]
fn when_owner_runs(world: &RefCell<DispatchWorld>, name: String) {
    world
        .borrow_mut()
        .run(vec![json!(strip_quotes(&name))], true);
}

#[when("a non-owner runs {name}")]
fn when_non_owner_runs(world: &RefCell<DispatchWorld>, name: String) {
    world
        .borrow_mut()
        .run(vec![json!(strip_quotes(&name))], false);
}

#[when("the owner sends an empty request")]
fn when_empty_request(world: &RefCell<DispatchWorld>) {
    world.borrow_mut().run(Vec::new(), true);
}

#[then("the handler for {name} ran {count} times")]
fn then_handler_ran(world: &RefCell<DispatchWorld>, name: String, count: String) -> StepResult {
    let expected: usize = count
        .parse()
        .map_err(|error| format!("invalid count '{count}': {error}"))?;
    let actual = world.borrow().calls(strip_quotes(&name));
    if actual == expected {
        Ok(())
    } else {
        Err(format!("expected {expected} calls to {name}, saw {actual}"))
    }
}

#[then("the client received a response tagged {tag}")]
fn then_response_tagged(world: &RefCell<DispatchWorld>, tag: String) -> StepResult {
    let world = world.borrow();
    let expected = json!(strip_quotes(&tag));
    match world.responses.as_slice() {
        [response] if response.get("tag") == Some(&expected) => Ok(()),
        other => Err(format!("unexpected responses: {other:?}")),
    }
}

#[then("the request was rejected with {message}")]
fn then_rejected(world: &RefCell<DispatchWorld>, message: String) -> StepResult {
    let message = strip_quotes(&message);
    let world = world.borrow();
    if world.handled != Some(false) {
        return Err(format!("dispatch outcome was {:?}", world.handled));
    }
    match world.responses.as_slice() {
        [response] if response.error_message() == Some(message) => {}
        other => return Err(format!("expected one error '{message}', saw {other:?}")),
    }
    let rejected = world.reporter.events().iter().any(|event| match event {
        DispatchEvent::Rejected { error, .. } => error.to_string() == message,
        _ => false,
    });
    if rejected {
        Ok(())
    } else {
        Err("rejection was not reported".to_owned())
    }
}

#[then("the dispatch state is cleared")]
fn then_state_cleared(world: &RefCell<DispatchWorld>) -> StepResult {
    let world = world.borrow();
    let client = world.client.as_ref().ok_or("no request was dispatched")?;
    if client.current_command().is_some() {
        return Err("current command survived dispatch".to_owned());
    }
    if client.has_perf_sample() {
        return Err("perf sample survived dispatch".to_owned());
    }
    Ok(())
}

#[then("the registry advertises {capability}")]
fn then_advertises(world: &RefCell<DispatchWorld>, capability: String) -> StepResult {
    let mut world = world.borrow_mut();
    let dispatcher = world.dispatcher();
    let capability = strip_quotes(&capability);
    let registry = dispatcher.registry();
    if registry.supports(capability) && registry.len() == 1 {
        Ok(())
    } else {
        Err(format!(
            "expected a single command advertising {capability}, saw {:?}",
            registry.list_capabilities()
        ))
    }
}

#[scenario(
    path = "tests/features/command_dispatch.feature",
    name = "Session command reaches its handler"
)]
fn session_command_reaches_handler(world: RefCell<DispatchWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/command_dispatch.feature",
    name = "Unknown command is refused"
)]
fn unknown_command_is_refused(world: RefCell<DispatchWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/command_dispatch.feature",
    name = "Empty request is refused"
)]
fn empty_request_is_refused(world: RefCell<DispatchWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/command_dispatch.feature",
    name = "Poisoned daemon refuses ordinary commands"
)]
fn poisoned_daemon_refuses_ordinary_commands(world: RefCell<DispatchWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/command_dispatch.feature",
    name = "Non-owner is refused an owner-only command"
)]
fn non_owner_is_refused(world: RefCell<DispatchWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/command_dispatch.feature",
    name = "Command outside the session context is refused"
)]
fn command_outside_session_is_refused(world: RefCell<DispatchWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/command_dispatch.feature",
    name = "Re-registering a command replaces its handler"
)]
fn reregistering_replaces_handler(world: RefCell<DispatchWorld>) {
    let _ = world;
}
