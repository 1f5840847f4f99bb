//! Per-connection client state touched by the dispatcher.

use super::perf::PerfSample;
use super::request::Request;
use super::response::Response;

/// State owned by the worker serving one client connection.
///
/// The dispatcher fills `current_command` and `perf_sample` for the duration
/// of a single dispatch and clears both before returning. Responses queued by
/// handlers stay in the outbox until the session loop drains them.
#[derive(Debug, Default)]
pub struct ClientContext {
    is_owner: bool,
    current_command: Option<Request>,
    perf_sample: Option<PerfSample>,
    outbox: Vec<Response>,
}

impl ClientContext {
    /// Creates the context for a newly accepted client.
    #[must_use]
    pub fn new(is_owner: bool) -> Self {
        Self {
            is_owner,
            ..Self::default()
        }
    }

    /// Returns true when the peer runs as the daemon's owning user.
    #[must_use]
    pub fn is_owner(&self) -> bool {
        self.is_owner
    }

    /// Request currently being dispatched, for diagnostics.
    #[must_use]
    pub fn current_command(&self) -> Option<&Request> {
        self.current_command.as_ref()
    }

    /// Active performance sample, letting handlers attach metadata.
    pub fn perf_sample_mut(&mut self) -> Option<&mut PerfSample> {
        self.perf_sample.as_mut()
    }

    /// Returns true when a performance sample is attached.
    #[must_use]
    pub fn has_perf_sample(&self) -> bool {
        self.perf_sample.is_some()
    }

    /// Queues a response for the client.
    pub fn send_response(&mut self, response: Response) {
        self.outbox.push(response);
    }

    /// Queues an error response carrying only `message`.
    pub fn send_error_response(&mut self, message: impl Into<String>) {
        self.send_response(Response::error(message));
    }

    /// Responses queued so far, oldest first.
    #[must_use]
    pub fn pending_responses(&self) -> &[Response] {
        &self.outbox
    }

    /// Drains every queued response.
    pub fn take_responses(&mut self) -> Vec<Response> {
        std::mem::take(&mut self.outbox)
    }

    pub(crate) fn begin_command(&mut self, request: &Request) {
        self.current_command = Some(request.clone());
    }

    pub(crate) fn attach_perf_sample(&mut self, sample: PerfSample) {
        self.perf_sample = Some(sample);
    }

    pub(crate) fn detach_perf_sample(&mut self) -> Option<PerfSample> {
        self.perf_sample.take()
    }

    pub(crate) fn end_command(&mut self) {
        self.current_command = None;
        self.perf_sample = None;
    }
}
