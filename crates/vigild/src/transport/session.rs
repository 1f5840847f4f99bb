//! Newline-framed JSON sessions driven by the dispatcher.

use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};

use tracing::{debug, warn};

use crate::commands::{
    ClientContext, DecodeError, Dispatcher, MAX_REQUEST_BYTES, PduFormat, Request,
};

use super::{ConnectionHandler, ConnectionStream, TRANSPORT_TARGET};

enum Frame {
    Eof,
    Blank,
    Request(Request),
    Invalid(DecodeError),
}

/// Connection handler that serves one client session.
///
/// Requests are read one line at a time until EOF. Every response a handler
/// queues is written back as a compact JSON line after its dispatch. A line
/// that cannot be decoded is answered with an error and ends the session.
#[derive(Clone)]
pub struct SessionHandler {
    dispatcher: Dispatcher,
}

impl SessionHandler {
    /// Builds a handler dispatching through `dispatcher`.
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Runs a session over arbitrary reader and writer halves.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error when reading or writing fails.
    pub fn serve<R, W>(
        &self,
        reader: &mut R,
        writer: &mut W,
        client: &mut ClientContext,
    ) -> io::Result<()>
    where
        R: BufRead,
        W: Write,
    {
        let mut line = Vec::new();
        loop {
            match read_frame(reader, &mut line)? {
                Frame::Eof => return Ok(()),
                Frame::Blank => {}
                Frame::Request(request) => {
                    self.dispatcher.dispatch(client, &request);
                    write_responses(client, writer)?;
                }
                Frame::Invalid(error) => {
                    debug!(
                        target: TRANSPORT_TARGET,
                        error = %error,
                        "closing session after undecodable request"
                    );
                    client.send_error_response(error.to_string());
                    return write_responses(client, writer);
                }
            }
        }
    }
}

impl ConnectionHandler for SessionHandler {
    fn handle(&self, stream: ConnectionStream) {
        let mut client = ClientContext::new(stream.peer_is_owner());
        debug!(
            target: TRANSPORT_TARGET,
            owner = client.is_owner(),
            "session opened"
        );
        let outcome = stream.try_clone().and_then(|read_half| {
            let mut reader = BufReader::new(read_half);
            let mut writer = BufWriter::new(stream);
            self.serve(&mut reader, &mut writer, &mut client)
        });
        match outcome {
            Ok(()) => debug!(target: TRANSPORT_TARGET, "session closed"),
            Err(error) => warn!(target: TRANSPORT_TARGET, error = %error, "session failed"),
        }
    }
}

fn read_frame<R: BufRead>(reader: &mut R, line: &mut Vec<u8>) -> io::Result<Frame> {
    line.clear();
    let limit = u64::try_from(MAX_REQUEST_BYTES).unwrap_or(u64::MAX).saturating_add(1);
    let read = read_until_retrying(&mut reader.by_ref().take(limit), line)?;
    if read == 0 {
        return Ok(Frame::Eof);
    }
    if line.len() > MAX_REQUEST_BYTES {
        return Ok(Frame::Invalid(DecodeError::TooLarge {
            size: line.len(),
            max_size: MAX_REQUEST_BYTES,
        }));
    }
    Ok(match Request::parse(line) {
        Ok(request) => Frame::Request(request),
        Err(DecodeError::Empty) => Frame::Blank,
        Err(error) => Frame::Invalid(error),
    })
}

fn read_until_retrying<R: BufRead>(reader: &mut R, line: &mut Vec<u8>) -> io::Result<usize> {
    loop {
        match reader.read_until(b'\n', line) {
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            other => return other,
        }
    }
}

fn write_responses<W: Write>(client: &mut ClientContext, writer: &mut W) -> io::Result<()> {
    for response in client.take_responses() {
        response.write_pdu(PduFormat::Json, writer)?;
    }
    Ok(())
}
