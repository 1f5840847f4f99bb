//! Fake daemon used to observe what the CLI forwards.
//!
//! Accepts a single TCP connection, records the request line and answers with
//! canned response lines before closing the stream.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};

pub(in crate::tests) struct FakeDaemon {
    port: u16,
    requests: Arc<Mutex<Vec<String>>>,
    handle: Option<thread::JoinHandle<Result<()>>>,
}

impl FakeDaemon {
    /// Spawns a fake daemon on an ephemeral port that answers with `lines`.
    pub fn spawn(lines: Vec<String>) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake daemon")?;
        listener
            .set_nonblocking(true)
            .context("fake daemon nonblocking")?;
        let port = listener.local_addr().context("local addr")?.port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let handle = thread::spawn(move || serve_client(&listener, &lines, &recorded));
        Ok(Self {
            port,
            requests,
            handle: Some(handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Waits for the daemon thread and returns the recorded request lines.
    pub fn take_requests(&mut self) -> Result<Vec<String>> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake daemon thread panicked"))?
                .context("fake daemon failed")?;
        }
        let requests = self
            .requests
            .lock()
            .map_err(|error| anyhow!("lock requests: {error}"))?;
        Ok(requests.clone())
    }
}

impl Drop for FakeDaemon {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve_client(
    listener: &TcpListener,
    lines: &[String],
    requests: &Mutex<Vec<String>>,
) -> Result<()> {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        match listener.accept() {
            Ok((stream, _)) => return respond(stream, lines, requests),
            Err(ref error)
                if error.kind() == io::ErrorKind::WouldBlock && Instant::now() < deadline =>
            {
                thread::sleep(Duration::from_millis(10));
            }
            // Preflight rejections never connect.
            Err(ref error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(()),
            Err(error) => return Err(error).context("accept connection"),
        }
    }
}

fn respond(mut stream: TcpStream, lines: &[String], requests: &Mutex<Vec<String>>) -> Result<()> {
    stream
        .set_nonblocking(false)
        .context("blocking client stream")?;
    let mut line = String::new();
    BufReader::new(stream.try_clone().context("clone stream")?)
        .read_line(&mut line)
        .context("read request")?;
    requests
        .lock()
        .map_err(|error| anyhow!("lock requests: {error}"))?
        .push(line.trim_end().to_owned());
    for response in lines {
        stream.write_all(response.as_bytes())?;
        stream.write_all(b"\n")?;
    }
    stream.flush().context("flush responses")
}
