//! Scripted execution backend listening on an ephemeral TCP port.
//!
//! Each accepted connection consumes the next [`BackendReply`]. Requests are
//! decoded and recorded so tests can assert what went over the wire.

use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use conveyor_config::ConnectionSettings;

use crate::codec::{self, ExecuteRequest, Response};
use crate::transport::read_frame;

/// How the backend answers one connection.
#[derive(Debug, Clone)]
pub enum BackendReply {
    /// Replies with the encoded response.
    Respond(Response),
    /// Replies with raw bytes.
    Raw(Vec<u8>),
    /// Reads the request and closes without replying.
    Empty,
    /// Accepts the connection and closes it without reading anything.
    CloseBeforeRead,
    /// Waits before replying with the encoded response.
    Slow {
        /// Delay between reading the request and replying.
        delay: Duration,
        /// Response sent after the delay.
        response: Response,
    },
}

/// Handle to a running fake backend.
pub struct FakeBackend {
    settings: ConnectionSettings,
    requests: Arc<Mutex<Vec<ExecuteRequest>>>,
    errors: Arc<Mutex<Vec<String>>>,
}

impl FakeBackend {
    /// Binds to an ephemeral port and serves `replies` in order, one per
    /// connection.
    pub fn start(replies: Vec<BackendReply>) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake backend")?;
        let port = listener.local_addr().context("fake backend address")?.port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let errors = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        let failures = Arc::clone(&errors);
        thread::Builder::new()
            .name("fake-backend".to_owned())
            .spawn(move || {
                for reply in replies {
                    if let Err(error) = serve_one(&listener, &reply, &recorded) {
                        failures
                            .lock()
                            .expect("error log lock")
                            .push(format!("{error:#}"));
                    }
                }
            })
            .context("spawn fake backend")?;

        Ok(Self {
            settings: ConnectionSettings::new("127.0.0.1", port),
            requests,
            errors,
        })
    }

    /// Address to point a dispatcher at.
    pub fn settings(&self) -> ConnectionSettings {
        self.settings.clone()
    }

    /// Requests decoded so far.
    pub fn requests(&self) -> Vec<ExecuteRequest> {
        self.requests.lock().expect("request log lock").clone()
    }

    /// Polls until at least `count` requests arrived or `timeout` elapses.
    pub fn wait_for_requests(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.requests.lock().expect("request log lock").len() >= count {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    /// Failures raised while serving connections.
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().expect("error log lock").clone()
    }
}

fn serve_one(
    listener: &TcpListener,
    reply: &BackendReply,
    requests: &Mutex<Vec<ExecuteRequest>>,
) -> Result<()> {
    let (mut stream, _) = listener.accept().context("accept dispatcher connection")?;
    if matches!(reply, BackendReply::CloseBeforeRead) {
        drop(stream);
        return Ok(());
    }
    let frame = read_frame(&mut stream).context("read request frame")?;
    let request = codec::decode_request(&frame).context("decode request")?;
    requests.lock().expect("request log lock").push(request);
    match reply {
        BackendReply::Respond(response) => write_reply(&mut stream, &codec::encode_response(response)),
        BackendReply::Raw(bytes) => write_reply(&mut stream, bytes),
        BackendReply::Empty | BackendReply::CloseBeforeRead => Ok(()),
        BackendReply::Slow { delay, response } => {
            thread::sleep(*delay);
            write_reply(&mut stream, &codec::encode_response(response))
        }
    }
}

fn write_reply(stream: &mut TcpStream, bytes: &[u8]) -> Result<()> {
    stream.write_all(bytes).context("write reply")?;
    stream.flush().context("flush reply")
}

/// Settings for a local port nothing listens on.
pub fn unreachable_backend() -> ConnectionSettings {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind probe listener");
    let port = listener.local_addr().expect("probe address").port();
    drop(listener);
    ConnectionSettings::new("127.0.0.1", port)
}

/// A finished response carrying `std_out`.
pub fn finished(std_out: &str) -> Response {
    Response {
        std_out: std_out.to_owned(),
        ..Response::default()
    }
}

/// A pending response for background job `job_id`.
pub fn pending(job_id: u64) -> Response {
    Response {
        job_status: codec::JobStatus::Pending.into(),
        job_id,
        ..Response::default()
    }
}
