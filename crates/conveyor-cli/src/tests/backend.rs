//! Minimal execution backend for driving the CLI end to end.

use std::io::Write;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use conveyor::codec::{self, ExecuteRequest, JobStatus, Response};
use conveyor::transport::read_frame;

/// What the backend sends back on one connection.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Respond(Response),
    Raw(Vec<u8>),
    Close,
}

/// Backend serving one scripted reply per accepted connection.
pub(crate) struct Backend {
    port: u16,
    requests: Arc<Mutex<Vec<ExecuteRequest>>>,
    worker: Option<JoinHandle<()>>,
}

impl Backend {
    pub(crate) fn start(replies: Vec<Reply>) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind backend")?;
        let port = listener.local_addr().context("backend address")?.port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let worker = thread::spawn(move || {
            for reply in replies {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                let Ok(frame) = read_frame(&mut stream) else {
                    continue;
                };
                if let Ok(request) = codec::decode_request(&frame) {
                    recorded.lock().expect("request log lock").push(request);
                }
                let bytes = match reply {
                    Reply::Respond(response) => codec::encode_response(&response),
                    Reply::Raw(bytes) => bytes,
                    Reply::Close => Vec::new(),
                };
                stream.write_all(&bytes).expect("write reply");
            }
        });
        Ok(Self {
            port,
            requests,
            worker: Some(worker),
        })
    }

    pub(crate) const fn port(&self) -> u16 {
        self.port
    }

    /// Waits for every scripted reply to be served and returns the requests.
    pub(crate) fn finish(mut self) -> Vec<ExecuteRequest> {
        if let Some(worker) = self.worker.take() {
            worker.join().expect("backend thread");
        }
        self.requests.lock().expect("request log lock").clone()
    }
}

pub(crate) fn finished(std_out: &str) -> Response {
    Response {
        std_out: std_out.to_owned(),
        ..Response::default()
    }
}

pub(crate) fn failed(error: &str) -> Response {
    Response {
        error: error.to_owned(),
        ..Response::default()
    }
}

pub(crate) fn pending(job_id: u64) -> Response {
    Response {
        job_status: JobStatus::Pending.into(),
        job_id,
        ..Response::default()
    }
}

pub(crate) fn closed_port() -> u16 {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind probe");
    listener.local_addr().expect("probe address").port()
}
