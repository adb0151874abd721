//! Capture of undecodable responses for offline inspection.

use std::fs::OpenOptions;
use std::io::{self, Write};

use camino::Utf8PathBuf;
use tracing::warn;

use super::DISPATCH_TARGET;

const RECORD_HEADER: &[u8] = b"\nReceived:\n";
const RECORD_TRAILER: &[u8] = b"\r\n";

/// Appends raw response bytes to a dump file.
#[derive(Debug, Clone)]
pub(crate) struct ResponseCapture {
    path: Utf8PathBuf,
}

impl ResponseCapture {
    pub(crate) fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Appends one record. Write failures are logged and otherwise ignored.
    pub(crate) fn record(&self, bytes: &[u8]) {
        if let Err(error) = self.append(bytes) {
            warn!(
                target: DISPATCH_TARGET,
                path = %self.path,
                error = %error,
                "failed to capture undecodable response"
            );
        }
    }

    fn append(&self, bytes: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_std_path())?;
        let mut record = Vec::with_capacity(RECORD_HEADER.len() + bytes.len() + RECORD_TRAILER.len());
        record.extend_from_slice(RECORD_HEADER);
        record.extend_from_slice(bytes);
        record.extend_from_slice(RECORD_TRAILER);
        file.write_all(&record)?;
        file.flush()
    }
}
