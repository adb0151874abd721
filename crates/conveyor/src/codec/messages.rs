//! Protobuf records exchanged with the execution backend.
//!
//! Optional fields follow proto3 conventions: an empty string or a zero job
//! id means the field is absent.

use std::num::NonZeroU64;

/// Request to execute a script on the backend.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ExecuteRequest {
    /// Script body.
    #[prost(string, tag = "1")]
    pub script: String,
    /// External object the script runs against; empty when absent.
    #[prost(string, tag = "2")]
    pub script_extern_obj: String,
    /// Opaque, caller-serialised request parameters.
    #[prost(bytes = "vec", tag = "3")]
    pub rpc_request: Vec<u8>,
    /// Asks the backend to run the script as a background job.
    #[prost(bool, tag = "4")]
    pub background: bool,
    /// Background job being resumed; zero when absent.
    #[prost(uint64, tag = "5")]
    pub job_id: u64,
}

impl ExecuteRequest {
    /// External object name, if present.
    #[must_use]
    pub fn extern_object(&self) -> Option<&str> {
        (!self.script_extern_obj.is_empty()).then_some(self.script_extern_obj.as_str())
    }

    /// Job being resumed, if present.
    #[must_use]
    pub const fn resumed_job(&self) -> Option<NonZeroU64> {
        NonZeroU64::new(self.job_id)
    }
}

/// State of the job a response refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum JobStatus {
    /// The script ran to completion; the response carries its results.
    Finished = 0,
    /// The job is still running; poll again with the returned job id.
    Pending = 1,
}

/// Backend reply to an [`ExecuteRequest`].
#[derive(Clone, PartialEq, prost::Message)]
pub struct Response {
    /// Job state, see [`JobStatus`].
    #[prost(enumeration = "JobStatus", tag = "1")]
    pub job_status: i32,
    /// Job identifier assigned by the backend; zero when the script did not
    /// run as a job.
    #[prost(uint64, tag = "2")]
    pub job_id: u64,
    /// Error reported by the backend; empty on success.
    #[prost(string, tag = "3")]
    pub error: String,
    /// Captured standard output of the script.
    #[prost(string, tag = "4")]
    pub std_out: String,
    /// Captured standard error of the script.
    #[prost(string, tag = "5")]
    pub std_err: String,
    /// Opaque, command-specific result payload.
    #[prost(bytes = "vec", tag = "6")]
    pub rpc_result: Vec<u8>,
}

impl Response {
    /// Returns true while the backend job is still running.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.job_status() == JobStatus::Pending
    }

    /// Job to poll when the response is pending.
    #[must_use]
    pub fn pending_job(&self) -> Option<NonZeroU64> {
        if self.is_pending() {
            NonZeroU64::new(self.job_id)
        } else {
            None
        }
    }

    /// Backend error, if one was reported.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        (!self.error.is_empty()).then_some(self.error.as_str())
    }
}
