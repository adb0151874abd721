//! Wire codec for backend exchanges.
//!
//! Requests and responses are protobuf records. The request is framed by the
//! transport with a fixed-width length prefix; the response is the whole
//! buffer read until the backend closes the connection.

mod messages;

use prost::Message;
use thiserror::Error;

use crate::envelope::CommandEnvelope;

pub use self::messages::{ExecuteRequest, JobStatus, Response};

/// Errors raised while decoding backend records.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The bytes were not a valid record.
    #[error("failed to decode {record}: {source}")]
    Decode {
        /// Name of the record being decoded.
        record: &'static str,
        /// Underlying protobuf error.
        #[source]
        source: prost::DecodeError,
    },
}

/// Builds the wire request for `envelope`.
///
/// The background flag is only set on the first attempt of a background
/// analysis that does not already resume a job.
#[must_use]
pub fn build_request(envelope: &CommandEnvelope) -> ExecuteRequest {
    ExecuteRequest {
        script: envelope.script().to_owned(),
        script_extern_obj: envelope.extern_object().unwrap_or_default().to_owned(),
        rpc_request: envelope.params().to_vec(),
        background: envelope.requests_background(),
        job_id: envelope.job_id().map_or(0, std::num::NonZeroU64::get),
    }
}

/// Serialises a request record.
#[must_use]
pub fn encode_request(request: &ExecuteRequest) -> Vec<u8> {
    request.encode_to_vec()
}

/// Parses a request record.
pub fn decode_request(bytes: &[u8]) -> Result<ExecuteRequest, CodecError> {
    ExecuteRequest::decode(bytes).map_err(|source| CodecError::Decode {
        record: "execute request",
        source,
    })
}

/// Serialises a response record.
#[must_use]
pub fn encode_response(response: &Response) -> Vec<u8> {
    response.encode_to_vec()
}

/// Parses a response record of any size.
pub fn decode_response(bytes: &[u8]) -> Result<Response, CodecError> {
    Response::decode(bytes).map_err(|source| CodecError::Decode {
        record: "response",
        source,
    })
}
