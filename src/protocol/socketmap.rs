//! Postfix socketmap lookups.
//!
//! Request payload: `<name> <key>`. Replies: `OK <value>`, `NOTFOUND `,
//! `TIMEOUT <reason>` (ends the session) and `PERM <reason>`.

use bytes::Bytes;

use super::{contract_violation, Fault, Query, Reply, Request, Response, Status, Value};
use crate::backend::BackendError;

pub const NOT_FOUND: &[u8] = b"NOTFOUND ";
pub const BACKEND_FAILURE: &[u8] = b"TIMEOUT error in backend";
pub const MALFORMED: &[u8] = b"PERM malformed request";

/// Split `<name> <key>` at the first space.
pub fn parse(frame: &[u8]) -> Request {
    match frame.iter().position(|&b| b == b' ') {
        Some(sep) if sep > 0 => Request::Lookup(Query::new(
            String::from_utf8_lossy(&frame[..sep]),
            Value::Text(String::from_utf8_lossy(&frame[sep + 1..]).into_owned()),
        )),
        _ => Request::Reject(Bytes::from_static(MALFORMED)),
    }
}

pub fn render(outcome: Result<Response, BackendError>) -> Reply {
    let failed = |fault: Fault| Reply::Fatal(Bytes::from_static(BACKEND_FAILURE), fault);

    match outcome {
        Err(e) => failed(Fault::Backend(e)),
        Ok(response) => match (&response.status, &response.data) {
            (Status::Found, Value::Text(data)) => {
                let mut reply = Vec::with_capacity(3 + data.len());
                reply.extend_from_slice(b"OK ");
                reply.extend_from_slice(data.as_bytes());
                Reply::Continue(Bytes::from(reply))
            }
            (Status::NotFound, _) => Reply::Continue(Bytes::from_static(NOT_FOUND)),
            (Status::Found, Value::Map(_) | Value::Other(_)) | (Status::Unknown, _) => {
                failed(contract_violation(&response))
            }
        },
    }
}
