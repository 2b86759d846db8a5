//! Dovecot dict lookups.
//!
//! `H...` lines are handshakes and get no answer. `L<context>/<verb>/<object>`
//! is a lookup answered with `O<json>`, `N` or `F`. Anything else gets `F`
//! and the session carries on.

use bytes::Bytes;

use super::{contract_violation, Fault, Query, Reply, Request, Response, Status, Value};
use crate::backend::BackendError;

pub const NOT_FOUND: &[u8] = b"N";
pub const FAILURE: &[u8] = b"F";

pub fn parse(frame: &[u8]) -> Request {
    match frame.first() {
        Some(b'H') => Request::Ignore,
        Some(b'L') => parse_lookup(&frame[1..]),
        _ => Request::Reject(Bytes::from_static(FAILURE)),
    }
}

fn parse_lookup(rest: &[u8]) -> Request {
    let mut parts = rest.splitn(3, |&b| b == b'/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(context), Some(verb), Some(object)) if !verb.is_empty() => Request::Lookup(Query::new(
            String::from_utf8_lossy(verb),
            Value::fields([
                ("context", String::from_utf8_lossy(context)),
                ("object", String::from_utf8_lossy(object)),
            ]),
        )),
        _ => Request::Reject(Bytes::from_static(FAILURE)),
    }
}

pub fn render(outcome: Result<Response, BackendError>) -> Reply {
    let failed = |fault: Fault| Reply::Fatal(Bytes::from_static(FAILURE), fault);

    match outcome {
        Err(e) => failed(Fault::Backend(e)),
        Ok(response) => match response.status {
            Status::Found => {
                let mut reply = vec![b'O'];
                match serde_json::to_writer(&mut reply, &response.data) {
                    Ok(()) => Reply::Continue(Bytes::from(reply)),
                    Err(e) => failed(Fault::Contract(format!("cannot serialize {:?}: {}", response.data, e))),
                }
            }
            Status::NotFound => Reply::Continue(Bytes::from_static(NOT_FOUND)),
            Status::Unknown => failed(contract_violation(&response)),
        },
    }
}
