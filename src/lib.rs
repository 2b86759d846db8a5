//! Mail lookup gateway library.
//!
//! Answers Postfix socketmap, Dovecot dict and nginx auth_http lookups by
//! forwarding each one to a single backend as a `(verb, object)` query.

pub mod backend;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod protocol;
pub mod transport;

pub use backend::{Backend, BackendError, HttpBackend};
pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use protocol::{Query, Response, Status, StreamProtocol, Value};
