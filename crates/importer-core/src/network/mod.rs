//! Remote transport over HTTP.
//!
//! This module provides:
//! - A lazily opened HTTP session (cookie jar, timeout, mutual TLS)
//! - The request/response procedure that forwards one envelope and maps the
//!   outcome onto the importer error taxonomy
//!
//! There is no retry anywhere in this layer; a failed exchange is reported
//! once and the caller decides what to do.

mod session;
mod transport;

pub use session::{endpoint_url, RemoteSession};
pub use transport::RemoteTransport;
