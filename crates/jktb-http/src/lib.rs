//! HTTP session carrier for the report workflow.
//!
//! Provides the cookie-carrying session every stage runs over, with a
//! transport seam so the workflow can be driven without a network.
//!
//! - [`transport`] - the [`Transport`] trait and plain request/response values
//! - [`client`] - reqwest-backed transport with a shared cookie jar
//! - [`session`] - base headers layered over a transport
//! - [`error`] - transport errors using thiserror

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod client;
pub mod error;
pub mod session;
pub mod transport;

pub use client::ReqwestTransport;
pub use error::{Result, TransportError};
pub use session::Session;
pub use transport::{Body, HttpRequest, HttpResponse, Method, Transport};
