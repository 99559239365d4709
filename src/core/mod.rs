// Core modules implementing the TCP service, HTTP handling, and error modeling.
pub mod error;
pub(crate) mod http;
pub(crate) mod routes;
pub mod server;
