//! Client Module
//!
//! HTTP transport for streaming provider requests.

pub mod http;

pub use http::{ByteStream, HttpClient, PreparedRequest};
