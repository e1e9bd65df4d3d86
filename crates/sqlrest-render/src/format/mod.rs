//! Presentation formatters that wrap a rendered [`crate::http::HttpRequest`]
//! for display: a cURL invocation and a raw HTTP/1.1 request line.

pub mod curl;
pub mod raw;

pub use curl::render_curl;
pub use raw::render_raw_http;
