//! Renders `sqlrest-core`'s request model into the shapes a developer
//! actually pastes somewhere: an HTTP request, a client-library call
//! chain, a cURL invocation, or a raw request line.
//!
//! Every renderer here is a pure function of `(&Select, &RenderConfig)`,
//! no I/O, no shared state.

pub mod client;
pub mod config;
pub mod format;
pub mod http;
pub mod shared;

pub use client::render_client;
pub use config::{ClientVariant, RenderConfig};
pub use format::{render_curl, render_raw_http};
pub use http::{render_http, HttpRequest};

pub use sqlrest_core::{Error, Result};

/// Common imports for callers of `sqlrest-render`.
pub mod prelude {
    pub use crate::client::render_client;
    pub use crate::config::{ClientVariant, RenderConfig};
    pub use crate::format::{render_curl, render_raw_http};
    pub use crate::http::{render_http, HttpRequest};
    pub use sqlrest_core::prelude::*;
}
