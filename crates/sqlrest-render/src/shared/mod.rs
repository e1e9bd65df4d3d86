//! Rendering primitives shared by the HTTP and client-code renderers: the
//! PostgREST target-list syntax and the PostgREST filter-value syntax. Both
//! renderers format these identically; only the surrounding shape (query
//! string vs. method chain) differs.

pub mod filter;
pub mod target_list;

pub use filter::{render_filter_child, render_filter_value, render_logical_filter};
pub use target_list::{is_bare_star, render_targets};
