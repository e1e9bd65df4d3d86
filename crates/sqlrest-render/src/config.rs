//! Renderer configuration: small, serde-backed knobs with environment
//! overrides for outward-facing behavior.

use serde::{Deserialize, Serialize};

fn default_url_safe() -> bool {
    true
}

fn default_curl_host() -> String {
    "http://localhost:3000".to_string()
}

fn default_client_variant() -> ClientVariant {
    ClientVariant::PostgrestJs
}

/// Closed set of client-code dialects `render_client` can target. Only
/// `PostgrestJs` is implemented; the enum stays closed rather than an open
/// string so an unsupported choice fails at config-parse time, not deep
/// inside rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientVariant {
    PostgrestJs,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Translate `%`/`_` LIKE wildcards to PostgREST's URL-safe `*` form
    /// when rendering HTTP filter values.
    #[serde(default = "default_url_safe")]
    pub url_safe: bool,

    /// Origin used as the base for the cURL and raw-HTTP formatters.
    #[serde(default = "default_curl_host")]
    pub curl_host: String,

    #[serde(default = "default_client_variant")]
    pub client_variant: ClientVariant,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            url_safe: default_url_safe(),
            curl_host: default_curl_host(),
            client_variant: default_client_variant(),
        }
    }
}

impl RenderConfig {
    /// Overlay `SQLREST_*` environment variables on top of the defaults.
    /// Unset or unparseable variables are left at their default rather than
    /// erroring: config is best-effort, never a reason to fail a render.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("SQLREST_URL_SAFE") {
            config.url_safe = matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }

        if let Ok(value) = std::env::var("SQLREST_CURL_HOST") {
            config.curl_host = value;
        }

        config
    }
}
