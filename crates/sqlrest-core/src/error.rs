//! Error taxonomy for the SQL-to-PostgREST lowering pipeline.
//!
//! Four distinct kinds, mirroring the four ways a translation can fail:
//! the SQL didn't parse, the SQL parsed but uses a construct PostgREST has
//! no equivalent for, the SQL names a statement kind we've reserved but not
//! wired up, or the lowered request model can't be expressed by the chosen
//! renderer.

use thiserror::Error;

/// Result type for the lowering and rendering pipeline.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The SQL text did not parse. `cursor` is the byte offset the parser
    /// reported, when available.
    #[error("{message}")]
    Parsing {
        message: String,
        cursor: Option<i32>,
        hint: Option<String>,
    },

    /// The SQL parsed but uses a construct outside PostgREST's subset, or
    /// violates one of the cross-clause invariants in spec.md §3.
    #[error("{message}")]
    Unsupported { message: String, hint: Option<String> },

    /// A known statement kind (`INSERT`/`UPDATE`/`DELETE`/`EXPLAIN`) that is
    /// reserved but not yet wired up. Distinguished from `Unsupported` to
    /// communicate roadmap intent rather than a permanent rejection.
    #[error("{message}")]
    Unimplemented { message: String },

    /// The request model is valid but `renderer` can't express it.
    #[error("{renderer} cannot render this request: {message}")]
    Render { renderer: String, message: String },
}

impl Error {
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
            hint: None,
        }
    }

    pub fn unsupported_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    pub fn unimplemented(message: impl Into<String>) -> Self {
        Self::Unimplemented {
            message: message.into(),
        }
    }

    pub fn render(renderer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Render {
            renderer: renderer.into(),
            message: message.into(),
        }
    }

    /// Stable error code for external reference, in the style of
    /// PostgREST's own `PGRSTxxx` codes.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Parsing { .. } => "SQLREST100",
            Self::Unsupported { .. } => "SQLREST200",
            Self::Unimplemented { .. } => "SQLREST300",
            Self::Render { .. } => "SQLREST400",
        }
    }

    /// Remediation hint, if one is known.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Parsing { hint, .. } => hint.as_deref(),
            Self::Unsupported { hint, .. } => hint.as_deref(),
            Self::Unimplemented { .. } | Self::Render { .. } => None,
        }
    }

    /// Structured JSON representation, for embedding in tool output or
    /// test fixtures.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.error_code(),
            "message": self.to_string(),
            "hint": self.hint(),
        })
    }
}

/// Build a `Parsing` error from a raw parser message, attaching a hint when
/// the message matches one of the known patterns below.
pub fn parsing_error(message: impl Into<String>, cursor: Option<i32>) -> Error {
    let message = message.into();
    let hint = parser_hint(&message);
    Error::Parsing {
        message,
        cursor,
        hint,
    }
}

/// Lookup table mapping common parser messages to actionable hints.
fn parser_hint(message: &str) -> Option<String> {
    let lower = message.to_lowercase();
    if lower.contains("syntax error at or near \"from\"") {
        Some("Did you leave a trailing comma in the select target list?".to_string())
    } else if lower.contains("syntax error at or near \"where\"") {
        Some("Do you have an incomplete join in the FROM clause?".to_string())
    } else if lower.contains("syntax error at or near \"group\"") {
        Some("Did you leave a trailing comma in the order by or select list?".to_string())
    } else if lower.contains("syntax error at end of input") {
        Some("The statement looks incomplete, check for unbalanced parentheses.".to_string())
    } else {
        None
    }
}
