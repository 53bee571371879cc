//! Errors at the extension boundary.

use behirut_core::TreeError;
use wasm_bindgen::JsValue;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ContentError {
    #[error("no document in this context")]
    NoDocument,

    #[error("extension API unavailable: {0}")]
    MissingApi(&'static str),

    #[error("extension call failed: {0}")]
    Call(String),

    #[error("storage read failed: {0}")]
    Storage(String),

    #[error("could not decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },

    #[error(transparent)]
    Tree(#[from] TreeError),
}

impl ContentError {
    pub(crate) fn decode(what: &'static str, err: serde_wasm_bindgen::Error) -> Self {
        ContentError::Decode {
            what,
            reason: err.to_string(),
        }
    }
}

/// Describe a thrown JS value for logging.
pub(crate) fn describe(value: &JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{value:?}"))
}
