/// Error types for the Shorts limiter

use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LimiterError {
    #[error("Channel failure: {0}")]
    Channel(String),

    #[error("Storage failure: {0}")]
    Storage(String),

    #[error("DOM failure: {0}")]
    Dom(String),

    #[error("Please enter a valid limit greater than 0.")]
    InvalidLimit(String),

    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Readable text for a thrown JS value (Error objects, strings, anything else).
pub fn describe(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    js_sys::Reflect::get(value, &JsValue::from_str("message"))
        .ok()
        .and_then(|message| message.as_string())
        .unwrap_or_else(|| format!("{:?}", value))
}
