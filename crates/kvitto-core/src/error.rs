//! Error types for kvitto

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Authorization header absent or not a bearer credential.
    #[error("Missing credential")]
    MissingCredential,

    /// Signature, expiry, or claim failure. Detail is logged server-side;
    /// callers only ever see this generic form.
    #[error("Invalid credential")]
    InvalidCredential,

    /// Operator error: a required secret or credential is not configured.
    #[error("Server misconfigured: {0}")]
    Misconfigured(&'static str),

    #[error("Invalid receipt id: {0}")]
    BadId(String),

    /// Unknown id or an id owned by a different subject; the two are
    /// indistinguishable on purpose.
    #[error("Receipt not found")]
    NotFound,

    #[error("Store error: {0}")]
    Store(String),

    #[error("No file provided")]
    NoFile,

    #[error("Upload exceeds {limit} bytes")]
    UploadTooLarge { limit: usize },

    /// Transport or provider failure while calling the model.
    #[error("Model request failed: {0}")]
    Analysis(String),

    /// Model output contained no JSON-like payload.
    #[error("No JSON found in model output")]
    ModelFormat { raw: String },

    /// Model output contained a JSON-like payload that failed to parse.
    #[error("Model output is not valid JSON: {reason}")]
    ModelJson { reason: String, raw: String },
}

pub type Result<T> = std::result::Result<T, Error>;
