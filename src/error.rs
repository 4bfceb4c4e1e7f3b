//! Error types for signing and link submission.

use alloy::primitives::Address;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid operator input.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed type schema: undefined type, bad field type, or a cycle.
    #[error("schema error: {0}")]
    Schema(String),

    /// A struct value does not carry exactly the fields its type declares.
    #[error("field mismatch in `{type_name}`: {message}")]
    FieldMismatch { type_name: String, message: String },

    /// A value does not fit the type declared for it.
    #[error("type mismatch: expected `{expected}`, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("signing failed: {0}")]
    Signing(#[from] alloy::signers::Error),

    /// The signature recovers to someone other than the signer.
    #[error("signature recovers to {recovered}, expected {expected}")]
    RecoveryMismatch {
        expected: Address,
        recovered: Address,
    },

    #[error("gas estimation failed: {0}")]
    GasEstimation(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("HTTP request error: {0}")]
    Http(reqwest::Error),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The remote service rejected a submission.
    #[error("rejected by remote: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(err.to_string())
        } else {
            Error::Http(err)
        }
    }
}

impl From<alloy::transports::TransportError> for Error {
    fn from(err: alloy::transports::TransportError) -> Self {
        Error::Rpc(err.to_string())
    }
}

impl Error {
    pub(crate) fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Error::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub(crate) fn field_mismatch(type_name: &str, message: impl Into<String>) -> Self {
        Error::FieldMismatch {
            type_name: type_name.to_owned(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
