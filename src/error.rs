// SPDX-License-Identifier: MIT
//!
//! Failure causes of a backend request
//!

/// Why a request to the index service did not produce a usable payload.
///
/// Callers outside the crate only ever see the message folded into
/// [`crate::Outcome::Failure`]; the variant is kept for logging.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// Building the request failed, e.g. the upload file can not be read
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Connection refused, reset, TLS error ...
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// 2xx response whose body is not the expected JSON
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Non-2xx response
    #[error("server returned {status}")]
    Rejected {
        status: reqwest::StatusCode,
        detail: Option<String>,
    },
}

impl ClientError {
    /// Message shown to the user, `fallback` unless the server sent a detail
    /// or the request could not be built locally.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Io(err) => err.to_string(),
            Self::Rejected {
                detail: Some(detail),
                ..
            } => detail.clone(),
            _ => fallback.to_string(),
        }
    }
}
