use std::io;
use std::net::AddrParseError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hyper::ext::ReasonPhrase;
use thiserror::Error;

/// Terminal request errors. Each one maps straight onto an HTTP response and
/// never leaves the handler that detected it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayError {
    #[error("Invalid Method")]
    InvalidMethod,

    #[error("Bad Request")]
    BadRequest,
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidMethod => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::BadRequest => StatusCode::BAD_REQUEST,
        }
    }

    /// Status line text, e.g. `405 Invalid Method`.
    pub fn reason(&self) -> ReasonPhrase {
        match self {
            RelayError::InvalidMethod => ReasonPhrase::from_static(b"Invalid Method"),
            RelayError::BadRequest => ReasonPhrase::from_static(b"Bad Request"),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), self.to_string()).into_response();
        response.extensions_mut().insert(self.reason());
        response
    }
}

/// A notification could not be handed to its subscriber.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("subscriber {0} is no longer listening")]
    PeerGone(u64),
}

/// Fatal errors raised before the dispatch loop starts.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("failed to read config {path}: {source}")]
    ConfigRead { path: String, source: io::Error },

    #[error("invalid config {path}: {source}")]
    ConfigParse {
        path: String,
        source: serde_json::Error,
    },

    #[error("invalid bind address {addr}: {source}")]
    InvalidAddress {
        addr: String,
        source: AddrParseError,
    },

    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },

    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}
