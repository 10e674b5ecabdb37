//! Error types for the Modelgrid SDK.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when using the SDK.
///
/// HTTP error responses are mapped to a dedicated variant per status code so
/// callers can match on the failure class instead of inspecting numbers. Codes
/// without a dedicated variant fall back to [`Error::Client`] or
/// [`Error::Server`].
#[derive(Debug, Error)]
pub enum Error {
    /// The API rejected the request as malformed (HTTP 400).
    #[error("bad request to {url}: {message}")]
    BadRequest {
        /// URL of the failed request.
        url: String,
        /// Error message from the API.
        message: String,
    },

    /// The API key was missing or not accepted (HTTP 401).
    #[error("unauthorized request to {url}: {message}")]
    Unauthorized {
        /// URL of the failed request.
        url: String,
        /// Error message from the API.
        message: String,
    },

    /// The API key is valid but not allowed this operation (HTTP 403).
    #[error("forbidden request to {url}: {message}")]
    Forbidden {
        /// URL of the failed request.
        url: String,
        /// Error message from the API.
        message: String,
    },

    /// The requested entity does not exist (HTTP 404).
    #[error("not found at {url}: {message}")]
    NotFound {
        /// URL of the failed request.
        url: String,
        /// Error message from the API.
        message: String,
    },

    /// The endpoint does not support this HTTP method (HTTP 405).
    #[error("method not allowed at {url}: {message}")]
    MethodNotAllowed {
        /// URL of the failed request.
        url: String,
        /// Error message from the API.
        message: String,
    },

    /// The API cannot produce an acceptable response (HTTP 406).
    #[error("not acceptable at {url}: {message}")]
    NotAcceptable {
        /// URL of the failed request.
        url: String,
        /// Error message from the API.
        message: String,
    },

    /// The request conflicts with the current state (HTTP 409).
    #[error("conflict at {url}: {message}")]
    Conflict {
        /// URL of the failed request.
        url: String,
        /// Error message from the API.
        message: String,
    },

    /// The request body exceeded the platform limit (HTTP 413).
    #[error("payload too large at {url}: {message}")]
    PayloadTooLarge {
        /// URL of the failed request.
        url: String,
        /// Error message from the API.
        message: String,
    },

    /// The request was well formed but semantically invalid (HTTP 422).
    #[error("unprocessable entity at {url}: {message}")]
    Unprocessable {
        /// URL of the failed request.
        url: String,
        /// Error message from the API.
        message: String,
    },

    /// The platform failed internally (HTTP 500).
    #[error("internal server error at {url}: {message}")]
    InternalServer {
        /// URL of the failed request.
        url: String,
        /// Error message from the API.
        message: String,
    },

    /// Any other 4xx response.
    #[error("client error (status {status}) at {url}: {message}")]
    Client {
        /// HTTP status code.
        status: u16,
        /// URL of the failed request.
        url: String,
        /// Error message from the API.
        message: String,
    },

    /// Any other 5xx response.
    #[error("server error (status {status}) at {url}: {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// URL of the failed request.
        url: String,
        /// Error message from the API.
        message: String,
    },

    /// The request never produced an HTTP response.
    #[error("network error for {url}: {message}")]
    Network {
        /// URL of the failed request.
        url: String,
        /// Description of the transport failure.
        message: String,
        /// Underlying transport error, when one exists.
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The API returned a 2xx response whose body could not be decoded.
    #[error("invalid response from {url}: {message}")]
    InvalidResponse {
        /// URL of the request.
        url: String,
        /// Description of the decoding failure.
        message: String,
    },

    /// The provided input sources do not have a submittable shape.
    #[error("invalid input sources: {message}")]
    InvalidSources {
        /// Description of the shape problem.
        message: String,
    },

    /// A human-readable byte size could not be parsed.
    #[error("invalid size {value:?}: {message}")]
    InvalidSize {
        /// The rejected size string.
        value: String,
        /// Description of the parse failure.
        message: String,
    },

    /// The model reported a failure for one input source.
    #[error("source {source_name:?} failed: {message}")]
    SourceFailed {
        /// Name of the failed source.
        source_name: String,
        /// Failure message reported by the model.
        message: String,
    },

    /// The requested source name is in neither the results nor the failures.
    #[error("source {source_name:?} not found in job results")]
    SourceNotFound {
        /// Name of the missing source.
        source_name: String,
    },

    /// The job result carries no source outputs at all yet.
    #[error("no source outputs available; the job may still be running")]
    NoOutputs,

    /// A blocking wait gave up before the watched entity reached a terminal
    /// state.
    #[error("timed out after waiting {waited:?}")]
    Timeout {
        /// How long the caller waited before giving up.
        waited: Duration,
    },

    /// The client was constructed with invalid settings.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },

    /// A local file could not be read for upload.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path of the file that could not be read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Maps an HTTP error status to the matching variant.
    pub(crate) fn from_status(status: u16, url: impl Into<String>, message: impl Into<String>) -> Self {
        let url = url.into();
        let message = message.into();
        match status {
            400 => Error::BadRequest { url, message },
            401 => Error::Unauthorized { url, message },
            403 => Error::Forbidden { url, message },
            404 => Error::NotFound { url, message },
            405 => Error::MethodNotAllowed { url, message },
            406 => Error::NotAcceptable { url, message },
            409 => Error::Conflict { url, message },
            413 => Error::PayloadTooLarge { url, message },
            422 => Error::Unprocessable { url, message },
            500 => Error::InternalServer { url, message },
            s if (400..500).contains(&s) => Error::Client { status: s, url, message },
            s => Error::Server { status: s, url, message },
        }
    }

    /// Creates a configuration error.
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Config { message: message.into() }
    }

    /// Creates an invalid-sources error.
    pub(crate) fn invalid_sources(message: impl Into<String>) -> Self {
        Error::InvalidSources { message: message.into() }
    }

    /// Returns the HTTP status code behind this error, when one exists.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::BadRequest { .. } => Some(400),
            Error::Unauthorized { .. } => Some(401),
            Error::Forbidden { .. } => Some(403),
            Error::NotFound { .. } => Some(404),
            Error::MethodNotAllowed { .. } => Some(405),
            Error::NotAcceptable { .. } => Some(406),
            Error::Conflict { .. } => Some(409),
            Error::PayloadTooLarge { .. } => Some(413),
            Error::Unprocessable { .. } => Some(422),
            Error::InternalServer { .. } => Some(500),
            Error::Client { status, .. } | Error::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` when the entity was reported missing by the API.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Returns `true` when a blocking wait exhausted its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}
