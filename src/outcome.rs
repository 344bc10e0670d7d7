//! Success-or-error composition for multi-step request pipelines.
//!
//! Every workflow in the engine (validate → authorize → mutate → version-stamp →
//! respond) is a chain of [`Outcome`] values. Expected failures travel on the
//! error side and short-circuit the rest of the chain; nothing in a pipeline
//! panics or unwinds for request-data problems.
//!
//! ```rust
//! use scim_engine::outcome::{Method, Outcome, status};
//! use scim_engine::ScimError;
//!
//! let parsed: Outcome<u32> = Outcome::success(21);
//! let doubled = parsed
//!     .bind(|n| if n > 0 { Outcome::success(n * 2) } else {
//!         Outcome::failure(ScimError::invalid_syntax("must be positive"))
//!     })
//!     .tap(|n| println!("computed {n}"));
//!
//! let response = doubled.to_transport(Method::Get, status::OK);
//! assert_eq!(response.status, 200);
//! assert_eq!(response.body, Some(serde_json::json!(42)));
//! ```

use crate::error::{ScimError, ScimResult};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;

/// HTTP status codes used by the engine.
pub mod status {
    pub const CONTINUE: u16 = 100;
    pub const OK: u16 = 200;
    pub const CREATED: u16 = 201;
    pub const NO_CONTENT: u16 = 204;
    pub const RESET_CONTENT: u16 = 205;
    pub const NOT_MODIFIED: u16 = 304;
    pub const BAD_REQUEST: u16 = 400;
    pub const NOT_FOUND: u16 = 404;
    pub const METHOD_NOT_ALLOWED: u16 = 405;
    pub const CONFLICT: u16 = 409;
    pub const PRECONDITION_FAILED: u16 = 412;
    pub const INTERNAL_SERVER_ERROR: u16 = 500;
}

/// Request methods the transport boundary distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

/// Result of one pipeline step: a success value or a [`ScimError`].
///
/// Exactly one side is populated. Combinators never invoke downstream steps
/// once the error side is present.
#[derive(Debug)]
#[must_use]
pub enum Outcome<T> {
    /// The step produced a value
    Success(T),
    /// The step failed; later steps are skipped
    Failure(ScimError),
}

impl<T> Outcome<T> {
    pub fn success(value: T) -> Self {
        Outcome::Success(value)
    }

    pub fn failure(error: impl Into<ScimError>) -> Self {
        Outcome::Failure(error.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    /// Borrow the success value, if present.
    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    /// Borrow the error, if present.
    pub fn error(&self) -> Option<&ScimError> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(error) => Some(error),
        }
    }

    /// Chain a step that may itself fail.
    ///
    /// The error side is forwarded unchanged, re-typed to the new success type.
    pub fn bind<U, F>(self, next: F) -> Outcome<U>
    where
        F: FnOnce(T) -> Outcome<U>,
    {
        match self {
            Outcome::Success(value) => next(value),
            Outcome::Failure(error) => Outcome::Failure(error),
        }
    }

    /// Asynchronous [`bind`](Self::bind) for steps that call the repository.
    pub async fn bind_async<U, F, Fut>(self, next: F) -> Outcome<U>
    where
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Outcome<U>>,
    {
        match self {
            Outcome::Success(value) => next(value).await,
            Outcome::Failure(error) => Outcome::Failure(error),
        }
    }

    /// Transform the success value with an infallible function.
    pub fn map<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Failure(error) => Outcome::Failure(error),
        }
    }

    /// Run a side effect on success and hand back the outcome unchanged.
    pub fn tap<F>(self, f: F) -> Self
    where
        F: FnOnce(&T),
    {
        if let Outcome::Success(value) = &self {
            f(value);
        }
        self
    }

    /// Run a side effect on failure and hand back the outcome unchanged.
    pub fn tap_err<F>(self, f: F) -> Self
    where
        F: FnOnce(&ScimError),
    {
        if let Outcome::Failure(error) = &self {
            f(error);
        }
        self
    }

    pub fn into_result(self) -> ScimResult<T> {
        self.into()
    }

    /// Convert into a transport result.
    ///
    /// On success the status is `default_status`; on failure it is the error's
    /// own status, or 400 when the error carries none. Bodies are omitted for
    /// HEAD requests and for 100/204/205/304 regardless of outcome.
    pub fn to_transport(self, method: Method, default_status: u16) -> TransportResponse
    where
        T: Serialize,
    {
        match self {
            Outcome::Success(value) => {
                if !should_include_body(method, default_status) {
                    return TransportResponse::new(default_status, None);
                }
                match serde_json::to_value(value) {
                    Ok(body) => TransportResponse::new(default_status, Some(body)),
                    Err(e) => Outcome::<()>::failure(ScimError::internal(format!(
                        "Failed to serialize response body: {}",
                        e
                    )))
                    .to_transport(method, default_status),
                }
            }
            Outcome::Failure(error) => {
                let response = error.to_response();
                let status = response.status_code();
                let body = if should_include_body(method, status) {
                    serde_json::to_value(&response).ok()
                } else {
                    None
                };
                TransportResponse::new(status, body)
            }
        }
    }
}

impl<T> From<ScimResult<T>> for Outcome<T> {
    fn from(result: ScimResult<T>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(error) => Outcome::Failure(error),
        }
    }
}

impl<T> From<Outcome<T>> for ScimResult<T> {
    fn from(outcome: Outcome<T>) -> Self {
        match outcome {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(error) => Err(error),
        }
    }
}

/// A status code plus optional JSON body and response headers.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Option<Value>,
    /// Weak ETag of the returned resource
    pub etag: Option<String>,
    /// `Location` of a created resource
    pub location: Option<String>,
}

impl TransportResponse {
    pub fn new(status: u16, body: Option<Value>) -> Self {
        Self {
            status,
            body,
            etag: None,
            location: None,
        }
    }

    pub fn with_etag(mut self, etag: Option<String>) -> Self {
        self.etag = etag;
        self
    }

    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Whether a response with this method and status may carry a body.
pub fn should_include_body(method: Method, status_code: u16) -> bool {
    method != Method::Head
        && !matches!(
            status_code,
            status::CONTINUE | status::NO_CONTENT | status::RESET_CONTENT | status::NOT_MODIFIED
        )
}
