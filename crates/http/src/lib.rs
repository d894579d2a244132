//! HTTP clients of the planbook API.

#[macro_use]
extern crate tracing;

mod body;
mod config;
mod conversations;
mod transport;

use std::error::Error as StdError;
use std::fmt::{self, Display};

use planbook_model::{ErrorKind, ServiceError};
use reqwest::Response;
use serde::Deserialize;
use serde_json::Value;

pub use body::ResponseBody;
pub use config::{ApiConfig, ApiConfigBuilder, StaticToken, TokenProvider};
pub use conversations::RestConversations;
pub use transport::HttpTransport;

/// Error type for the HTTP clients.
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        let kind = match err.status() {
            Some(status) => ErrorKind::Status(status.as_u16()),
            None if err.is_decode() => ErrorKind::InvalidResponse,
            None => ErrorKind::Network,
        };
        Self::new(format!("{err}"), kind)
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ServiceError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// The body of an error response.
#[derive(Deserialize)]
struct ErrorBody {
    detail: Value,
}

/// Turns a non-success response into an error carrying the server's
/// `detail` when there is one.
async fn check_status(resp: Response) -> Result<Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let detail = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(ErrorBody {
            detail: Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) => match status.canonical_reason() {
            Some(reason) => format!("{} {reason}", status.as_u16()),
            None => format!("HTTP {}", status.as_u16()),
        },
    };
    debug!("request failed with {status}: {detail}");
    Err(Error::new(detail, ErrorKind::Status(status.as_u16())))
}
