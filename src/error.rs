//! Error types for the fetch layer.

use thiserror::Error;

/// Why a GET against the content API failed.
///
/// The hook layer only surfaces "failed or not", but keeps this value around
/// so callers can inspect the detail.
#[derive(Error, Debug)]
pub enum FetchError {
  /// Transport failure (connect, TLS, reading the body)
  #[error("Network error: {0}")]
  Network(#[source] reqwest::Error),

  /// Server answered with a non-success status
  #[error("HTTP {status} from {url}")]
  Http { status: u16, url: String },

  /// Body was not valid JSON, or not the shape the resource expects
  #[error("Failed to parse response: {0}")]
  Parse(#[source] serde_json::Error),

  /// Base URL and path did not form a valid URL
  #[error("Invalid URL {url}: {source}")]
  InvalidUrl {
    url: String,
    #[source]
    source: url::ParseError,
  },

  /// A request was due but no tokio runtime was running to drive it
  #[error("No tokio runtime to run the request on")]
  NoRuntime,
}

impl FetchError {
  /// HTTP status, when the failure was a non-success response.
  pub fn status(&self) -> Option<u16> {
    match self {
      FetchError::Http { status, .. } => Some(*status),
      _ => None,
    }
  }
}
