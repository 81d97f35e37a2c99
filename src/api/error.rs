use thiserror::Error;

/// Errors from the remote resource client.
#[derive(Debug, Error)]
pub enum ApiError {
  /// No response was received (connection refused, DNS, timeout, ...)
  #[error("network error: {0}")]
  Network(#[source] reqwest::Error),

  /// The server answered with a non-2xx status
  #[error("server returned {status}: {message}")]
  HttpStatus { status: u16, message: String },

  /// A 2xx response whose body did not match the expected shape
  #[error("unexpected response from {path}: {source}")]
  Decode {
    path: String,
    #[source]
    source: serde_json::Error,
  },

  /// A request body that could not be turned into JSON
  #[error("failed to encode request body for {path}: {source}")]
  Encode {
    path: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("invalid API base URL '{url}': {reason}")]
  InvalidUrl { url: String, reason: String },
}

impl ApiError {
  pub fn is_network(&self) -> bool {
    matches!(self, ApiError::Network(_))
  }

  pub fn status(&self) -> Option<u16> {
    match self {
      ApiError::HttpStatus { status, .. } => Some(*status),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_status_only_for_http_errors() {
    let err = ApiError::HttpStatus {
      status: 404,
      message: "not found".to_string(),
    };
    assert_eq!(err.status(), Some(404));
    assert!(!err.is_network());
    assert_eq!(err.to_string(), "server returned 404: not found");

    let err = ApiError::InvalidUrl {
      url: "nope".to_string(),
      reason: "relative URL without a base".to_string(),
    };
    assert_eq!(err.status(), None);
  }
}
