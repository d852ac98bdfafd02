//! Client-level error types shared across the request pipeline, stores, and API helpers.

// self
use crate::{_prelude::*, http::Method};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential storage failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The backend answered 401 and no remediation was possible (auth endpoint or no refresh
	/// token available).
	#[error("Request was rejected as unauthorized: {0}.")]
	Unauthorized(ApiFailure),
	/// The backend answered 401 and the session could not be renewed.
	///
	/// `failure` is always the failing request's own response, never the refresh call's.
	#[error("Session expired and could not be renewed: {failure}.")]
	AuthenticationExpired {
		/// Response of the request that was rejected.
		failure: ApiFailure,
		/// Whether stored credentials were cleared by a forced logout.
		session_cleared: bool,
	},
	/// Any other non-success response, passed through untouched.
	#[error("Backend returned an error response: {0}.")]
	Api(ApiFailure),
	/// Response body did not match the expected JSON shape.
	#[error("Response body could not be decoded.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}
impl Error {
	/// Returns the failed response carried by HTTP-level variants.
	pub fn failure(&self) -> Option<&ApiFailure> {
		match self {
			Self::Unauthorized(failure)
			| Self::AuthenticationExpired { failure, .. }
			| Self::Api(failure) => Some(failure),
			_ => None,
		}
	}

	/// Returns the HTTP status behind the error, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Decode { status, .. } => *status,
			_ => self.failure().map(|failure| failure.status),
		}
	}
}

/// Snapshot of a non-success response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiFailure {
	/// Method of the failing request.
	pub method: Method,
	/// Path of the failing request, relative to the configured base URL.
	pub path: String,
	/// HTTP status code returned by the backend.
	pub status: u16,
	/// Response body, lossily decoded as UTF-8.
	pub body: String,
	/// Retry-After hint from upstream, if supplied.
	pub retry_after: Option<Duration>,
}
impl Display for ApiFailure {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{} {} returned {}", self.method, self.path, self.status)
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Client configuration failed validation.
	#[error(transparent)]
	InvalidConfig(#[from] crate::config::ClientConfigError),
	/// Request path could not be joined onto the base URL.
	#[error("Request path `{path}` cannot be resolved against the base URL.")]
	InvalidPath {
		/// Offending request path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request paths must be relative to the configured base URL.
	#[error("Request path `{path}` must be relative to the base URL.")]
	AbsolutePath {
		/// Offending request path.
		path: String,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	BodySerialize(#[source] serde_json::Error),
	/// A dynamic path segment cannot be addressed unambiguously.
	#[error("Path segment `{value}` is empty or a dot segment.")]
	InvalidSegment {
		/// Offending segment value.
		value: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO, timeout).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the backend.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request did not complete before its deadline.
	#[error("Request to the backend timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the backend.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn failure(status: u16) -> ApiFailure {
		ApiFailure {
			method: Method::Get,
			path: "/donors".into(),
			status,
			body: String::new(),
			retry_after: None,
		}
	}

	#[test]
	fn http_variants_expose_failure_and_status() {
		let err = Error::AuthenticationExpired { failure: failure(401), session_cleared: true };

		assert_eq!(err.status(), Some(401));
		assert_eq!(err.failure().map(|f| f.path.as_str()), Some("/donors"));
		assert!(err.to_string().contains("GET /donors returned 401"));

		let err = Error::Api(failure(503));

		assert_eq!(err.status(), Some(503));
	}

	#[test]
	fn transport_errors_have_no_status() {
		let err: Error =
			TransportError::from(std::io::Error::other("connection reset by peer")).into();

		assert!(err.status().is_none());
		assert!(err.failure().is_none());
	}
}
