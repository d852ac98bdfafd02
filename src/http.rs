//! Transport primitives for backend calls.
//!
//! The module exposes [`ApiRequest`] (what callers describe, relative to the configured base URL),
//! [`TransportRequest`] (what the client hands to a transport once the URL is resolved and
//! credentials are attached), and the [`HttpTransport`] trait that is the client's only
//! dependency on an HTTP stack. [`ReqwestTransport`] is the default implementation.

// crates.io
#[cfg(feature = "reqwest")] use reqwest::header::HeaderMap;
use time::format_description::well_known::Rfc2822;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
};

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing fully resolved backend requests.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by every
/// request the client issues. Non-success statuses are **not** transport errors: return them as
/// an [`ApiResponse`] so the client can classify them (401 handling lives in the client).
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes `request`, honouring [`TransportRequest::timeout`] when set.
	fn execute(&self, request: TransportRequest) -> TransportFuture<'_>;
}

/// HTTP methods used by the backend API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the canonical method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Request descriptor relative to the configured base URL.
///
/// Cloned once when a request has to be replayed after a token refresh.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the base URL (for example `/donors`).
	pub path: String,
	/// Query string pairs appended to the resolved URL.
	pub query: Vec<(String, String)>,
	/// Additional headers; `Authorization` is managed by the client and overwritten.
	pub headers: BTreeMap<String, String>,
	/// Optional JSON body.
	pub body: Option<serde_json::Value>,
}
impl ApiRequest {
	/// Creates a request without body, query, or extra headers.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			query: Vec::new(),
			headers: BTreeMap::new(),
			body: None,
		}
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// Appends a query pair.
	pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Sets an extra header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into().to_ascii_lowercase(), value.into());

		self
	}

	/// Serializes `body` as the JSON payload.
	pub fn with_json<T>(mut self, body: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_value(body).map_err(ConfigError::BodySerialize)?);

		Ok(self)
	}
}

/// Fully resolved request handed to an [`HttpTransport`].
#[derive(Clone, Debug, PartialEq)]
pub struct TransportRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL including query string.
	pub url: Url,
	/// Lower-cased header names and values, `authorization` included when a token is attached.
	pub headers: BTreeMap<String, String>,
	/// Serialized body bytes.
	pub body: Option<Vec<u8>>,
	/// Deadline for the whole exchange.
	pub timeout: Option<Duration>,
}
impl TransportRequest {
	/// Returns the bearer token carried by the request, if any.
	pub fn bearer_token(&self) -> Option<&str> {
		self.headers.get("authorization").and_then(|value| value.strip_prefix("Bearer "))
	}
}

/// Raw backend response; non-success statuses are reported through this type as well.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Lower-cased header names and values.
	pub headers: BTreeMap<String, String>,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Builds a response from a status and body.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: BTreeMap::new(), body: body.into() }
	}

	/// Builds a JSON response, setting the content type.
	pub fn json(status: u16, value: &serde_json::Value) -> Self {
		let mut response = Self::new(status, value.to_string());

		response.headers.insert("content-type".into(), "application/json".into());

		response
	}

	/// Returns `true` for statuses below 400.
	pub fn is_success(&self) -> bool {
		self.status < 400
	}

	/// Returns a header value by case-insensitive name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}

	/// Body as lossily decoded UTF-8.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Decodes the body as JSON, reporting the failing field path on mismatch.
	pub fn json_body<T>(&self) -> Result<T>
	where
		T: for<'de> Deserialize<'de>,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| Error::Decode { source, status: Some(self.status) })
	}

	/// Parses the `Retry-After` header, if present.
	pub fn retry_after(&self) -> Option<Duration> {
		parse_retry_after(self.header("retry-after")?)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// `User-Agent` sent by transports built with [`ReqwestTransport::new`].
	pub const DEFAULT_USER_AGENT: &'static str = concat!("donorlink/", env!("CARGO_PKG_VERSION"));

	/// Builds a transport identifying itself as [`Self::DEFAULT_USER_AGENT`].
	pub fn new() -> Result<Self, ConfigError> {
		Self::with_user_agent(Self::DEFAULT_USER_AGENT)
	}

	/// Builds a transport sending `user_agent` on every request.
	pub fn with_user_agent(user_agent: &str) -> Result<Self, ConfigError> {
		Ok(Self(ReqwestClient::builder().user_agent(user_agent).build()?))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds the reqwest request for a resolved descriptor.
	pub(crate) fn build(&self, request: TransportRequest) -> reqwest::RequestBuilder {
		let method = match request.method {
			Method::Get => reqwest::Method::GET,
			Method::Post => reqwest::Method::POST,
			Method::Put => reqwest::Method::PUT,
			Method::Patch => reqwest::Method::PATCH,
			Method::Delete => reqwest::Method::DELETE,
		};
		let mut builder = self.0.request(method, request.url);

		for (name, value) in &request.headers {
			builder = builder.header(name.as_str(), value.as_str());
		}
		if let Some(body) = request.body {
			builder = builder.body(body);
		}
		if let Some(timeout) = request.timeout.and_then(|t| std::time::Duration::try_from(t).ok()) {
			builder = builder.timeout(timeout);
		}

		builder
	}
}
#[cfg(feature = "reqwest")]
impl Debug for ReqwestTransport {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ReqwestTransport(..)")
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: TransportRequest) -> TransportFuture<'_> {
		let builder = self.build(request);

		Box::pin(async move {
			let response = builder.send().await?;
			let status = response.status().as_u16();
			let headers = collect_headers(response.headers());
			let body = response.bytes().await?.to_vec();

			Ok(ApiResponse { status, headers, body })
		})
	}
}

#[cfg(feature = "reqwest")]
pub(crate) fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
	headers
		.iter()
		.filter_map(|(name, value)| {
			value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
		})
		.collect()
}

/// Percent-encodes `value` so it addresses exactly one path segment.
///
/// Empty and dot segments are rejected because URL normalization would collapse them.
pub fn encode_path_segment(value: &str) -> Result<String, ConfigError> {
	if matches!(value, "" | "." | "..") {
		return Err(ConfigError::InvalidSegment { value: value.into() });
	}

	// Spaces are the only bytes the form serializer renders as `+`.
	let encoded: String = url::form_urlencoded::byte_serialize(value.as_bytes()).collect();

	Ok(encoded.replace('+', "%20"))
}

/// Parses a `Retry-After` value expressed as delta seconds or an RFC 2822 date.
pub fn parse_retry_after(raw: &str) -> Option<Duration> {
	let raw = raw.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn retry_after_accepts_seconds_and_dates() {
		assert_eq!(parse_retry_after(" 120 "), Some(Duration::seconds(120)));
		assert_eq!(parse_retry_after("Mon, 01 Jan 2001 00:00:00 +0000"), None);
		assert_eq!(parse_retry_after("soon"), None);

		let future = (OffsetDateTime::now_utc() + Duration::hours(1))
			.format(&Rfc2822)
			.expect("Future instant should format as RFC 2822.");
		let delta = parse_retry_after(&future).expect("Future dates should yield a delay.");

		assert!(delta.is_positive() && delta <= Duration::hours(1));
	}

	#[test]
	fn path_segments_escape_url_delimiters() {
		assert_eq!(
			encode_path_segment("a/b?c#d e+f%").expect("Delimiters should be escaped."),
			"a%2Fb%3Fc%23d%20e%2Bf%25"
		);
		assert_eq!(encode_path_segment("req-42_x.y").expect("Plain ids pass through."), "req-42_x.y");

		for rejected in ["", ".", ".."] {
			assert!(matches!(
				encode_path_segment(rejected),
				Err(ConfigError::InvalidSegment { .. })
			));
		}
	}

	#[test]
	fn request_helpers_normalize_headers() {
		let request = ApiRequest::get("/donors")
			.with_query("bloodType", "O-")
			.with_header("X-Request-Id", "abc");

		assert_eq!(request.headers.get("x-request-id").map(String::as_str), Some("abc"));
		assert_eq!(request.query, vec![("bloodType".to_owned(), "O-".to_owned())]);
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn reqwest_transport_rejects_invalid_user_agent() {
		let err = ReqwestTransport::with_user_agent("donor\nlink")
			.expect_err("Header values with line breaks should be rejected.");

		assert!(matches!(err, ConfigError::HttpClientBuild { .. }));
		assert!(ReqwestTransport::new().is_ok());
	}

	#[test]
	fn response_json_reports_field_path() {
		#[derive(Debug, Deserialize)]
		#[allow(dead_code)]
		struct Donor {
			name: String,
			age: u8,
		}

		let response = ApiResponse::json(200, &serde_json::json!({ "name": "Ada", "age": "x" }));
		let err = response.json_body::<Donor>().expect_err("Mismatched field should fail.");

		match err {
			Error::Decode { source, status } => {
				assert_eq!(status, Some(200));
				assert_eq!(source.path().to_string(), "age");
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}
}
