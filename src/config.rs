//! Client configuration: backend endpoints, path classification, and timeouts.
//!
//! [`ClientConfig`] is immutable once built. Use [`ClientConfig::builder`] to assemble one from a
//! base URL; the builder validates the result so the request pipeline can assume well-formed
//! paths.

/// Builder API for assembling client configurations.
pub mod builder;
/// Path classification rules.
pub mod rule;

pub use builder::*;
pub use rule::*;

// self
use crate::_prelude::*;

/// Immutable configuration consumed by [`AuthenticatedClient`](crate::client::AuthenticatedClient).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Base URL every relative request path is resolved against.
	pub base_url: Url,
	/// Path prefix identifying authentication endpoints; 401s under it are never remediated.
	pub auth_prefix: String,
	/// Path of the token refresh endpoint.
	pub refresh_path: String,
	/// Path of the login endpoint.
	pub login_path: String,
	/// Path of the logout endpoint.
	pub logout_path: String,
	/// Rules selecting requests whose failed renewal tears the session down.
	pub forced_logout_rules: Vec<PathRule>,
	/// Deadline for the refresh call; also bounds how long concurrent requests wait on it.
	#[serde(with = "duration_millis")]
	pub refresh_timeout: Duration,
	/// Optional deadline applied to every other request.
	#[serde(with = "duration_millis::option")]
	pub request_timeout: Option<Duration>,
}
impl ClientConfig {
	/// Creates a new builder rooted at the provided base URL.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Returns `true` if `path` addresses an authentication endpoint.
	pub fn is_auth_path(&self, path: &str) -> bool {
		PathRule::Prefix(self.auth_prefix.clone()).matches(path)
	}

	/// Returns `true` if a failed renewal for `path` must tear the session down.
	pub fn forces_logout(&self, path: &str) -> bool {
		self.forced_logout_rules.iter().any(|rule| rule.matches(path))
	}

	/// Resolves a relative request path against the base URL.
	pub fn resolve(&self, path: &str) -> Result<Url, crate::error::ConfigError> {
		// `Url::join` would drop the base path for rooted inputs, so concatenate instead.
		if Url::parse(path).is_ok() {
			return Err(crate::error::ConfigError::AbsolutePath { path: path.into() });
		}

		let base = self.base_url.as_str().trim_end_matches('/');
		let relative = path.trim_start_matches('/');

		Url::parse(&format!("{base}/{relative}"))
			.map_err(|source| crate::error::ConfigError::InvalidPath { path: path.into(), source })
	}
}

mod duration_millis {
	// crates.io
	use serde::{Deserialize, Deserializer, Serializer};
	use time::Duration;

	pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_i64(value.whole_milliseconds() as i64)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		i64::deserialize(deserializer).map(Duration::milliseconds)
	}

	pub mod option {
		// crates.io
		use serde::{Deserialize, Deserializer, Serializer};
		use time::Duration;

		pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			match value {
				Some(value) => serializer.serialize_some(&(value.whole_milliseconds() as i64)),
				None => serializer.serialize_none(),
			}
		}

		pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
		where
			D: Deserializer<'de>,
		{
			Option::<i64>::deserialize(deserializer).map(|value| value.map(Duration::milliseconds))
		}
	}
}
