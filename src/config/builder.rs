// self
use crate::{
	_prelude::*,
	config::{ClientConfig, PathRule},
};

/// Errors raised while constructing or validating client configurations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ClientConfigError {
	/// Base URL must use HTTP(S).
	#[error("The base URL must use http or https: {url}.")]
	InvalidScheme {
		/// Base URL that failed validation.
		url: String,
	},
	/// Base URL cannot carry a query string or fragment.
	#[error("The base URL must not contain a query or fragment: {url}.")]
	BaseUrlHasQuery {
		/// Base URL that failed validation.
		url: String,
	},
	/// Endpoint paths must be rooted.
	#[error("The {field} must start with `/`: {value}.")]
	InvalidPath {
		/// Which field failed validation.
		field: &'static str,
		/// Value that failed validation.
		value: String,
	},
	/// Refresh deadline must be positive.
	#[error("The refresh timeout must be positive.")]
	ZeroTimeout,
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Base URL for every request.
	pub base_url: Url,
	/// Authentication endpoint prefix.
	pub auth_prefix: String,
	/// Refresh endpoint override; derived from the prefix when unset.
	pub refresh_path: Option<String>,
	/// Login endpoint override; derived from the prefix when unset.
	pub login_path: Option<String>,
	/// Logout endpoint override; derived from the prefix when unset.
	pub logout_path: Option<String>,
	/// Forced-logout rules.
	pub forced_logout_rules: Vec<PathRule>,
	/// Refresh call deadline.
	pub refresh_timeout: Duration,
	/// Optional per-request deadline.
	pub request_timeout: Option<Duration>,
}
impl ClientConfigBuilder {
	const DEFAULT_AUTH_PREFIX: &'static str = "/auth";
	const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::seconds(10);

	/// Creates a new builder seeded with the default auth layout and forced-logout areas.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			auth_prefix: Self::DEFAULT_AUTH_PREFIX.into(),
			refresh_path: None,
			login_path: None,
			logout_path: None,
			forced_logout_rules: default_forced_logout_rules(),
			refresh_timeout: Self::DEFAULT_REFRESH_TIMEOUT,
			request_timeout: None,
		}
	}

	/// Sets the authentication endpoint prefix.
	pub fn auth_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.auth_prefix = prefix.into();

		self
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = Some(path.into());

		self
	}

	/// Overrides the login endpoint path.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.login_path = Some(path.into());

		self
	}

	/// Overrides the logout endpoint path.
	pub fn logout_path(mut self, path: impl Into<String>) -> Self {
		self.logout_path = Some(path.into());

		self
	}

	/// Adds a single forced-logout rule.
	pub fn forced_logout_rule(mut self, rule: PathRule) -> Self {
		self.forced_logout_rules.push(rule);

		self
	}

	/// Replaces all forced-logout rules.
	pub fn forced_logout_rules<I>(mut self, rules: I) -> Self
	where
		I: IntoIterator<Item = PathRule>,
	{
		self.forced_logout_rules = rules.into_iter().collect();

		self
	}

	/// Overrides the refresh call deadline (defaults to 10 seconds).
	pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
		self.refresh_timeout = timeout;

		self
	}

	/// Sets a deadline applied to every non-refresh request.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = Some(timeout);

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ClientConfigError> {
		let auth_prefix = self.auth_prefix.trim_end_matches('/').to_owned();
		let refresh_path = self.refresh_path.unwrap_or_else(|| format!("{auth_prefix}/refresh"));
		let login_path = self.login_path.unwrap_or_else(|| format!("{auth_prefix}/login"));
		let logout_path = self.logout_path.unwrap_or_else(|| format!("{auth_prefix}/logout"));
		let config = ClientConfig {
			base_url: self.base_url,
			auth_prefix,
			refresh_path,
			login_path,
			logout_path,
			forced_logout_rules: self.forced_logout_rules,
			refresh_timeout: self.refresh_timeout,
			request_timeout: self.request_timeout,
		};

		config.validate()?;

		Ok(config)
	}
}

impl ClientConfig {
	/// Validates invariants for the configuration.
	fn validate(&self) -> Result<(), ClientConfigError> {
		if !matches!(self.base_url.scheme(), "http" | "https") {
			return Err(ClientConfigError::InvalidScheme { url: self.base_url.to_string() });
		}
		if self.base_url.query().is_some() || self.base_url.fragment().is_some() {
			return Err(ClientConfigError::BaseUrlHasQuery { url: self.base_url.to_string() });
		}
		if !self.refresh_timeout.is_positive() {
			return Err(ClientConfigError::ZeroTimeout);
		}

		validate_path("auth prefix", &self.auth_prefix)?;
		validate_path("refresh path", &self.refresh_path)?;
		validate_path("login path", &self.login_path)?;
		validate_path("logout path", &self.logout_path)?;

		Ok(())
	}
}

fn validate_path(field: &'static str, value: &str) -> Result<(), ClientConfigError> {
	if value.starts_with('/') {
		Ok(())
	} else {
		Err(ClientConfigError::InvalidPath { field, value: value.into() })
	}
}

fn default_forced_logout_rules() -> Vec<PathRule> {
	vec![
		PathRule::Prefix("/user".into()),
		PathRule::Prefix("/admin".into()),
		PathRule::Prefix("/hospital".into()),
		PathRule::Contains("/dashboard".into()),
	]
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse configuration fixture URL.")
	}

	#[test]
	fn builder_derives_auth_endpoints_from_prefix() {
		let config = ClientConfig::builder(url("https://api.example.com"))
			.auth_prefix("/api/auth/")
			.build()
			.expect("Configuration with custom prefix should build.");

		assert_eq!(config.auth_prefix, "/api/auth");
		assert_eq!(config.refresh_path, "/api/auth/refresh");
		assert_eq!(config.login_path, "/api/auth/login");
		assert_eq!(config.logout_path, "/api/auth/logout");
		assert_eq!(config.refresh_timeout, Duration::seconds(10));
		assert!(config.request_timeout.is_none());
	}

	#[test]
	fn builder_rejects_invalid_values() {
		let err = ClientConfig::builder(url("ftp://files.example.com"))
			.build()
			.expect_err("Non-HTTP schemes should be rejected.");

		assert!(matches!(err, ClientConfigError::InvalidScheme { .. }));

		let err = ClientConfig::builder(url("https://api.example.com/?lang=fr"))
			.build()
			.expect_err("Base URLs with queries should be rejected.");

		assert!(matches!(err, ClientConfigError::BaseUrlHasQuery { .. }));

		let err = ClientConfig::builder(url("https://api.example.com"))
			.auth_prefix("auth")
			.build()
			.expect_err("Unrooted prefixes should be rejected.");

		assert_eq!(
			err,
			ClientConfigError::InvalidPath { field: "auth prefix", value: "auth".into() }
		);

		let err = ClientConfig::builder(url("https://api.example.com"))
			.refresh_timeout(Duration::ZERO)
			.build()
			.expect_err("Zero refresh timeouts should be rejected.");

		assert_eq!(err, ClientConfigError::ZeroTimeout);
	}

	#[test]
	fn forced_logout_rules_can_be_replaced() {
		let config = ClientConfig::builder(url("https://api.example.com"))
			.forced_logout_rules([PathRule::Contains("/protected".into())])
			.build()
			.expect("Configuration with custom rules should build.");

		assert!(config.forces_logout("/v2/protected/records"));
		assert!(!config.forces_logout("/user/settings"));
	}
}
