//! Login, logout, and token refresh payloads.

// self
use crate::{
	_prelude::*,
	auth::{CredentialKey, Credentials, TokenSecret},
	client::AuthenticatedClient,
	http::{ApiRequest, HttpTransport},
	obs::{self, SessionOp, SessionOutcome},
	store,
};

/// Body of `POST <auth-prefix>/login`.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
	/// Account e-mail address.
	pub email: String,
	/// Account password; never logged.
	pub password: String,
}
impl LoginRequest {
	/// Builds a login payload.
	pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
		Self { email: email.into(), password: password.into() }
	}
}
impl Debug for LoginRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginRequest")
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Response of `POST <auth-prefix>/login`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
	/// Newly issued access token.
	pub access_token: TokenSecret,
	/// Newly issued refresh token.
	pub refresh_token: TokenSecret,
	/// Account profile (donor, hospital, or admin); shape is owned by the backend.
	#[serde(default)]
	pub user: serde_json::Value,
}
impl LoginResponse {
	/// Returns the issued credential pair.
	pub fn credentials(&self) -> Credentials {
		Credentials {
			access_token: self.access_token.clone(),
			refresh_token: self.refresh_token.clone(),
		}
	}
}

/// Body of `POST <auth-prefix>/refresh` and `POST <auth-prefix>/logout`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
	/// Refresh token being exchanged or revoked.
	pub refresh_token: TokenSecret,
}

/// Response of `POST <auth-prefix>/refresh`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
	/// Rotated access token.
	pub access_token: TokenSecret,
	/// Rotated refresh token; the previous one stays valid when omitted.
	#[serde(default)]
	pub refresh_token: Option<TokenSecret>,
}

impl<T> AuthenticatedClient<T>
where
	T: HttpTransport,
{
	/// Authenticates with the backend and stores the issued credential pair.
	pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
		obs::record_session_outcome(SessionOp::Login, SessionOutcome::Attempt);

		let result = async {
			let response: LoginResponse = self
				.send_json(ApiRequest::post(self.config.login_path.as_str()).with_json(request)?)
				.await?;

			store::save_credentials(self.store.as_ref(), &response.credentials()).await?;

			Ok(response)
		}
		.await;

		match &result {
			Ok(_) => obs::record_session_outcome(SessionOp::Login, SessionOutcome::Success),
			Err(_) => obs::record_session_outcome(SessionOp::Login, SessionOutcome::Failure),
		}

		result
	}

	/// Revokes the session server-side and always clears the stored credentials.
	///
	/// The backend call is best-effort: its error, if any, is returned after local cleanup.
	pub async fn logout(&self) -> Result<()> {
		let refresh_token = self.store.get(CredentialKey::RefreshToken).await?;
		let remote = match refresh_token {
			Some(refresh_token) => self
				.post(self.config.logout_path.as_str(), &RefreshRequest { refresh_token })
				.await
				.map(|_| ()),
			None => Ok(()),
		};

		store::clear_credentials(self.store.as_ref()).await?;

		remote
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn refresh_payloads_use_camel_case() {
		let body = serde_json::to_value(RefreshRequest { refresh_token: "r-1".into() })
			.expect("Refresh request should serialize.");

		assert_eq!(body, serde_json::json!({ "refreshToken": "r-1" }));

		let response: RefreshResponse =
			serde_json::from_str(r#"{"accessToken":"a-2"}"#).expect("Partial response should parse.");

		assert_eq!(response.access_token.expose(), "a-2");
		assert!(response.refresh_token.is_none());
	}

	#[test]
	fn login_request_debug_hides_password() {
		let rendered = format!("{:?}", LoginRequest::new("donor@example.com", "hunter2"));

		assert!(rendered.contains("donor@example.com"));
		assert!(!rendered.contains("hunter2"));
	}
}
