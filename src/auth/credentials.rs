//! Credential pair and the storage keys it lives under.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Storage slots used for session credentials.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CredentialKey {
	/// Short-lived bearer token attached to every request.
	#[serde(rename = "token")]
	AccessToken,
	/// Longer-lived token exchanged for a new pair.
	#[serde(rename = "refreshToken")]
	RefreshToken,
}
impl CredentialKey {
	/// Returns the storage key name shared with other clients of the same backend.
	pub const fn as_str(self) -> &'static str {
		match self {
			CredentialKey::AccessToken => "token",
			CredentialKey::RefreshToken => "refreshToken",
		}
	}
}
impl Display for CredentialKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Access/refresh token pair issued by the backend on login or refresh.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Refresh token secret.
	pub refresh_token: TokenSecret,
}
impl Credentials {
	/// Builds a pair from raw token strings.
	pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: TokenSecret::new(refresh_token),
		}
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.finish()
	}
}
