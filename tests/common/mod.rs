//! Shared fixtures for integration tests.

#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use parking_lot::Mutex;
use time::Duration;
// self
use donorlink::{
	auth::Credentials,
	client::AuthenticatedClient,
	config::ClientConfig,
	error::TransportError,
	http::{ApiResponse, HttpTransport, TransportFuture, TransportRequest},
	session::SessionHandler,
	store::{self, CredentialStore, MemoryStore},
	url::Url,
};
#[cfg(feature = "reqwest")]
use donorlink::{http::ReqwestTransport, reqwest::Client as ReqwestClient};

#[cfg(feature = "reqwest")]
/// Builds a reqwest transport that accepts the self-signed certificates produced by `httpmock`.
pub fn test_reqwest_transport() -> ReqwestTransport {
	let client = ReqwestClient::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestTransport::with_client(client)
}

/// Builds the default client configuration rooted at `base_url`.
pub fn test_config(base_url: &str) -> ClientConfig {
	ClientConfig::builder(Url::parse(base_url).expect("Test base URL should parse."))
		.build()
		.expect("Default client configuration should build for tests.")
}

/// Builds a memory store, optionally seeded with `credentials`.
pub async fn seeded_store(credentials: Option<Credentials>) -> Arc<MemoryStore> {
	let store = Arc::new(MemoryStore::default());

	if let Some(credentials) = credentials {
		store::save_credentials(store.as_ref(), &credentials)
			.await
			.expect("Seeding test credentials into the memory store should succeed.");
	}

	store
}

#[cfg(feature = "reqwest")]
/// Constructs a reqwest-backed client over a seeded memory store.
pub async fn build_reqwest_test_client(
	config: ClientConfig,
	credentials: Option<Credentials>,
	session: Arc<dyn SessionHandler>,
) -> (AuthenticatedClient<ReqwestTransport>, Arc<MemoryStore>) {
	let store_backend = seeded_store(credentials).await;
	let store: Arc<dyn CredentialStore> = store_backend.clone();
	let client = AuthenticatedClient::with_transport(config, test_reqwest_transport(), store)
		.with_session_handler(session);

	(client, store_backend)
}

/// Scripted in-process backend.
///
/// Protected endpoints accept only the current `valid_token`; `/auth/refresh` rotates it to
/// `new-token` (or fails with 400) after `refresh_delay`; `/offline` fails at the transport layer.
#[derive(Debug)]
pub struct FakeBackend {
	pub valid_token: Mutex<String>,
	pub refresh_succeeds: bool,
	pub reject_all: bool,
	pub refresh_delay: Duration,
	pub request_delay: Duration,
	pub calls: Mutex<Vec<TransportRequest>>,
}
impl FakeBackend {
	pub fn new(valid_token: &str) -> Self {
		Self {
			valid_token: Mutex::new(valid_token.into()),
			refresh_succeeds: true,
			reject_all: false,
			refresh_delay: Duration::milliseconds(50),
			request_delay: Duration::milliseconds(5),
			calls: Mutex::new(Vec::new()),
		}
	}

	pub fn failing_refresh(mut self) -> Self {
		self.refresh_succeeds = false;

		self
	}

	pub fn rejecting_everything(mut self) -> Self {
		self.reject_all = true;

		self
	}

	pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
		self.refresh_delay = delay;

		self
	}

	pub fn with_request_delay(mut self, delay: Duration) -> Self {
		self.request_delay = delay;

		self
	}

	pub fn calls_to(&self, path: &str) -> Vec<TransportRequest> {
		self.calls.lock().iter().filter(|call| call.url.path() == path).cloned().collect()
	}

	pub fn refresh_calls(&self) -> usize {
		self.calls_to("/auth/refresh").len()
	}
}
impl HttpTransport for FakeBackend {
	fn execute(&self, request: TransportRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			self.calls.lock().push(request.clone());

			let path = request.url.path().to_owned();

			if path == "/offline" {
				return Err(TransportError::from(std::io::Error::other("connection refused")));
			}
			if path == "/auth/refresh" {
				sleep(self.refresh_delay).await;

				if !self.refresh_succeeds {
					return Ok(ApiResponse::json(
						400,
						&serde_json::json!({ "error": "invalid_grant" }),
					));
				}

				*self.valid_token.lock() = "new-token".into();

				return Ok(ApiResponse::json(
					200,
					&serde_json::json!({ "accessToken": "new-token", "refreshToken": "refresh-2" }),
				));
			}

			sleep(self.request_delay).await;

			if path.starts_with("/auth/") {
				return Ok(ApiResponse::json(401, &serde_json::json!({ "error": "bad login" })));
			}
			if path == "/not-found" {
				return Ok(ApiResponse::json(404, &serde_json::json!({ "error": "missing" })));
			}

			let valid = self.valid_token.lock().clone();

			if self.reject_all || request.bearer_token() != Some(valid.as_str()) {
				return Ok(ApiResponse::json(401, &serde_json::json!({ "error": "expired" })));
			}

			Ok(ApiResponse::json(200, &serde_json::json!({ "path": path })))
		})
	}
}

async fn sleep(delay: Duration) {
	tokio::time::sleep(std::time::Duration::try_from(delay).unwrap_or_default()).await;
}

/// Builds a client over `backend` with a seeded memory store.
pub async fn build_fake_client(
	backend: FakeBackend,
	credentials: Option<Credentials>,
	session: Arc<dyn SessionHandler>,
) -> (AuthenticatedClient<FakeBackend>, Arc<FakeBackend>, Arc<MemoryStore>) {
	let backend = Arc::new(backend);
	let store_backend = seeded_store(credentials).await;
	let store: Arc<dyn CredentialStore> = store_backend.clone();
	let client = AuthenticatedClient::with_transport(
		test_config("https://api.donorlink.test"),
		backend.clone(),
		store,
	)
	.with_session_handler(session);

	(client, backend, store_backend)
}
