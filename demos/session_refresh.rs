//! Demonstrates logging in against a mocked backend, then letting three concurrent requests hit an
//! expired access token so they share a single refresh.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use donorlink::{
	api::LoginRequest,
	auth::CredentialKey,
	client::AuthenticatedClient,
	config::ClientConfig,
	http::ReqwestTransport,
	reqwest::Client,
	session::RecordingSessionHandler,
	store::{CredentialStore, MemoryStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/login");
			then.status(200).json_body(serde_json::json!({
				"accessToken": "demo-expired",
				"refreshToken": "demo-refresh",
				"user": { "name": "Demo Donor", "role": "donor" }
			}));
		})
		.await;
	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200)
				.delay(std::time::Duration::from_millis(100))
				.json_body(serde_json::json!({ "accessToken": "demo-fresh" }));
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(GET).header("authorization", "Bearer demo-expired");
			then.status(401).body("token expired");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).header("authorization", "Bearer demo-fresh");
			then.status(200).json_body(serde_json::json!({ "ok": true }));
		})
		.await;

	let config = ClientConfig::builder(Url::parse(&server.base_url())?).build()?;
	let store = Arc::new(MemoryStore::default());
	let session = Arc::new(RecordingSessionHandler::new());
	let transport = ReqwestTransport::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let client = <AuthenticatedClient<ReqwestTransport>>::with_transport(
		config,
		transport,
		store.clone(),
	)
	.with_session_handler(session.clone());
	let login = client.login(&LoginRequest::new("donor@example.com", "demo-password")).await?;

	println!("Logged in as {}.", login.user["name"]);

	let (donors, requests, campaigns) =
		tokio::join!(client.get("/donors"), client.get("/requests"), client.get("/campaigns"));

	for response in [donors?, requests?, campaigns?] {
		println!("Replayed request answered {}.", response.status);
	}

	let metrics = &client.refresh_metrics;

	println!(
		"Refresh attempts: {}, waits: {}, redirects: {}.",
		metrics.attempts(),
		metrics.waits(),
		session.redirects()
	);

	if let Some(token) = store.get(CredentialKey::AccessToken).await? {
		println!("Stored access token: {}.", token.expose());
	}

	login_mock.assert_async().await;
	refresh_mock.assert_calls_async(1).await;

	Ok(())
}
