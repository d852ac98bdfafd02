//! Authenticated request pipeline with single-flight token refresh.
//!
//! [`AuthenticatedClient::send`] attaches the stored access token to every request. When the
//! backend answers 401 the client decides, in order:
//!
//! 1. auth endpoints and sessions without a refresh token fail immediately ([`Error::Unauthorized`]);
//! 2. if another request is already refreshing, wait for that refresh to settle;
//! 3. if the stored access token changed since the request was sent, reuse it;
//! 4. otherwise lead a refresh through the shared [`RefreshGate`](flight), tearing the session down
//!    on failure when the request path is classified as forced-logout.
//!
//! Every request is then replayed at most once. A second 401, or a failed refresh, surfaces as
//! [`Error::AuthenticationExpired`] carrying the request's own response.

mod flight;
mod metrics;

pub use flight::RefreshOutcome;
pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	api::auth::{RefreshRequest, RefreshResponse},
	auth::{CredentialKey, Credentials, TokenSecret},
	config::ClientConfig,
	error::{ApiFailure, ConfigError},
	http::{ApiRequest, ApiResponse, HttpTransport, Method, TransportRequest},
	obs::{self, SessionOp, SessionOutcome, SessionSpan},
	session::{NoopSessionHandler, SessionHandler},
	store::{self, CredentialStore},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;
use flight::{RefreshGate, RefreshLease, Ticket};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = AuthenticatedClient<ReqwestTransport>;

const UNAUTHORIZED: u16 = 401;

/// Issues backend requests with bearer credentials and transparent, single-flight renewal.
///
/// Cloning is cheap and clones share the credential store, transport, metrics, and refresh gate,
/// so concurrent requests from any clone coordinate on the same refresh.
pub struct AuthenticatedClient<T>
where
	T: HttpTransport,
{
	/// Validated endpoint layout and path classification.
	pub config: Arc<ClientConfig>,
	/// Transport used for every outbound request.
	pub transport: Arc<T>,
	/// Credential store holding the access/refresh pair.
	pub store: Arc<dyn CredentialStore>,
	/// Navigation hooks used on forced logout.
	pub session: Arc<dyn SessionHandler>,
	/// Shared counters for renewal outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	gate: Arc<RefreshGate>,
}
impl<T> AuthenticatedClient<T>
where
	T: HttpTransport,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		transport: impl Into<Arc<T>>,
		store: Arc<dyn CredentialStore>,
	) -> Self {
		Self {
			config: Arc::new(config),
			transport: transport.into(),
			store,
			session: Arc::new(NoopSessionHandler),
			refresh_metrics: Default::default(),
			gate: Default::default(),
		}
	}

	/// Sets the handler consulted when a failed renewal forces a logout.
	pub fn with_session_handler(mut self, session: Arc<dyn SessionHandler>) -> Self {
		self.session = session;

		self
	}

	/// Returns `true` while a refresh is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.gate.is_refreshing()
	}

	/// Sends `request`, renewing the session at most once if the backend rejects the token.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		let sent = self.access_token().await?;
		let response = self.dispatch(&request, sent.as_ref(), self.config.request_timeout).await?;

		if response.status != UNAUTHORIZED {
			return self.classify(&request, response);
		}

		self.recover(&request, sent, self.failure(&request, &response)).await?;
		self.replay(&request).await
	}

	/// Sends `request` and decodes the JSON response body.
	pub async fn send_json<R>(&self, request: ApiRequest) -> Result<R>
	where
		R: for<'de> Deserialize<'de>,
	{
		self.send(request).await?.json_body()
	}

	/// Issues a `GET` for `path`.
	pub async fn get(&self, path: impl Into<String>) -> Result<ApiResponse> {
		self.send(ApiRequest::get(path)).await
	}

	/// Issues a `POST` for `path` with a JSON body.
	pub async fn post<B>(&self, path: impl Into<String>, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(ApiRequest::post(path).with_json(body)?).await
	}

	/// Issues a `PUT` for `path` with a JSON body.
	pub async fn put<B>(&self, path: impl Into<String>, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(ApiRequest::new(Method::Put, path).with_json(body)?).await
	}

	/// Issues a `PATCH` for `path` with a JSON body.
	pub async fn patch<B>(&self, path: impl Into<String>, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(ApiRequest::new(Method::Patch, path).with_json(body)?).await
	}

	/// Issues a `DELETE` for `path`.
	pub async fn delete(&self, path: impl Into<String>) -> Result<ApiResponse> {
		self.send(ApiRequest::new(Method::Delete, path)).await
	}

	pub(crate) async fn access_token(&self) -> Result<Option<TokenSecret>> {
		Ok(self.store.get(CredentialKey::AccessToken).await?)
	}

	/// Resolves `request` into a transport request carrying `token`.
	pub(crate) fn prepare(
		&self,
		request: &ApiRequest,
		token: Option<&TokenSecret>,
		timeout: Option<Duration>,
	) -> Result<TransportRequest> {
		let mut url = self.config.resolve(&request.path)?;

		if !request.query.is_empty() {
			url.query_pairs_mut().extend_pairs(request.query.iter());
		}

		let mut headers = request.headers.clone();

		headers.entry("accept".into()).or_insert_with(|| "application/json".into());
		headers.remove("authorization");

		if let Some(token) = token {
			headers.insert("authorization".into(), token.bearer());
		}

		let body = match request.body.as_ref() {
			Some(value) => {
				headers.insert("content-type".into(), "application/json".into());

				Some(serde_json::to_vec(value).map_err(ConfigError::BodySerialize)?)
			},
			None => None,
		};

		Ok(TransportRequest { method: request.method, url, headers, body, timeout })
	}

	/// Decides whether a 401 for `request` may be replayed, renewing credentials if needed.
	///
	/// Returns `Ok(())` when the caller should replay the request once with the stored token.
	pub(crate) async fn recover(
		&self,
		request: &ApiRequest,
		sent: Option<TokenSecret>,
		failure: ApiFailure,
	) -> Result<()> {
		if self.config.is_auth_path(&request.path) {
			return Err(Error::Unauthorized(failure));
		}
		if self.store.get(CredentialKey::RefreshToken).await?.is_none() {
			return Err(Error::Unauthorized(failure));
		}

		match self.gate.join() {
			Ticket::Wait(waiter) => {
				self.refresh_metrics.record_wait();
				// Replay regardless of the outcome; a failed refresh surfaces on the replay.
				waiter.settled().await;

				Ok(())
			},
			Ticket::Lead(lease) => {
				let span = SessionSpan::new(SessionOp::Refresh, "recover");

				span.instrument(self.lead_refresh(lease, request, sent, failure)).await
			},
		}
	}

	/// Replays `request` once with whatever access token is stored now.
	pub(crate) async fn replay(&self, request: &ApiRequest) -> Result<ApiResponse> {
		obs::record_session_outcome(SessionOp::Retry, SessionOutcome::Attempt);

		let token = self.access_token().await?;
		let response = self.dispatch(request, token.as_ref(), self.config.request_timeout).await?;

		if response.status == UNAUTHORIZED {
			obs::record_session_outcome(SessionOp::Retry, SessionOutcome::Failure);

			return Err(Error::AuthenticationExpired {
				failure: self.failure(request, &response),
				session_cleared: false,
			});
		}

		obs::record_session_outcome(SessionOp::Retry, SessionOutcome::Success);

		self.classify(request, response)
	}

	pub(crate) fn failure(&self, request: &ApiRequest, response: &ApiResponse) -> ApiFailure {
		ApiFailure {
			method: request.method,
			path: request.path.clone(),
			status: response.status,
			body: response.text(),
			retry_after: response.retry_after(),
		}
	}

	async fn lead_refresh(
		&self,
		lease: RefreshLease<'_>,
		request: &ApiRequest,
		sent: Option<TokenSecret>,
		failure: ApiFailure,
	) -> Result<()> {
		let current = self.access_token().await?;

		if current.is_some() && current != sent {
			lease.settle(RefreshOutcome::Rotated);

			return Ok(());
		}

		let Some(refresh_token) = self.store.get(CredentialKey::RefreshToken).await? else {
			lease.settle(RefreshOutcome::Failed);

			return Err(Error::Unauthorized(failure));
		};

		self.refresh_metrics.record_attempt();
		obs::record_session_outcome(SessionOp::Refresh, SessionOutcome::Attempt);

		match self.request_refresh(&refresh_token).await {
			Ok(credentials) => {
				store::save_credentials(self.store.as_ref(), &credentials).await.inspect_err(
					|_| {
						self.refresh_metrics.record_failure();
					},
				)?;
				self.refresh_metrics.record_success();
				obs::record_session_outcome(SessionOp::Refresh, SessionOutcome::Success);
				lease.settle(RefreshOutcome::Rotated);

				Ok(())
			},
			Err(_) => {
				self.refresh_metrics.record_failure();
				obs::record_session_outcome(SessionOp::Refresh, SessionOutcome::Failure);

				let session_cleared = if self.config.forces_logout(&request.path) {
					self.force_logout().await
				} else {
					false
				};

				lease.settle(RefreshOutcome::Failed);

				Err(Error::AuthenticationExpired { failure, session_cleared })
			},
		}
	}

	/// Exchanges `refresh_token` for a new credential pair.
	async fn request_refresh(&self, refresh_token: &TokenSecret) -> Result<Credentials> {
		let request = ApiRequest::post(self.config.refresh_path.as_str())
			.with_json(&RefreshRequest { refresh_token: refresh_token.clone() })?;
		let response = self.dispatch(&request, None, Some(self.config.refresh_timeout)).await?;
		let response = self.classify(&request, response)?;
		let body: RefreshResponse = response.json_body()?;

		Ok(Credentials {
			access_token: body.access_token,
			refresh_token: body.refresh_token.unwrap_or_else(|| refresh_token.clone()),
		})
	}

	/// Clears stored credentials and navigates to the login view unless already there.
	///
	/// Returns `true` when the credentials were cleared.
	async fn force_logout(&self) -> bool {
		obs::record_session_outcome(SessionOp::ForcedLogout, SessionOutcome::Attempt);
		self.refresh_metrics.record_forced_logout();

		let cleared = store::clear_credentials(self.store.as_ref()).await.is_ok();

		if !self.session.is_at_login() {
			self.session.redirect_to_login();
		}

		obs::record_session_outcome(
			SessionOp::ForcedLogout,
			if cleared { SessionOutcome::Success } else { SessionOutcome::Failure },
		);

		cleared
	}

	async fn dispatch(
		&self,
		request: &ApiRequest,
		token: Option<&TokenSecret>,
		timeout: Option<Duration>,
	) -> Result<ApiResponse> {
		let prepared = self.prepare(request, token, timeout)?;

		Ok(self.transport.execute(prepared).await?)
	}

	fn classify(&self, request: &ApiRequest, response: ApiResponse) -> Result<ApiResponse> {
		if response.is_success() {
			Ok(response)
		} else {
			Err(Error::Api(self.failure(request, &response)))
		}
	}
}
#[cfg(feature = "reqwest")]
impl AuthenticatedClient<ReqwestTransport> {
	/// Creates a new client backed by its own reqwest transport.
	pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
		Ok(Self::with_transport(config, ReqwestTransport::new()?, store))
	}
}
impl<T> Clone for AuthenticatedClient<T>
where
	T: HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			transport: self.transport.clone(),
			store: self.store.clone(),
			session: self.session.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			gate: self.gate.clone(),
		}
	}
}
impl<T> Debug for AuthenticatedClient<T>
where
	T: HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticatedClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("refreshing", &self.is_refreshing())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{http::TransportFuture, store::MemoryStore};

	struct EchoTransport;
	impl HttpTransport for EchoTransport {
		fn execute(&self, request: TransportRequest) -> TransportFuture<'_> {
			Box::pin(async move {
				let echoed = serde_json::json!({
					"url": request.url.as_str(),
					"authorization": request.bearer_token(),
					"contentType": request.headers.get("content-type"),
				});

				Ok(ApiResponse::json(200, &echoed))
			})
		}
	}

	fn client() -> (AuthenticatedClient<EchoTransport>, Arc<MemoryStore>) {
		let config = ClientConfig::builder(
			Url::parse("https://api.example.com/v1").expect("Base URL fixture should parse."),
		)
		.build()
		.expect("Default configuration should build.");
		let store = Arc::new(MemoryStore::default());
		let client = AuthenticatedClient::with_transport(config, EchoTransport, store.clone());

		(client, store)
	}

	#[tokio::test]
	async fn send_attaches_bearer_when_token_is_stored() {
		let (client, store) = client();
		let anonymous: serde_json::Value = client
			.send_json(ApiRequest::get("/donors").with_query("bloodType", "AB+"))
			.await
			.expect("Anonymous request should succeed.");

		assert_eq!(anonymous["authorization"], serde_json::Value::Null);
		assert_eq!(anonymous["url"], "https://api.example.com/v1/donors?bloodType=AB%2B");

		store::save_credentials(store.as_ref(), &Credentials::new("access-1", "refresh-1"))
			.await
			.expect("Seeding credentials should succeed.");

		let authed: serde_json::Value = client
			.post("/emergency", &serde_json::json!({ "units": 3 }))
			.await
			.expect("Authenticated request should succeed.")
			.json_body()
			.expect("Echo body should decode.");

		assert_eq!(authed["authorization"], "access-1");
		assert_eq!(authed["contentType"], "application/json");
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn reqwest_client_builds_with_default_transport() {
		let (echo, _) = client();
		let client = ReqwestApiClient::new((*echo.config).clone(), Arc::new(MemoryStore::default()))
			.expect("Default reqwest transport should build.");

		assert!(!client.is_refreshing());
	}

	#[test]
	fn prepare_overrides_caller_authorization_header() {
		let (client, _) = client();
		let request = ApiRequest::get("/hospitals").with_header("Authorization", "Bearer forged");
		let prepared = client
			.prepare(&request, Some(&TokenSecret::new("real")), None)
			.expect("Request should resolve.");

		assert_eq!(prepared.bearer_token(), Some("real"));

		let prepared = client.prepare(&request, None, None).expect("Request should resolve.");

		assert!(prepared.bearer_token().is_none());
	}
}
