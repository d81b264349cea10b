//! Client-secret credential with per-tenant token caching and singleflight guards.
//!
//! [`ClientSecretCredential`] runs the OAuth 2.0 `client_credentials` grant against
//! `{authority_host}/{tenant}/oauth2/v2.0/token`. The tenant comes from the challenge (through
//! [`TokenRequestContext::tenant_id`]) and falls back to the credential's own tenant. Tokens are
//! cached per tenant/scope pair and refreshed once they enter the preemptive window; a
//! per-key guard makes concurrent callers share one in-flight token request.

// crates.io
use oauth2::{
	AuthType, ClientId as OAuthClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, RequestTokenError, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientId, ScopeFormatError, ScopeSet, TenantId, TokenSecret},
	credential::{CredentialFuture, TokenCredential, TokenRequestContext},
	error::{ConfigError, CredentialError, TransportError},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot},
	obs::{Component, ObsSpan},
};

type TokenClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Configuration for [`ClientSecretCredential`].
#[derive(Clone, Debug)]
pub struct ClientSecretCredentialOptions {
	/// Authority host that serves `{tenant}/oauth2/v2.0/token`.
	pub authority_host: String,
	/// Cached tokens expiring within this window are refreshed before use.
	pub preemptive_window: Duration,
}
impl ClientSecretCredentialOptions {
	const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
	const DEFAULT_PREEMPTIVE_WINDOW: Duration = Duration::minutes(5);

	/// Overrides the authority host (sovereign clouds, test servers).
	pub fn with_authority_host(mut self, host: impl Into<String>) -> Self {
		self.authority_host = host.into();

		self
	}

	/// Overrides the preemptive refresh window (defaults to 5 minutes).
	pub fn with_preemptive_window(mut self, window: Duration) -> Self {
		self.preemptive_window = if window.is_negative() { Duration::ZERO } else { window };

		self
	}

	/// Token endpoint for `tenant`.
	pub fn token_endpoint(&self, tenant: &TenantId) -> Result<Url> {
		let host = self.authority_host.trim_end_matches('/');

		Url::parse(&format!("{host}/{tenant}/oauth2/v2.0/token")).map_err(|source| {
			ConfigError::InvalidAuthorityHost {
				host: self.authority_host.clone(),
				tenant: tenant.to_string(),
				source,
			}
			.into()
		})
	}
}
impl Default for ClientSecretCredentialOptions {
	fn default() -> Self {
		Self {
			authority_host: Self::DEFAULT_AUTHORITY_HOST.into(),
			preemptive_window: Self::DEFAULT_PREEMPTIVE_WINDOW,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct TokenCacheKey {
	tenant: TenantId,
	scope_fingerprint: String,
}
impl TokenCacheKey {
	fn new(tenant: &TenantId, scopes: &ScopeSet) -> Self {
		Self { tenant: tenant.clone(), scope_fingerprint: scopes.fingerprint() }
	}
}

/// [`TokenCredential`] backed by an application's client id and secret.
#[derive(Clone)]
pub struct ClientSecretCredential {
	tenant_id: TenantId,
	client_id: ClientId,
	client_secret: TokenSecret,
	options: ClientSecretCredentialOptions,
	http_client: ReqwestHttpClient,
	tokens: Arc<RwLock<HashMap<TokenCacheKey, AccessToken>>>,
	guards: Arc<Mutex<HashMap<TokenCacheKey, Arc<AsyncMutex<()>>>>>,
}
impl ClientSecretCredential {
	/// Creates a credential for `client_id` registered in `tenant_id`.
	pub fn new(
		tenant_id: TenantId,
		client_id: ClientId,
		client_secret: impl Into<String>,
	) -> Result<Self> {
		Ok(Self {
			tenant_id,
			client_id,
			client_secret: TokenSecret::new(client_secret),
			options: Default::default(),
			http_client: ReqwestHttpClient::new()?,
			tokens: Default::default(),
			guards: Default::default(),
		})
	}

	/// Replaces the credential options.
	pub fn with_options(mut self, options: ClientSecretCredentialOptions) -> Self {
		self.options = options;

		self
	}

	/// Replaces the HTTP client used for token requests.
	pub fn with_http_client(mut self, http_client: ReqwestHttpClient) -> Self {
		self.http_client = http_client;

		self
	}

	/// Default tenant used when a request does not name one.
	pub fn tenant_id(&self) -> &TenantId {
		&self.tenant_id
	}

	/// Drops every cached token.
	pub fn clear_cache(&self) {
		self.tokens.write().clear();
	}

	fn guard(&self, key: &TokenCacheKey) -> Arc<AsyncMutex<()>> {
		let mut guards = self.guards.lock();

		guards.entry(key.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}

	fn cached(&self, key: &TokenCacheKey, now: OffsetDateTime) -> Option<AccessToken> {
		self.tokens
			.read()
			.get(key)
			.filter(|token| !token.expires_within(self.options.preemptive_window, now))
			.cloned()
	}

	async fn acquire(&self, request: &TokenRequestContext) -> Result<AccessToken> {
		if request.scopes.is_empty() {
			return Err(ConfigError::InvalidScope(ScopeFormatError::NoScopes).into());
		}

		let tenant = request.tenant_id.as_ref().unwrap_or(&self.tenant_id);
		let key = TokenCacheKey::new(tenant, &request.scopes);
		let guard = self.guard(&key);
		let _singleflight = guard.lock().await;

		if let Some(token) = self.cached(&key, OffsetDateTime::now_utc()) {
			return Ok(token);
		}

		let token_url = TokenUrl::from_url(self.options.token_endpoint(tenant)?);
		let client: TokenClient = BasicClient::new(OAuthClientId::new(self.client_id.to_string()))
			.set_client_secret(ClientSecret::new(self.client_secret.expose().to_owned()))
			.set_auth_type(AuthType::RequestBody)
			.set_token_uri(token_url);
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let mut exchange = client.exchange_client_credentials();

		for scope in request.scopes.iter() {
			exchange = exchange.add_scope(Scope::new(scope.to_owned()));
		}

		let response = exchange
			.request_async(&handle)
			.await
			.map_err(|err| map_request_error(meta.take(), err))?;
		let expires_in =
			response.expires_in().ok_or(CredentialError::MissingExpiresIn)?.as_secs();
		let expires_in = i64::try_from(expires_in)
			.ok()
			.filter(|secs| *secs > 0)
			.ok_or(CredentialError::ExpiresInOutOfRange)?;
		let token = AccessToken::new(
			response.access_token().secret().to_owned(),
			OffsetDateTime::now_utc() + Duration::seconds(expires_in),
		);

		self.tokens.write().insert(key, token.clone());

		Ok(token)
	}
}
impl TokenCredential for ClientSecretCredential {
	fn get_token<'a>(&'a self, request: &'a TokenRequestContext) -> CredentialFuture<'a> {
		let span = ObsSpan::new(Component::Credential, "get_token");

		Box::pin(span.instrument(self.acquire(request)))
	}
}
impl Debug for ClientSecretCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientSecretCredential")
			.field("tenant_id", &self.tenant_id)
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret)
			.field("options", &self.options)
			.finish()
	}
}

fn map_request_error(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> Error {
	let status = meta.and_then(|value| value.status);

	match err {
		RequestTokenError::ServerResponse(response) => {
			let code = response.error().as_ref().to_string();
			let reason = response.error_description().cloned().unwrap_or_else(|| code.clone());

			CredentialError::Rejected { code, reason, status }.into()
		},
		RequestTokenError::Request(error) => map_transport_error(status, error),
		RequestTokenError::Parse(source, _body) =>
			CredentialError::TokenResponseParse { source, status }.into(),
		RequestTokenError::Other(message) =>
			CredentialError::TokenEndpoint { message, status }.into(),
	}
}

fn map_transport_error(status: Option<u16>, err: HttpClientError<ReqwestError>) -> Error {
	match err {
		HttpClientError::Reqwest(inner) if inner.is_builder() => ConfigError::from(*inner).into(),
		HttpClientError::Reqwest(inner) => TransportError::from(*inner).into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) =>
			CredentialError::TokenEndpoint { message, status }.into(),
		_ => CredentialError::TokenEndpoint {
			message: "HTTP client error occurred while calling the token endpoint".into(),
			status,
		}
		.into(),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn token_endpoint_joins_tenant_onto_authority_host() {
		let options = ClientSecretCredentialOptions::default();
		let tenant = TenantId::new("72f988bf").expect("Tenant fixture should be valid.");

		assert_eq!(
			options.token_endpoint(&tenant).expect("Default host should join.").as_str(),
			"https://login.microsoftonline.com/72f988bf/oauth2/v2.0/token",
		);

		let sovereign = options.with_authority_host("https://login.example.test/prefix/");

		assert_eq!(
			sovereign.token_endpoint(&tenant).expect("Custom host should join.").as_str(),
			"https://login.example.test/prefix/72f988bf/oauth2/v2.0/token",
		);
	}

	#[test]
	fn negative_preemptive_window_clamps_to_zero() {
		let options =
			ClientSecretCredentialOptions::default().with_preemptive_window(Duration::seconds(-5));

		assert_eq!(options.preemptive_window, Duration::ZERO);
	}

	#[test]
	fn malformed_authority_host_is_a_config_error() {
		let options = ClientSecretCredentialOptions::default().with_authority_host("not a host");
		let tenant = TenantId::new("tenant").expect("Tenant fixture should be valid.");
		let err = options.token_endpoint(&tenant).expect_err("Relative host should be rejected.");

		assert!(matches!(err, Error::Config(ConfigError::InvalidAuthorityHost { .. })));
	}

	#[test]
	fn debug_redacts_secret() {
		let credential = ClientSecretCredential::new(
			TenantId::new("tenant").expect("Tenant fixture should be valid."),
			ClientId::new("client").expect("Client fixture should be valid."),
			"hunter2",
		)
		.expect("Credential should build.");

		assert!(!format!("{credential:?}").contains("hunter2"));
	}
}
