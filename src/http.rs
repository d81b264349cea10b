//! Pipeline stage contracts and the reqwest-backed transport.
//!
//! [`HttpPipeline`] and [`BlockingHttpPipeline`] model "the rest of the pipeline" handed to the
//! challenge policy: they receive the (possibly rewritten) request together with the per-call
//! [`CallContext`] and return the buffered response. Requests and responses use the `http` crate
//! types re-exported by `oauth2`, so the same values flow through token exchanges and service
//! calls alike.
//!
//! [`ReqwestHttpClient`] implements the async contract and doubles as the transport for OAuth
//! token requests issued by [`ClientSecretCredential`](crate::credential::ClientSecretCredential).
//! Token request handles call [`ResponseMetadataSlot::take`] before dispatching and
//! [`ResponseMetadataSlot::store`] once a status is known, so credential errors can report the
//! status the token endpoint answered with.

pub use oauth2::{
	HttpRequest, HttpResponse,
	http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Response, StatusCode, Uri, header},
};

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
#[cfg(feature = "reqwest")] use oauth2::{AsyncHttpClient, HttpClientError};
#[cfg(feature = "reqwest")] use reqwest::redirect::Policy;
// self
use crate::{_prelude::*, policy::CallContext};
#[cfg(feature = "reqwest")] use crate::error::{ConfigError, TransportError};

/// Boxed future returned by [`HttpPipeline::send`].
pub type PipelineFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpResponse>> + 'a + Send>>;

/// Asynchronous "send the rest of the pipeline" continuation.
///
/// Implementations must not retain `request` or `ctx` past the returned future. Transport failures
/// surface as [`TransportError`](crate::error::TransportError) so the policy can propagate them
/// unchanged.
pub trait HttpPipeline
where
	Self: Send + Sync,
{
	/// Sends `request` and resolves to the buffered response.
	fn send<'a>(&'a self, request: &'a HttpRequest, ctx: &'a CallContext) -> PipelineFuture<'a>;
}
impl<P> HttpPipeline for Arc<P>
where
	P: ?Sized + HttpPipeline,
{
	fn send<'a>(&'a self, request: &'a HttpRequest, ctx: &'a CallContext) -> PipelineFuture<'a> {
		P::send(self, request, ctx)
	}
}

/// Blocking counterpart of [`HttpPipeline`].
pub trait BlockingHttpPipeline
where
	Self: Send + Sync,
{
	/// Sends `request` and returns the buffered response.
	fn send(&self, request: &HttpRequest, ctx: &CallContext) -> Result<HttpResponse>;
}
impl<P> BlockingHttpPipeline for Arc<P>
where
	P: ?Sized + BlockingHttpPipeline,
{
	fn send(&self, request: &HttpRequest, ctx: &CallContext) -> Result<HttpResponse> {
		P::send(self, request, ctx)
	}
}

/// Captures metadata from the most recent token endpoint response.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the token endpoint, if available.
	pub status: Option<u16>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Challenge negotiation and token requests must see the service's answer directly, so clients
/// built through [`ReqwestHttpClient::new`] do not follow redirects. Configure any custom
/// [`ReqwestClient`] passed to [`ReqwestHttpClient::with_client`] the same way.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds a client with redirect following disabled.
	pub fn new() -> Result<Self> {
		let client =
			ReqwestClient::builder().redirect(Policy::none()).build().map_err(ConfigError::from)?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a token request handle that records outcomes in `slot`.
	pub fn with_metadata(&self, slot: ResponseMetadataSlot) -> TokenRequestHandle {
		TokenRequestHandle { client: self.0.clone(), slot }
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpPipeline for ReqwestHttpClient {
	fn send<'a>(&'a self, request: &'a HttpRequest, _ctx: &'a CallContext) -> PipelineFuture<'a> {
		Box::pin(async move {
			let outgoing = self
				.0
				.request(request.method().clone(), request.uri().to_string())
				.headers(request.headers().clone())
				.body(request.body().clone())
				.build()
				.map_err(ConfigError::from)?;
			let response = self.0.execute(outgoing).await.map_err(TransportError::from)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await.map_err(TransportError::from)?;
			let mut buffered = HttpResponse::new(body.to_vec());

			*buffered.status_mut() = status;
			*buffered.headers_mut() = headers;

			Ok(buffered)
		})
	}
}

/// [`AsyncHttpClient`] handle used by `oauth2` token exchanges.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct TokenRequestHandle {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for TokenRequestHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.slot.take();

			let response = self
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			self.slot.store(ResponseMetadata { status: Some(status.as_u16()) });

			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}
