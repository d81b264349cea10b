//! Challenge-discovering bearer authentication and continuation-token paging for vault-style
//! cloud service clients.
//!
//! The crate carries the two stateful pieces shared by generated service clients: a pipeline
//! policy that learns the authorization server and scope from a `WWW-Authenticate: Bearer`
//! challenge (caching the discovery per authority), and a lazy pager over continuation-token list
//! operations.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod challenge;
pub mod credential;
pub mod error;
pub mod http;
pub mod obs;
pub mod paging;
pub mod policy;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::{
		collections::VecDeque,
		sync::atomic::{AtomicUsize, Ordering},
	};
	// self
	use crate::{
		auth::AccessToken,
		credential::{
			BlockingTokenCredential, CredentialFuture, TokenCredential, TokenRequestContext,
		},
		http::{
			BlockingHttpPipeline, HeaderName, HttpPipeline, HttpRequest, HttpResponse,
			PipelineFuture, StatusCode,
			header::{AUTHORIZATION, CONTENT_LENGTH, WWW_AUTHENTICATE},
		},
		policy::CallContext,
	};

	/// Snapshot of a request observed by [`ScriptedPipeline`].
	#[derive(Clone, Debug)]
	pub struct RecordedRequest {
		/// Request method.
		pub method: String,
		/// Full request URI.
		pub uri: String,
		/// `Authorization` header value, if any.
		pub authorization: Option<String>,
		/// `Content-Length` header value, if any.
		pub content_length: Option<String>,
		/// Request body bytes as sent.
		pub body: Vec<u8>,
	}

	/// Pipeline fake that replays queued responses and records every request it receives.
	///
	/// Once the queue is drained every further call answers `200 OK` with an empty body.
	#[derive(Clone, Default)]
	pub struct ScriptedPipeline {
		responses: Arc<Mutex<VecDeque<HttpResponse>>>,
		requests: Arc<Mutex<Vec<RecordedRequest>>>,
	}
	impl ScriptedPipeline {
		/// Creates a pipeline that answers with `responses` in order.
		pub fn new(responses: impl IntoIterator<Item = HttpResponse>) -> Self {
			Self {
				responses: Arc::new(Mutex::new(responses.into_iter().collect())),
				requests: Default::default(),
			}
		}

		/// Requests observed so far.
		pub fn requests(&self) -> Vec<RecordedRequest> {
			self.requests.lock().clone()
		}

		/// Number of requests observed so far.
		pub fn send_count(&self) -> usize {
			self.requests.lock().len()
		}

		fn respond(&self, request: &HttpRequest) -> HttpResponse {
			let header = |name: HeaderName| {
				request.headers().get(name).and_then(|v| v.to_str().ok()).map(str::to_owned)
			};

			self.requests.lock().push(RecordedRequest {
				method: request.method().to_string(),
				uri: request.uri().to_string(),
				authorization: header(AUTHORIZATION),
				content_length: header(CONTENT_LENGTH),
				body: request.body().clone(),
			});

			self.responses.lock().pop_front().unwrap_or_else(|| response(StatusCode::OK, None))
		}
	}
	impl HttpPipeline for ScriptedPipeline {
		fn send<'a>(
			&'a self,
			request: &'a HttpRequest,
			_ctx: &'a CallContext,
		) -> PipelineFuture<'a> {
			let response = self.respond(request);

			Box::pin(async move { Ok(response) })
		}
	}
	impl BlockingHttpPipeline for ScriptedPipeline {
		fn send(&self, request: &HttpRequest, _ctx: &CallContext) -> Result<HttpResponse> {
			Ok(self.respond(request))
		}
	}

	/// Credential fake that hands out `token-<n>` values and records each request context.
	#[derive(Clone, Default)]
	pub struct CountingCredential {
		calls: Arc<AtomicUsize>,
		contexts: Arc<Mutex<Vec<TokenRequestContext>>>,
	}
	impl CountingCredential {
		/// Number of token acquisitions so far.
		pub fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}

		/// Request contexts observed so far.
		pub fn contexts(&self) -> Vec<TokenRequestContext> {
			self.contexts.lock().clone()
		}

		fn issue(&self, request: &TokenRequestContext) -> AccessToken {
			let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

			self.contexts.lock().push(request.clone());

			AccessToken::new(format!("token-{n}"), OffsetDateTime::now_utc() + Duration::hours(1))
		}
	}
	impl TokenCredential for CountingCredential {
		fn get_token<'a>(&'a self, request: &'a TokenRequestContext) -> CredentialFuture<'a> {
			let token = self.issue(request);

			Box::pin(async move { Ok(token) })
		}
	}
	impl BlockingTokenCredential for CountingCredential {
		fn get_token(&self, request: &TokenRequestContext) -> Result<AccessToken> {
			Ok(self.issue(request))
		}
	}

	/// Builds a response with `status` and an optional `WWW-Authenticate` header.
	pub fn response(status: StatusCode, challenge: Option<&str>) -> HttpResponse {
		let mut response = HttpResponse::new(Vec::new());

		*response.status_mut() = status;

		if let Some(challenge) = challenge {
			response.headers_mut().insert(
				WWW_AUTHENTICATE,
				challenge.parse().expect("Challenge fixture should be a valid header value."),
			);
		}

		response
	}

	/// Builds a `401 Unauthorized` response carrying the Key Vault style challenge for `resource`.
	pub fn vault_challenge(resource: &str) -> HttpResponse {
		response(
			StatusCode::UNAUTHORIZED,
			Some(&format!(
				"Bearer authorization=\"https://login.microsoftonline.com/tenant-1\", resource=\"{resource}\""
			)),
		)
	}
}

mod _prelude {
	pub use std::{
		any::Any,
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
