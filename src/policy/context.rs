//! Per-call context threaded through the pipeline alongside the request.

// std
use std::mem;
// self
use crate::{
	_prelude::*,
	http::{HeaderValue, HttpRequest, header::CONTENT_LENGTH},
};

/// Well-known key under which the policy stashes the original request body.
pub const STASHED_BODY_KEY: &str = "vault_challenge_auth.stashed_body";

/// Original body and `Content-Length` removed from a request before an unauthenticated probe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StashedRequestBody {
	/// Original body bytes.
	pub body: Vec<u8>,
	/// Original `Content-Length` header value, if the request carried one.
	pub content_length: Option<HeaderValue>,
}

/// Bag of values scoped to one logical call.
///
/// A fresh context is created per call. Stages exchange one-shot data through well-known keys
/// such as [`STASHED_BODY_KEY`].
#[derive(Default)]
pub struct CallContext {
	values: HashMap<&'static str, Box<dyn Any + Send + Sync>>,
}
impl CallContext {
	/// Creates an empty context.
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores `value` under `key`, replacing any previous value.
	pub fn insert<T>(&mut self, key: &'static str, value: T)
	where
		T: Any + Send + Sync,
	{
		self.values.insert(key, Box::new(value));
	}

	/// Borrows the value stored under `key` when it has type `T`.
	pub fn get<T>(&self, key: &str) -> Option<&T>
	where
		T: Any,
	{
		self.values.get(key)?.downcast_ref()
	}

	/// Removes and returns the value stored under `key` when it has type `T`.
	///
	/// A value of another type stays in place.
	pub fn take<T>(&mut self, key: &'static str) -> Option<T>
	where
		T: Any,
	{
		let value = self.values.remove(key)?;

		match value.downcast::<T>() {
			Ok(value) => Some(*value),
			Err(value) => {
				self.values.insert(key, value);

				None
			},
		}
	}

	/// Returns `true` when something is stored under `key`.
	pub fn contains(&self, key: &str) -> bool {
		self.values.contains_key(key)
	}

	/// Moves a non-empty body out of `request` into the context and zeroes `Content-Length`.
	///
	/// Returns `false` (leaving the request untouched) when the body is empty.
	pub fn stash_body(&mut self, request: &mut HttpRequest) -> bool {
		if request.body().is_empty() {
			return false;
		}

		let body = mem::take(request.body_mut());
		let content_length =
			request.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from_static("0"));

		self.insert(STASHED_BODY_KEY, StashedRequestBody { body, content_length });

		true
	}

	/// Puts a stashed body and its original `Content-Length` back onto `request`.
	///
	/// The stash is consumed; returns `false` when there was nothing to restore.
	pub fn restore_body(&mut self, request: &mut HttpRequest) -> bool {
		let Some(stashed) = self.take::<StashedRequestBody>(STASHED_BODY_KEY) else {
			return false;
		};

		*request.body_mut() = stashed.body;

		match stashed.content_length {
			Some(value) => {
				request.headers_mut().insert(CONTENT_LENGTH, value);
			},
			None => {
				request.headers_mut().remove(CONTENT_LENGTH);
			},
		}

		true
	}
}
impl Debug for CallContext {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let keys = self.values.keys().collect::<Vec<_>>();

		f.debug_struct("CallContext").field("keys", &keys).finish()
	}
}
