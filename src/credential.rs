//! Token credential contracts and built-in credentials.
//!
//! The policy only depends on [`TokenCredential`] (or [`BlockingTokenCredential`] for the
//! blocking executor). Failures propagate to the caller unchanged.

#[cfg(feature = "reqwest")] pub mod client_secret;

#[cfg(feature = "reqwest")] pub use client_secret::*;

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ScopeSet, TenantId},
};

/// Boxed future returned by [`TokenCredential::get_token`].
pub type CredentialFuture<'a> = Pin<Box<dyn Future<Output = Result<AccessToken>> + 'a + Send>>;

/// Asynchronous token acquisition capability.
pub trait TokenCredential
where
	Self: Send + Sync,
{
	/// Acquires a token for the scopes (and optional tenant) in `request`.
	fn get_token<'a>(&'a self, request: &'a TokenRequestContext) -> CredentialFuture<'a>;
}
impl<C> TokenCredential for Arc<C>
where
	C: ?Sized + TokenCredential,
{
	fn get_token<'a>(&'a self, request: &'a TokenRequestContext) -> CredentialFuture<'a> {
		C::get_token(self, request)
	}
}

/// Blocking token acquisition capability.
pub trait BlockingTokenCredential
where
	Self: Send + Sync,
{
	/// Acquires a token for the scopes (and optional tenant) in `request`.
	fn get_token(&self, request: &TokenRequestContext) -> Result<AccessToken>;
}
impl<C> BlockingTokenCredential for Arc<C>
where
	C: ?Sized + BlockingTokenCredential,
{
	fn get_token(&self, request: &TokenRequestContext) -> Result<AccessToken> {
		C::get_token(self, request)
	}
}

/// Scopes and tenant a token is requested for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenRequestContext {
	/// Scopes the token must cover.
	pub scopes: ScopeSet,
	/// Tenant that should issue the token; credentials fall back to their own default when unset.
	pub tenant_id: Option<TenantId>,
}
impl TokenRequestContext {
	/// Creates a request for `scopes` without a tenant override.
	pub fn new(scopes: ScopeSet) -> Self {
		Self { scopes, tenant_id: None }
	}

	/// Pins the issuing tenant.
	pub fn with_tenant(mut self, tenant_id: TenantId) -> Self {
		self.tenant_id = Some(tenant_id);

		self
	}
}

/// Credential that always returns the same token.
#[derive(Clone, Debug)]
pub struct StaticTokenCredential(AccessToken);
impl StaticTokenCredential {
	/// Wraps a fixed token.
	pub fn new(token: AccessToken) -> Self {
		Self(token)
	}
}
impl TokenCredential for StaticTokenCredential {
	fn get_token<'a>(&'a self, _request: &'a TokenRequestContext) -> CredentialFuture<'a> {
		let token = self.0.clone();

		Box::pin(async move { Ok(token) })
	}
}
impl BlockingTokenCredential for StaticTokenCredential {
	fn get_token(&self, _request: &TokenRequestContext) -> Result<AccessToken> {
		Ok(self.0.clone())
	}
}
