//! Immutable parameters discovered from a bearer challenge.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TenantId},
	challenge::ChallengeAttributes,
	credential::TokenRequestContext,
	error::ChallengeError,
};

/// Authorization server, tenant, and scopes a challenged resource expects.
///
/// Values are never mutated after construction and are shared as `Arc<ChallengeParameters>`
/// between the cache and every policy that adopts them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChallengeParameters {
	authorization_uri: Url,
	tenant_id: TenantId,
	scopes: ScopeSet,
}
impl ChallengeParameters {
	/// Creates parameters from already validated parts.
	pub fn new(
		authorization_uri: Url,
		tenant_id: TenantId,
		scopes: ScopeSet,
	) -> Result<Self, ChallengeError> {
		if scopes.is_empty() {
			return Err(crate::auth::ScopeFormatError::NoScopes.into());
		}

		Ok(Self { authorization_uri, tenant_id, scopes })
	}

	/// Builds parameters from challenge attributes.
	///
	/// Returns `Ok(None)` when the challenge names neither `resource` nor `scope`; callers fall
	/// back to previously discovered parameters in that case. A scope without a usable
	/// authorization URI is an error.
	pub fn from_attributes(
		attributes: &ChallengeAttributes,
	) -> Result<Option<Self>, ChallengeError> {
		let Some(scope) = attributes.scope() else {
			return Ok(None);
		};
		let raw = attributes.authorization().ok_or(ChallengeError::MissingAuthorization)?;
		let authorization_uri = Url::parse(raw).map_err(|source| {
			ChallengeError::InvalidAuthorizationUri { uri: raw.to_owned(), source }
		})?;
		let tenant_id = authorization_uri
			.path_segments()
			.and_then(|mut segments| segments.next())
			.filter(|segment| !segment.is_empty())
			.and_then(|segment| TenantId::new(segment).ok())
			.ok_or_else(|| ChallengeError::MissingTenant { uri: raw.to_owned() })?;
		let scopes = ScopeSet::non_empty([scope])?;

		Self::new(authorization_uri, tenant_id, scopes).map(Some)
	}

	/// Authorization server that issues tokens for the resource.
	pub fn authorization_uri(&self) -> &Url {
		&self.authorization_uri
	}

	/// Tenant taken from the first path segment of the authorization URI.
	pub fn tenant_id(&self) -> &TenantId {
		&self.tenant_id
	}

	/// Scopes the token must be issued for.
	pub fn scopes(&self) -> &ScopeSet {
		&self.scopes
	}

	/// Checks that every scope's host is a parent domain of `request_host`.
	///
	/// `myvault.vault.azure.net` accepts `https://vault.azure.net/.default` but rejects
	/// `https://evil.example/.default` as well as a scope naming the request host itself.
	pub fn verify_resource(&self, request_host: &str) -> Result<(), ChallengeError> {
		for scope in self.scopes.iter() {
			let url = Url::parse(scope).map_err(|source| ChallengeError::InvalidScopeUrl {
				scope: scope.to_owned(),
				source,
			})?;
			let matches = url.host_str().is_some_and(|scope_host| {
				let suffix = format!(".{}", scope_host.to_ascii_lowercase());

				request_host.to_ascii_lowercase().ends_with(&suffix)
			});

			if !matches {
				return Err(ChallengeError::ResourceMismatch {
					scope: scope.to_owned(),
					host: request_host.to_owned(),
				});
			}
		}

		Ok(())
	}

	/// Token request for these parameters.
	pub fn token_request(&self) -> TokenRequestContext {
		TokenRequestContext::new(self.scopes.clone()).with_tenant(self.tenant_id.clone())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn parse(header: &str) -> Result<Option<ChallengeParameters>, ChallengeError> {
		ChallengeParameters::from_attributes(&ChallengeAttributes::parse(header))
	}

	#[test]
	fn builds_parameters_from_vault_challenge() {
		let parameters = parse(concat!(
			"Bearer authorization=\"https://login.microsoftonline.com/72f988bf\", ",
			"resource=\"https://vault.azure.net\"",
		))
		.expect("Challenge should parse.")
		.expect("Challenge should carry a scope.");

		assert_eq!(parameters.tenant_id().as_ref(), "72f988bf");
		assert_eq!(parameters.authorization_uri().host_str(), Some("login.microsoftonline.com"));
		assert_eq!(parameters.scopes().first(), Some("https://vault.azure.net/.default"));

		let request = parameters.token_request();

		assert_eq!(request.tenant_id.as_ref().map(|t| t.as_ref()), Some("72f988bf"));
		assert_eq!(&request.scopes, parameters.scopes());
	}

	#[test]
	fn missing_scope_yields_none() {
		let parsed =
			parse("Bearer authorization=\"https://login/tenant\"").expect("No scope is fine.");

		assert!(parsed.is_none());
	}

	#[test]
	fn malformed_authorization_is_fatal() {
		assert!(matches!(
			parse("Bearer authorization=\"not a uri\", scope=\"https://vault.azure.net/.default\""),
			Err(ChallengeError::InvalidAuthorizationUri { .. })
		));
		assert!(matches!(
			parse("Bearer scope=\"https://vault.azure.net/.default\""),
			Err(ChallengeError::MissingAuthorization)
		));
		assert!(matches!(
			parse("Bearer authorization=\"https://login.microsoftonline.com/\", scope=\"x\""),
			Err(ChallengeError::MissingTenant { .. })
		));
	}

	#[test]
	fn resource_verification_requires_parent_domain() {
		let vault =
			parse("Bearer authorization=\"https://login/t\", resource=\"https://vault.azure.net\"")
				.expect("Challenge should parse.")
				.expect("Challenge should carry a scope.");
		let evil =
			parse("Bearer authorization=\"https://login/t\", scope=\"https://evil.example/.default\"")
				.expect("Challenge should parse.")
				.expect("Challenge should carry a scope.");

		assert!(vault.verify_resource("myvault.vault.azure.net").is_ok());
		assert!(vault.verify_resource("MyVault.Vault.Azure.Net").is_ok());
		assert!(vault.verify_resource("vault.azure.net").is_err());
		assert!(vault.verify_resource("myvault.notvault.azure.net").is_err());
		assert!(matches!(
			evil.verify_resource("myvault.vault.azure.net"),
			Err(ChallengeError::ResourceMismatch { .. })
		));
	}
}
