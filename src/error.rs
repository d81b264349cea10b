//! Crate-level error types shared across the policy, credentials, transports, and pagers.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// A `401` that carries no usable challenge is not an error; the policy hands the response back
/// to the caller unchanged. Likewise a missing continuation token simply ends a pager.
#[derive(Debug, ThisError)]
pub enum Error {
	/// The service issued a challenge the policy refuses to act on.
	#[error(transparent)]
	Challenge(#[from] ChallengeError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Token acquisition failed.
	#[error(transparent)]
	Credential(#[from] CredentialError),
	/// A list response could not be turned into a page.
	#[error(transparent)]
	Paging(#[from] PagingError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
}
impl Error {
	/// Returns `true` when the challenge itself was malformed.
	pub fn is_challenge_parse(&self) -> bool {
		matches!(
			self,
			Self::Challenge(
				ChallengeError::MissingAuthorization
					| ChallengeError::InvalidAuthorizationUri { .. }
					| ChallengeError::MissingTenant { .. }
					| ChallengeError::InvalidScopes(_)
			)
		)
	}

	/// Returns `true` when the challenge named a resource outside the requested domain.
	pub fn is_scope_validation(&self) -> bool {
		matches!(
			self,
			Self::Challenge(
				ChallengeError::ResourceMismatch { .. } | ChallengeError::InvalidScopeUrl { .. }
			)
		)
	}
}

/// Failures raised while interpreting a `WWW-Authenticate: Bearer` challenge.
#[derive(Debug, ThisError)]
pub enum ChallengeError {
	/// The challenge names a scope but no authorization server.
	#[error("Bearer challenge does not name an authorization server.")]
	MissingAuthorization,
	/// The authorization server URI cannot be parsed.
	#[error("Bearer challenge carries an invalid authorization URI `{uri}`.")]
	InvalidAuthorizationUri {
		/// Raw attribute value.
		uri: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The authorization server URI has no tenant path segment.
	#[error("Authorization URI `{uri}` does not contain a tenant path segment.")]
	MissingTenant {
		/// Raw attribute value.
		uri: String,
	},
	/// The advertised scope is empty or malformed.
	#[error("Bearer challenge carries invalid scopes.")]
	InvalidScopes(#[from] crate::auth::ScopeFormatError),
	/// The advertised scope cannot be parsed as a URL during resource verification.
	#[error(
		"The challenge resource `{scope}` is not a valid URL. If you wish to disable this check for \
		 your client, call `ChallengePolicyOptions::disable_challenge_resource_verification` when \
		 building the policy."
	)]
	InvalidScopeUrl {
		/// Offending scope.
		scope: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The advertised scope's host is not a parent domain of the request host.
	#[error(
		"The challenge resource `{scope}` does not match the requested domain `{host}`. If you wish \
		 to disable this check for your client, call \
		 `ChallengePolicyOptions::disable_challenge_resource_verification` when building the policy."
	)]
	ResourceMismatch {
		/// Offending scope.
		scope: String,
		/// Host of the request that received the challenge.
		host: String,
	},
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Request URI has no host to derive an authority from.
	#[error("Request URI `{uri}` has no host.")]
	MissingHost {
		/// Offending URI.
		uri: String,
	},
	/// A bearer token cannot be encoded as a header value.
	#[error("Access token cannot be encoded as an Authorization header.")]
	InvalidAuthorizationHeader(#[from] oauth2::http::header::InvalidHeaderValue),
	/// Requested scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeFormatError),
	/// Identifier validation failed.
	#[error(transparent)]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
	/// Authority host cannot be combined with a tenant into a token endpoint.
	#[error("Authority host `{host}` cannot be joined with tenant `{tenant}`.")]
	InvalidAuthorityHost {
		/// Configured authority host.
		host: String,
		/// Tenant being resolved.
		tenant: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Token acquisition failures.
#[derive(Debug, ThisError)]
pub enum CredentialError {
	/// Token endpoint rejected the request with an OAuth error.
	#[error("Token endpoint rejected the request: {reason}.")]
	Rejected {
		/// OAuth `error` code.
		code: String,
		/// Provider-supplied description, falling back to the code.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint returned an unexpected response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large or non-positive `expires_in`.
	#[error("The expires_in value is outside the supported range.")]
	ExpiresInOutOfRange,
}

/// Failures raised while decoding list responses into pages.
#[derive(Debug, ThisError)]
pub enum PagingError {
	/// The list endpoint answered with a non-success status.
	#[error("List request failed with HTTP status {status}.")]
	UnexpectedStatus {
		/// HTTP status code.
		status: u16,
	},
	/// The list body is not a valid page document.
	#[error("List response is not a valid page document.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
