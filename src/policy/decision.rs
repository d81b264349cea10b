//! Pure decision functions shared by both policy executors.
//!
//! The state machine (initial send, awaiting challenge, authorized) is expressed here over plain
//! values so the async and blocking executors only perform I/O and record outcomes.

// self
use crate::{
	_prelude::*,
	challenge::{ChallengeAttributes, ChallengeParameters},
	error::ChallengeError,
	http::{HttpResponse, StatusCode, header::WWW_AUTHENTICATE},
};

/// What to do with a request before its first send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InitialAction {
	/// Parameters are known: acquire a token and send authenticated.
	Authorize {
		/// Parameters to request the token for.
		parameters: Arc<ChallengeParameters>,
		/// `true` when the parameters came from the shared cache and should become the policy's
		/// active parameters.
		adopt: bool,
	},
	/// Nothing is known about the authority: send without a token to elicit a challenge.
	Probe,
}

/// Picks the first action from the policy's active parameters and the shared cache entry.
///
/// `cached` is only consulted when no active parameters match.
pub fn initial_action<F>(active: Option<Arc<ChallengeParameters>>, cached: F) -> InitialAction
where
	F: FnOnce() -> Option<Arc<ChallengeParameters>>,
{
	if let Some(parameters) = active {
		return InitialAction::Authorize { parameters, adopt: false };
	}

	match cached() {
		Some(parameters) => InitialAction::Authorize { parameters, adopt: true },
		None => InitialAction::Probe,
	}
}

/// Why a response is handed back without a retry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassThroughReason {
	/// Not a `401` carrying `WWW-Authenticate`.
	NotChallenge,
	/// A challenge without scope information for an authority nothing is known about.
	NoChallengeInfo,
}

/// Outcome of inspecting the response to the first send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChallengeDecision {
	/// Return the response to the caller unchanged.
	PassThrough(PassThroughReason),
	/// Restore the body, acquire a token for `parameters`, and send once more.
	Retry {
		/// Parameters to request the token for.
		parameters: Arc<ChallengeParameters>,
		/// `true` when the parameters were parsed from this response and must be stored.
		discovered: bool,
	},
}

/// Evaluates the first response for `request_host`.
///
/// `known` supplies previously discovered parameters for the authority and is only consulted
/// when the challenge names neither `resource` nor `scope`. Newly discovered parameters are
/// checked against `request_host` when `verify_resource` is set.
pub fn evaluate_response<F>(
	response: &HttpResponse,
	request_host: &str,
	verify_resource: bool,
	known: F,
) -> Result<ChallengeDecision, ChallengeError>
where
	F: FnOnce() -> Option<Arc<ChallengeParameters>>,
{
	if response.status() != StatusCode::UNAUTHORIZED {
		return Ok(ChallengeDecision::PassThrough(PassThroughReason::NotChallenge));
	}

	let Some(header) = response.headers().get(WWW_AUTHENTICATE) else {
		return Ok(ChallengeDecision::PassThrough(PassThroughReason::NotChallenge));
	};
	let attributes = ChallengeAttributes::parse(header.to_str().unwrap_or_default());

	if let Some(parameters) = ChallengeParameters::from_attributes(&attributes)? {
		if verify_resource {
			parameters.verify_resource(request_host)?;
		}

		return Ok(ChallengeDecision::Retry { parameters: Arc::new(parameters), discovered: true });
	}

	Ok(match known() {
		Some(parameters) => ChallengeDecision::Retry { parameters, discovered: false },
		None => ChallengeDecision::PassThrough(PassThroughReason::NoChallengeInfo),
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::{response, vault_challenge};

	const HOST: &str = "myvault.vault.azure.net";

	fn known() -> Arc<ChallengeParameters> {
		let attributes = ChallengeAttributes::parse(
			"Bearer authorization=\"https://login.microsoftonline.com/tenant-0\", \
			 scope=\"https://vault.azure.net/.default\"",
		);

		Arc::new(
			ChallengeParameters::from_attributes(&attributes)
				.expect("Fixture should parse.")
				.expect("Fixture should carry a scope."),
		)
	}

	#[test]
	fn active_parameters_win_over_the_cache() {
		let active = known();
		let action =
			initial_action(Some(active.clone()), || panic!("Cache must not be consulted."));

		assert_eq!(action, InitialAction::Authorize { parameters: active, adopt: false });
		assert_eq!(initial_action(None, || None), InitialAction::Probe);
		assert!(matches!(
			initial_action(None, || Some(known())),
			InitialAction::Authorize { adopt: true, .. }
		));
	}

	#[test]
	fn non_challenges_pass_through() {
		let ok = response(StatusCode::OK, None);
		let bare_401 = response(StatusCode::UNAUTHORIZED, None);
		let forbidden = response(StatusCode::FORBIDDEN, Some("Bearer scope=\"x\""));

		for response in [ok, bare_401, forbidden] {
			assert_eq!(
				evaluate_response(&response, HOST, true, || Some(known()))
					.expect("Non-challenges are not errors."),
				ChallengeDecision::PassThrough(PassThroughReason::NotChallenge),
			);
		}
	}

	#[test]
	fn discovered_parameters_request_a_retry() {
		let challenge = vault_challenge("https://vault.azure.net");
		let decision = evaluate_response(&challenge, HOST, true, || {
			panic!("Known parameters are only a fallback.")
		})
		.expect("Vault challenge should be accepted.");
		let ChallengeDecision::Retry { parameters, discovered } = decision else {
			panic!("Expected a retry, got {decision:?}.");
		};

		assert!(discovered);
		assert_eq!(parameters.tenant_id().as_ref(), "tenant-1");
		assert_eq!(parameters.scopes().first(), Some("https://vault.azure.net/.default"));
	}

	#[test]
	fn challenges_without_scope_fall_back_to_known_parameters() {
		let challenge = response(
			StatusCode::UNAUTHORIZED,
			Some("Bearer authorization=\"https://login.microsoftonline.com/tenant-1\""),
		);
		let fallback = known();

		assert_eq!(
			evaluate_response(&challenge, HOST, true, || Some(fallback.clone()))
				.expect("Fallback should not fail."),
			ChallengeDecision::Retry { parameters: fallback, discovered: false },
		);
		assert_eq!(
			evaluate_response(&challenge, HOST, true, || None)
				.expect("Nothing known is not fatal."),
			ChallengeDecision::PassThrough(PassThroughReason::NoChallengeInfo),
		);
	}

	#[test]
	fn out_of_domain_resources_are_rejected_unless_disabled() {
		let challenge = vault_challenge("https://evil.example");
		let err = evaluate_response(&challenge, HOST, true, || None)
			.expect_err("Foreign resource should be rejected.");

		assert!(matches!(err, ChallengeError::ResourceMismatch { .. }));
		assert!(matches!(
			evaluate_response(&challenge, HOST, false, || None),
			Ok(ChallengeDecision::Retry { discovered: true, .. })
		));
	}

	#[test]
	fn malformed_authorization_is_fatal() {
		let challenge = response(
			StatusCode::UNAUTHORIZED,
			Some("Bearer authorization=\"not a uri\", resource=\"https://vault.azure.net\""),
		);

		assert!(matches!(
			evaluate_response(&challenge, HOST, true, || None),
			Err(ChallengeError::InvalidAuthorizationUri { .. })
		));
	}
}
