//! Bearer-token challenge authentication policy.
//!
//! A policy wraps a token credential and sits in front of "the rest of the pipeline". The first
//! request to an unknown authority goes out without a token (its body stashed in the
//! [`CallContext`]); the `401` challenge names the authorization server and scope, which are
//! validated, cached process-wide per authority, and used to retry the original request exactly
//! once. Later requests, from this policy or any other sharing the cache, authenticate on their
//! first send.
//!
//! [`ChallengeAuthPolicy`] drives the flow with async I/O and [`BlockingChallengeAuthPolicy`]
//! with blocking I/O; both delegate every decision to [`decision`].

mod asynchronous;
mod blocking;
mod context;
mod options;

pub mod decision;

pub use asynchronous::*;
pub use blocking::*;
pub use context::*;
pub use options::*;

// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	challenge::{self, ChallengeParameters},
	error::ConfigError,
	http::{HeaderValue, HttpRequest, HttpResponse, header::AUTHORIZATION},
	obs::{self, ChallengeOutcome},
	policy::decision::{ChallengeDecision, InitialAction},
};

#[derive(Clone, Debug)]
struct ActiveChallenge {
	authority: String,
	parameters: Arc<ChallengeParameters>,
}

// Authority and host of the request being authenticated.
#[derive(Clone, Debug)]
struct RequestTarget {
	authority: String,
	host: String,
}
impl RequestTarget {
	fn of(request: &HttpRequest) -> Result<Self> {
		let authority = challenge::authority_key(request.uri())?;
		let host = request.uri().host().unwrap_or_default().to_owned();

		Ok(Self { authority, host })
	}
}

// State shared by both executors.
#[derive(Debug)]
struct PolicyState {
	options: ChallengePolicyOptions,
	active: RwLock<Option<ActiveChallenge>>,
}
impl PolicyState {
	fn new(options: ChallengePolicyOptions) -> Self {
		Self { options, active: RwLock::new(None) }
	}

	fn active_for(&self, authority: &str) -> Option<Arc<ChallengeParameters>> {
		self.active
			.read()
			.as_ref()
			.filter(|active| active.authority == authority)
			.map(|active| active.parameters.clone())
	}

	fn known_for(&self, authority: &str) -> Option<Arc<ChallengeParameters>> {
		self.active_for(authority).or_else(|| self.options.cache().get(authority))
	}

	fn adopt(&self, authority: &str, parameters: Arc<ChallengeParameters>) {
		let active = ActiveChallenge { authority: authority.to_owned(), parameters };

		*self.active.write() = Some(active);
	}

	fn initial_action(&self, target: &RequestTarget) -> InitialAction {
		let action = decision::initial_action(self.active_for(&target.authority), || {
			self.options.cache().get(&target.authority)
		});

		match &action {
			InitialAction::Authorize { parameters, adopt } => {
				if *adopt {
					self.adopt(&target.authority, parameters.clone());
				}

				obs::record_challenge_outcome(ChallengeOutcome::CacheHit);
			},
			InitialAction::Probe => obs::record_challenge_outcome(ChallengeOutcome::Probe),
		}

		action
	}

	// Evaluates the first response and stores newly discovered parameters.
	fn evaluate(
		&self,
		response: &HttpResponse,
		target: &RequestTarget,
	) -> Result<ChallengeDecision> {
		let decision = decision::evaluate_response(
			response,
			&target.host,
			self.options.verifies_challenge_resource(),
			|| self.known_for(&target.authority),
		)
		.inspect_err(|_| obs::record_challenge_outcome(ChallengeOutcome::Rejected))?;

		match &decision {
			ChallengeDecision::Retry { parameters, discovered } => {
				if *discovered {
					self.adopt(&target.authority, parameters.clone());
					self.options.cache().put(target.authority.clone(), parameters.clone());
				}

				obs::record_challenge_outcome(ChallengeOutcome::Retry);
			},
			ChallengeDecision::PassThrough(_) =>
				obs::record_challenge_outcome(ChallengeOutcome::PassThrough),
		}

		Ok(decision)
	}
}

fn attach_token(request: &mut HttpRequest, token: &AccessToken) -> Result<()> {
	let mut value = HeaderValue::from_str(&token.bearer_value()).map_err(ConfigError::from)?;

	value.set_sensitive(true);
	request.headers_mut().insert(AUTHORIZATION, value);

	Ok(())
}
