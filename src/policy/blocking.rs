//! Blocking executor for the challenge policy.

// self
use crate::{
	_prelude::*,
	challenge::ChallengeParameters,
	credential::BlockingTokenCredential,
	http::{BlockingHttpPipeline, HttpRequest, HttpResponse},
	obs::{Component, ObsSpan},
	policy::{
		CallContext, ChallengePolicyOptions, PolicyState, RequestTarget, attach_token,
		decision::{ChallengeDecision, InitialAction},
	},
};

/// Challenge-discovering bearer authentication over a blocking pipeline.
///
/// Behaves exactly like [`ChallengeAuthPolicy`](crate::policy::ChallengeAuthPolicy): same headers,
/// same retry count, same cache effects.
#[derive(Debug)]
pub struct BlockingChallengeAuthPolicy<C>
where
	C: BlockingTokenCredential,
{
	credential: C,
	state: PolicyState,
}
impl<C> BlockingChallengeAuthPolicy<C>
where
	C: BlockingTokenCredential,
{
	/// Creates a policy with default options (verification on, global cache).
	pub fn new(credential: C) -> Self {
		Self::with_options(credential, ChallengePolicyOptions::default())
	}

	/// Creates a policy with explicit options.
	pub fn with_options(credential: C, options: ChallengePolicyOptions) -> Self {
		Self { credential, state: PolicyState::new(options) }
	}

	/// Options this policy was built with.
	pub fn options(&self) -> &ChallengePolicyOptions {
		&self.state.options
	}

	/// Parameters this policy currently authenticates `authority` with.
	pub fn active_parameters(&self, authority: &str) -> Option<Arc<ChallengeParameters>> {
		self.state.active_for(authority)
	}

	/// Sends `request` through `next` with a fresh [`CallContext`].
	pub fn send<P>(&self, mut request: HttpRequest, next: &P) -> Result<HttpResponse>
	where
		P: ?Sized + BlockingHttpPipeline,
	{
		let mut ctx = CallContext::new();

		self.process(&mut request, &mut ctx, next)
	}

	/// Authenticates `request` and sends it through `next`, answering one challenge at most.
	pub fn process<P>(
		&self,
		request: &mut HttpRequest,
		ctx: &mut CallContext,
		next: &P,
	) -> Result<HttpResponse>
	where
		P: ?Sized + BlockingHttpPipeline,
	{
		let target = RequestTarget::of(request)?;
		let response = match self.state.initial_action(&target) {
			InitialAction::Authorize { parameters, .. } =>
				self.send_authorized(request, ctx, next, &parameters, "authorize")?,
			InitialAction::Probe => {
				let _span = ObsSpan::new(Component::Policy, "probe").entered();

				ctx.stash_body(request);
				next.send(request, ctx)?
			},
		};
		let decision = {
			let _span = ObsSpan::new(Component::Policy, "challenge").entered();

			self.state.evaluate(&response, &target)
		};

		ctx.restore_body(request);

		match decision? {
			ChallengeDecision::Retry { parameters, .. } =>
				self.send_authorized(request, ctx, next, &parameters, "retry"),
			ChallengeDecision::PassThrough(_) => Ok(response),
		}
	}

	fn send_authorized<P>(
		&self,
		request: &mut HttpRequest,
		ctx: &CallContext,
		next: &P,
		parameters: &ChallengeParameters,
		stage: &'static str,
	) -> Result<HttpResponse>
	where
		P: ?Sized + BlockingHttpPipeline,
	{
		let _span = ObsSpan::new(Component::Policy, stage).entered();
		let token = self.credential.get_token(&parameters.token_request())?;

		attach_token(request, &token)?;

		next.send(request, ctx)
	}
}
