//! Async executor for the challenge policy.

// self
use crate::{
	_prelude::*,
	challenge::ChallengeParameters,
	credential::TokenCredential,
	http::{HttpPipeline, HttpRequest, HttpResponse},
	obs::{Component, ObsSpan},
	policy::{
		CallContext, ChallengePolicyOptions, PolicyState, RequestTarget, attach_token,
		decision::{ChallengeDecision, InitialAction},
	},
};

/// Challenge-discovering bearer authentication over an async pipeline.
#[derive(Debug)]
pub struct ChallengeAuthPolicy<C>
where
	C: TokenCredential,
{
	credential: C,
	state: PolicyState,
}
impl<C> ChallengeAuthPolicy<C>
where
	C: TokenCredential,
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
	pub async fn send<P>(&self, mut request: HttpRequest, next: &P) -> Result<HttpResponse>
	where
		P: ?Sized + HttpPipeline,
	{
		let mut ctx = CallContext::new();

		self.process(&mut request, &mut ctx, next).await
	}

	/// Authenticates `request` and sends it through `next`, answering one challenge at most.
	///
	/// The returned response is whatever the last send produced, including a second `401`.
	/// Rejected challenges fail before any retry is sent. Credential and transport failures
	/// propagate unchanged. Dropping the future before the first response arrives leaves the cache
	/// untouched.
	pub async fn process<P>(
		&self,
		request: &mut HttpRequest,
		ctx: &mut CallContext,
		next: &P,
	) -> Result<HttpResponse>
	where
		P: ?Sized + HttpPipeline,
	{
		let target = RequestTarget::of(request)?;
		let response = match self.state.initial_action(&target) {
			InitialAction::Authorize { parameters, .. } =>
				self.send_authorized(request, ctx, next, &parameters, "authorize").await?,
			InitialAction::Probe => {
				ctx.stash_body(request);

				ObsSpan::new(Component::Policy, "probe").instrument(next.send(request, ctx)).await?
			},
		};
		let decision = {
			let _span = ObsSpan::new(Component::Policy, "challenge").entered();

			self.state.evaluate(&response, &target)
		};

		match decision {
			Ok(ChallengeDecision::Retry { parameters, .. }) => {
				ctx.restore_body(request);

				self.send_authorized(request, ctx, next, &parameters, "retry").await
			},
			Ok(ChallengeDecision::PassThrough(_)) => {
				ctx.restore_body(request);

				Ok(response)
			},
			Err(e) => {
				ctx.restore_body(request);

				Err(e)
			},
		}
	}

	async fn send_authorized<P>(
		&self,
		request: &mut HttpRequest,
		ctx: &CallContext,
		next: &P,
		parameters: &ChallengeParameters,
		stage: &'static str,
	) -> Result<HttpResponse>
	where
		P: ?Sized + HttpPipeline,
	{
		let span = ObsSpan::new(Component::Policy, stage);
		let token_request = parameters.token_request();
		let token = span.instrument(self.credential.get_token(&token_request)).await?;

		attach_token(request, &token)?;

		span.instrument(next.send(request, ctx)).await
	}
}
