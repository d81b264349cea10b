//! Policy configuration.

// self
use crate::challenge::ChallengeCache;

/// Options accepted by [`ChallengeAuthPolicy`](crate::policy::ChallengeAuthPolicy) and
/// [`BlockingChallengeAuthPolicy`](crate::policy::BlockingChallengeAuthPolicy).
#[derive(Clone, Debug)]
pub struct ChallengePolicyOptions {
	verify_challenge_resource: bool,
	cache: ChallengeCache,
}
impl ChallengePolicyOptions {
	/// Accepts challenges whose resource is not a parent domain of the request host.
	///
	/// Only disable this when the service legitimately names a resource outside its own domain.
	pub fn disable_challenge_resource_verification(mut self) -> Self {
		self.verify_challenge_resource = false;

		self
	}

	/// Overrides the resource verification flag.
	pub fn with_challenge_resource_verification(mut self, enabled: bool) -> Self {
		self.verify_challenge_resource = enabled;

		self
	}

	/// Uses `cache` instead of [`ChallengeCache::global`].
	pub fn with_cache(mut self, cache: ChallengeCache) -> Self {
		self.cache = cache;

		self
	}

	/// Returns `true` when challenge resources are checked against the request host.
	pub fn verifies_challenge_resource(&self) -> bool {
		self.verify_challenge_resource
	}

	/// Cache shared with other policies.
	pub fn cache(&self) -> &ChallengeCache {
		&self.cache
	}
}
impl Default for ChallengePolicyOptions {
	fn default() -> Self {
		Self { verify_challenge_resource: true, cache: ChallengeCache::global().clone() }
	}
}
