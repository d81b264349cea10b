//! Optional observability helpers for the challenge policy, pagers, and credentials.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `vault_challenge_auth.policy`,
//!   `vault_challenge_auth.pager`, or `vault_challenge_auth.credential` with a `stage` field.
//! - Enable `metrics` to increment `vault_challenge_auth_challenge_total` (labeled by `outcome`)
//!   for every policy decision and `vault_challenge_auth_page_fetch_total` for every page fetch.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Components that emit spans.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Component {
	/// Challenge authentication policy (either executor).
	Policy,
	/// Continuation pagers.
	Pager,
	/// Built-in token credentials.
	Credential,
}
impl Component {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Component::Policy => "policy",
			Component::Pager => "pager",
			Component::Credential => "credential",
		}
	}
}
impl Display for Component {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// How the policy handled one logical request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChallengeOutcome {
	/// Parameters were already known; the first send carried a token.
	CacheHit,
	/// Parameters were unknown; the first send went out without a token.
	Probe,
	/// A challenge was honored and the request was retried once.
	Retry,
	/// The response was handed back without a retry.
	PassThrough,
	/// The challenge was rejected as malformed or out of domain.
	Rejected,
}
impl ChallengeOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ChallengeOutcome::CacheHit => "cache_hit",
			ChallengeOutcome::Probe => "probe",
			ChallengeOutcome::Retry => "retry",
			ChallengeOutcome::PassThrough => "pass_through",
			ChallengeOutcome::Rejected => "rejected",
		}
	}
}
impl Display for ChallengeOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
