// self
use crate::obs::ChallengeOutcome;

/// Records a policy decision via the global metrics recorder (when enabled).
pub fn record_challenge_outcome(outcome: ChallengeOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("vault_challenge_auth_challenge_total", "outcome" => outcome.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = outcome;
	}
}

/// Records one page fetch via the global metrics recorder (when enabled).
pub fn record_page_fetch() {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("vault_challenge_auth_page_fetch_total").increment(1);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_noop_without_metrics() {
		record_challenge_outcome(ChallengeOutcome::Rejected);
		record_page_fetch();
	}
}
