//! Process-wide cache of discovered challenge parameters keyed by authority.

// std
use std::sync::OnceLock;
// self
use crate::{_prelude::*, challenge::ChallengeParameters};

type CacheMap = Arc<RwLock<HashMap<String, Arc<ChallengeParameters>>>>;

/// Thread-safe authority → [`ChallengeParameters`] map.
///
/// Clones share the same underlying map. Writers racing on one authority simply overwrite each
/// other; the last write wins.
#[derive(Clone, Debug, Default)]
pub struct ChallengeCache(CacheMap);
impl ChallengeCache {
	/// Returns the process-wide cache used by policies that are not given one explicitly.
	pub fn global() -> &'static ChallengeCache {
		static GLOBAL: OnceLock<ChallengeCache> = OnceLock::new();

		GLOBAL.get_or_init(ChallengeCache::default)
	}

	/// Fetches the parameters discovered for `authority`, if any.
	pub fn get(&self, authority: &str) -> Option<Arc<ChallengeParameters>> {
		self.0.read().get(authority).cloned()
	}

	/// Stores `parameters` for `authority`, replacing any previous entry.
	pub fn put(&self, authority: impl Into<String>, parameters: Arc<ChallengeParameters>) {
		self.0.write().insert(authority.into(), parameters);
	}

	/// Drops every entry.
	pub fn clear(&self) {
		self.0.write().clear();
	}

	/// Number of cached authorities.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing has been discovered yet.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	/// Returns `true` when `other` shares this cache's map.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}
