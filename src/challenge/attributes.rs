//! `WWW-Authenticate: Bearer` attribute extraction.

// self
use crate::_prelude::*;

/// Scheme prefix recognized on `WWW-Authenticate` values (matched case-insensitively).
pub const BEARER_PREFIX: &str = "Bearer ";

/// Attribute naming the authorization server.
pub const AUTHORIZATION: &str = "authorization";
/// Alternate attribute naming the authorization server.
pub const AUTHORIZATION_URI: &str = "authorization_uri";
/// Legacy attribute naming the resource; maps to `<resource>/.default`.
pub const RESOURCE: &str = "resource";
/// Attribute naming the scope directly.
pub const SCOPE: &str = "scope";

/// Key/value attributes carried by a bearer challenge.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChallengeAttributes(BTreeMap<String, String>);
impl ChallengeAttributes {
	/// Parses a raw `WWW-Authenticate` value.
	///
	/// Values without a case-insensitive `Bearer ` prefix yield no attributes. Otherwise the
	/// remainder is split on `", "`, each pair on its first `=`, and surrounding `"` characters are
	/// trimmed from both halves. Later duplicates overwrite earlier ones; pairs without `=` are
	/// ignored.
	pub fn parse(header: &str) -> Self {
		let mut attributes = BTreeMap::new();
		let Some(rest) = strip_bearer_prefix(header) else {
			return Self(attributes);
		};

		for pair in rest.split(", ") {
			if let Some((key, value)) = pair.split_once('=') {
				attributes.insert(trim_quotes(key).to_owned(), trim_quotes(value).to_owned());
			}
		}

		Self(attributes)
	}

	/// Returns the attribute stored under `key`.
	pub fn get(&self, key: &str) -> Option<&str> {
		self.0.get(key).map(String::as_str)
	}

	/// Authorization server from `authorization`, falling back to `authorization_uri`.
	pub fn authorization(&self) -> Option<&str> {
		self.get(AUTHORIZATION).or_else(|| self.get(AUTHORIZATION_URI))
	}

	/// Scope to request: `<resource>/.default` when `resource` is present, otherwise `scope`.
	pub fn scope(&self) -> Option<String> {
		self.get(RESOURCE)
			.map(|resource| format!("{resource}{}", crate::auth::DEFAULT_SCOPE_SUFFIX))
			.or_else(|| self.get(SCOPE).map(str::to_owned))
	}

	/// Number of extracted attributes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when nothing was extracted.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterator over `(key, value)` pairs in key order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}
}

fn strip_bearer_prefix(header: &str) -> Option<&str> {
	let prefix = header.get(..BEARER_PREFIX.len())?;

	prefix.eq_ignore_ascii_case(BEARER_PREFIX).then(|| &header[BEARER_PREFIX.len()..])
}

fn trim_quotes(value: &str) -> &str {
	value.trim_matches('"')
}
