//! Tenant and client identifiers.
//!
//! A [`TenantId`] is lifted out of the first path segment of a challenge's authorization URI and
//! later spliced back into a token endpoint path, so it must survive as a single URL path segment.
//! A [`ClientId`] is sent verbatim as the `client_id` form field.

// std
use std::borrow::Borrow;
// self
use crate::_prelude::*;

const MAX_LEN: usize = 128;

/// Which identifier failed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum IdentifierKind {
	/// Directory tenant.
	Tenant,
	/// Application (client) id.
	Client,
}
impl IdentifierKind {
	fn rejects(self, c: char) -> bool {
		match self {
			Self::Tenant => c.is_whitespace() || matches!(c, '/' | '?' | '#' | '%' | '\\'),
			Self::Client => c.is_whitespace() || c.is_control(),
		}
	}
}
impl Display for IdentifierKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(match self {
			Self::Tenant => "Tenant",
			Self::Client => "Client",
		})
	}
}

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier.
		kind: IdentifierKind,
	},
	/// The identifier contains a character it cannot carry.
	#[error("{kind} identifier contains the disallowed character {found:?}.")]
	DisallowedCharacter {
		/// Kind of identifier.
		kind: IdentifierKind,
		/// First offending character.
		found: char,
	},
	/// The identifier exceeded the allowed length.
	#[error("{kind} identifier exceeds {max} bytes.")]
	TooLong {
		/// Kind of identifier.
		kind: IdentifierKind,
		/// Maximum permitted length.
		max: usize,
	},
}

fn validate(kind: IdentifierKind, value: &str) -> Result<(), IdentifierError> {
	if value.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if value.len() > MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: MAX_LEN });
	}
	if let Some(found) = value.chars().find(|c| kind.rejects(*c)) {
		return Err(IdentifierError::DisallowedCharacter { kind, found });
	}

	Ok(())
}

macro_rules! identifier {
	($(#[$meta:meta])* $name:ident => $kind:ident) => {
		$(#[$meta])*
		#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Validates and wraps `value`.
			pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
				Self::try_from(value.into())
			}

			/// Borrowed view of the identifier.
			pub fn as_str(&self) -> &str {
				&self.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate(IdentifierKind::$kind, &value).map(|()| Self(value))
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, "{}({})", IdentifierKind::$kind, self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
	};
}

identifier! {
	/// Directory tenant that issues tokens for a challenged resource.
	TenantId => Tenant
}
identifier! {
	/// Application identifier registered with the authorization server.
	ClientId => Client
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn tenant_must_fit_in_one_path_segment() {
		for raw in ["tenant/extra", "tenant?x=1", "tenant#frag", "ten%2Fant", " tenant"] {
			assert!(
				matches!(
					TenantId::new(raw),
					Err(IdentifierError::DisallowedCharacter { kind: IdentifierKind::Tenant, .. })
				),
				"`{raw}` should be rejected as a tenant.",
			);
		}

		let tenant = TenantId::new("72f988bf-86f1-41af-91ab-2d7cd011db47")
			.expect("GUID tenant should be valid.");

		assert_eq!(tenant.as_str(), "72f988bf-86f1-41af-91ab-2d7cd011db47");
	}

	#[test]
	fn client_ids_allow_path_characters_but_not_whitespace() {
		ClientId::new("api://vault-reader").expect("URI-shaped client ids are accepted.");

		assert_eq!(
			ClientId::new("vault reader"),
			Err(IdentifierError::DisallowedCharacter { kind: IdentifierKind::Client, found: ' ' }),
		);
		assert_eq!(ClientId::new(""), Err(IdentifierError::Empty { kind: IdentifierKind::Client }));
	}

	#[test]
	fn length_is_bounded() {
		TenantId::new("a".repeat(MAX_LEN)).expect("Exact length should succeed.");

		assert_eq!(
			TenantId::new("a".repeat(MAX_LEN + 1)),
			Err(IdentifierError::TooLong { kind: IdentifierKind::Tenant, max: MAX_LEN }),
		);
	}

	#[test]
	fn serde_round_trip_validates() {
		let tenant: TenantId =
			serde_json::from_str("\"contoso\"").expect("Tenant should deserialize.");

		assert_eq!(format!("{tenant:?}"), "Tenant(contoso)");
		assert_eq!(
			serde_json::to_string(&tenant).expect("Tenant should serialize."),
			"\"contoso\"",
		);
		assert!(serde_json::from_str::<TenantId>("\"a/b\"").is_err());

		let lookup = HashMap::from([(tenant, 1_u8)]);

		assert_eq!(lookup.get("contoso"), Some(&1));
	}
}
