//! Page value and its `value`/`nextLink` wire shape.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{_prelude::*, error::PagingError, http::HttpResponse};

/// One batch of items plus the token that continues the listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
	/// Items in server order.
	#[serde(rename = "value", default = "Vec::new")]
	pub items: Vec<T>,
	/// Opaque continuation; `None` or empty means there are no more pages.
	#[serde(rename = "nextLink", default, skip_serializing_if = "Option::is_none")]
	pub continuation_token: Option<String>,
}
impl<T> Page<T> {
	/// Creates a page.
	pub fn new(items: Vec<T>, continuation_token: Option<String>) -> Self {
		Self { items, continuation_token }
	}

	/// Creates the final page of a listing.
	pub fn last(items: Vec<T>) -> Self {
		Self::new(items, None)
	}

	/// Continuation for the next fetch, treating an empty token as absent.
	pub fn next_token(&self) -> Option<&str> {
		self.continuation_token.as_deref().filter(|token| !token.is_empty())
	}

	/// Returns `true` when another page follows.
	pub fn has_more(&self) -> bool {
		self.next_token().is_some()
	}

	/// Transforms every item, keeping the continuation.
	pub fn map<U, F>(self, f: F) -> Page<U>
	where
		F: FnMut(T) -> U,
	{
		Page {
			items: self.items.into_iter().map(f).collect(),
			continuation_token: self.continuation_token,
		}
	}
}
impl<T> Page<T>
where
	T: DeserializeOwned,
{
	/// Decodes a `{"value": [...], "nextLink": ...}` document.
	pub fn from_json_slice(body: &[u8]) -> Result<Self> {
		let mut deserializer = serde_json::Deserializer::from_slice(body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| PagingError::Decode { source }.into())
	}

	/// Decodes a successful list response.
	pub fn from_response(response: &HttpResponse) -> Result<Self> {
		if !response.status().is_success() {
			return Err(PagingError::UnexpectedStatus { status: response.status().as_u16() }.into());
		}

		Self::from_json_slice(response.body())
	}
}
impl<T> IntoIterator for Page<T> {
	type IntoIter = std::vec::IntoIter<T>;
	type Item = T;

	fn into_iter(self) -> Self::IntoIter {
		self.items.into_iter()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::http::StatusCode;

	#[derive(Debug, PartialEq, Deserialize)]
	struct SecretItem {
		id: String,
	}

	#[test]
	fn decodes_vault_list_documents() {
		let page = Page::<SecretItem>::from_json_slice(
			br#"{"value":[{"id":"a"},{"id":"b"}],"nextLink":"https://myvault.vault.azure.net/secrets?$skiptoken=2"}"#,
		)
		.expect("List document should decode.");

		assert_eq!(page.items.len(), 2);
		assert_eq!(page.items[1], SecretItem { id: "b".into() });
		assert_eq!(page.next_token(), Some("https://myvault.vault.azure.net/secrets?$skiptoken=2"));

		let last = Page::<SecretItem>::from_json_slice(br#"{"value":[],"nextLink":null}"#)
			.expect("Final page should decode.");

		assert!(!last.has_more());
	}

	#[test]
	fn decode_errors_carry_the_path() {
		let err = Page::<SecretItem>::from_json_slice(br#"{"value":[{"id":7}]}"#)
			.expect_err("Numeric id should not decode.");
		let Error::Paging(PagingError::Decode { source }) = err else {
			panic!("Expected a decode error, got {err:?}.");
		};

		assert_eq!(source.path().to_string(), "value[0].id");
	}

	#[test]
	fn non_success_responses_are_rejected() {
		let mut response = HttpResponse::new(b"{}".to_vec());

		*response.status_mut() = StatusCode::FORBIDDEN;

		assert!(matches!(
			Page::<SecretItem>::from_response(&response),
			Err(Error::Paging(PagingError::UnexpectedStatus { status: 403 }))
		));
	}

	#[test]
	fn map_keeps_the_continuation() {
		let page = Page::new(vec![1, 2], Some("next".into())).map(|n| n * 10);

		assert_eq!(page, Page::new(vec![10, 20], Some("next".into())));
		assert_eq!(page.into_iter().sum::<i32>(), 30);
	}
}
