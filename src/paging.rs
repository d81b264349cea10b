//! Continuation-token paging for list operations.
//!
//! A list operation is described by a page retriever: given the continuation token of the previous
//! page (`None` for the first) and an optional page size, it returns one [`Page`]. Pagers turn a
//! retriever into lazy sequences of pages or items.
//!
//! - [`BlockingPager`] yields [`Iterator`]s with exactly one page in flight; nothing is fetched
//!   until the consumer advances past the current page.
//! - [`Pager`] yields [`Stream`](futures::Stream)s. With the default prefetch of `0` fetches are
//!   driven by polling alone. With [`Pager::with_prefetch`] a single producer task reads ahead into
//!   a bounded channel, so a stream never fetches more than `pages consumed + prefetch + 1` pages.
//!
//! Sequences end at the first page whose continuation token is missing or empty. A failed fetch is
//! yielded once and ends the sequence. Every call to `pages()`/`items()` starts over from the
//! first page.

mod blocking;
mod page;
mod stream;

pub use blocking::*;
pub use page::*;
pub use stream::*;

// self
use crate::_prelude::*;

/// Boxed future returned by [`PageRetriever::fetch`].
pub type PageFuture<'a, T> = Pin<Box<dyn Future<Output = Result<Page<T>>> + 'a + Send>>;

/// Asynchronous page-fetch capability.
///
/// Closures of shape `Fn(Option<String>, Option<u32>) -> impl Future<Output = Result<Page<T>>>`
/// implement this trait; see [`Pager::from_fn`].
pub trait PageRetriever<T>
where
	Self: Send + Sync,
{
	/// Fetches the page following `continuation` (`None` for the first page).
	fn fetch(&self, continuation: Option<String>, page_size: Option<u32>) -> PageFuture<'_, T>;
}
impl<T, F, Fut> PageRetriever<T> for F
where
	F: Send + Sync + Fn(Option<String>, Option<u32>) -> Fut,
	Fut: 'static + Send + Future<Output = Result<Page<T>>>,
{
	fn fetch(&self, continuation: Option<String>, page_size: Option<u32>) -> PageFuture<'_, T> {
		Box::pin(self(continuation, page_size))
	}
}

/// Blocking page-fetch capability.
pub trait BlockingPageRetriever<T>
where
	Self: Send + Sync,
{
	/// Fetches the page following `continuation` (`None` for the first page).
	fn fetch(&self, continuation: Option<String>, page_size: Option<u32>) -> Result<Page<T>>;
}
impl<T, F> BlockingPageRetriever<T> for F
where
	F: Send + Sync + Fn(Option<String>, Option<u32>) -> Result<Page<T>>,
{
	fn fetch(&self, continuation: Option<String>, page_size: Option<u32>) -> Result<Page<T>> {
		self(continuation, page_size)
	}
}

// Position of a traversal.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Cursor {
	Start,
	Next(String),
	Done,
}
impl Cursor {
	fn after<T>(page: &Page<T>) -> Self {
		match page.next_token() {
			Some(token) => Cursor::Next(token.to_owned()),
			None => Cursor::Done,
		}
	}

	// Continuation to fetch with, or `None` once the traversal is over.
	fn continuation(self) -> Option<Option<String>> {
		match self {
			Cursor::Start => Some(None),
			Cursor::Next(token) => Some(Some(token)),
			Cursor::Done => None,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn cursor_follows_continuation_tokens() {
		assert_eq!(Cursor::Start.continuation(), Some(None));
		assert_eq!(Cursor::Next("2".into()).continuation(), Some(Some("2".into())));
		assert_eq!(Cursor::Done.continuation(), None);
		assert_eq!(Cursor::after(&Page::new(vec![1], Some("2".into()))), Cursor::Next("2".into()));
		assert_eq!(Cursor::after(&Page::new(vec![1], Some(String::new()))), Cursor::Done);
		assert_eq!(Cursor::after(&Page::<u8>::new(Vec::new(), None)), Cursor::Done);
	}
}
