//! One-shot synchronous pager.

// self
use crate::{
	_prelude::*,
	obs::{self, Component, ObsSpan},
	paging::{BlockingPageRetriever, Cursor, Page},
};

type SharedRetriever<T> = Arc<dyn BlockingPageRetriever<T>>;

/// Lazy, restartable sequence of pages backed by a [`BlockingPageRetriever`].
pub struct BlockingPager<T> {
	retriever: SharedRetriever<T>,
	page_size: Option<u32>,
}
impl<T> BlockingPager<T>
where
	T: 'static,
{
	/// Creates a pager over `retriever`.
	pub fn new<R>(retriever: R) -> Self
	where
		R: 'static + BlockingPageRetriever<T>,
	{
		Self { retriever: Arc::new(retriever), page_size: None }
	}

	/// Creates a pager over a closure.
	pub fn from_fn<F>(f: F) -> Self
	where
		F: 'static + Send + Sync + Fn(Option<String>, Option<u32>) -> Result<Page<T>>,
	{
		Self::new(f)
	}

	/// Requests `page_size` items per page; forwarded verbatim to every fetch.
	pub fn with_page_size(mut self, page_size: u32) -> Self {
		self.page_size = Some(page_size);

		self
	}

	/// Requested page size, if any.
	pub fn page_size(&self) -> Option<u32> {
		self.page_size
	}

	/// Iterator over pages, starting from the first page.
	pub fn pages(&self) -> Pages<T> {
		Pages {
			retriever: self.retriever.clone(),
			page_size: self.page_size,
			cursor: Cursor::Start,
		}
	}

	/// Iterator over items, starting from the first page.
	pub fn items(&self) -> Items<T> {
		Items { pages: self.pages(), current: Vec::new().into_iter() }
	}

	/// Transforms every item as its page is fetched.
	pub fn map<U, F>(self, f: F) -> BlockingPager<U>
	where
		U: 'static,
		F: 'static + Send + Sync + Fn(T) -> U,
	{
		let retriever = self.retriever;

		BlockingPager {
			retriever: Arc::new(move |continuation: Option<String>, page_size: Option<u32>| {
				retriever.fetch(continuation, page_size).map(|page| page.map(&f))
			}),
			page_size: self.page_size,
		}
	}
}
impl<T> Clone for BlockingPager<T> {
	fn clone(&self) -> Self {
		Self { retriever: self.retriever.clone(), page_size: self.page_size }
	}
}
impl<T> Debug for BlockingPager<T> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BlockingPager").field("page_size", &self.page_size).finish()
	}
}

/// Iterator returned by [`BlockingPager::pages`].
pub struct Pages<T> {
	retriever: SharedRetriever<T>,
	page_size: Option<u32>,
	cursor: Cursor,
}
impl<T> Iterator for Pages<T> {
	type Item = Result<Page<T>>;

	fn next(&mut self) -> Option<Self::Item> {
		let continuation = std::mem::replace(&mut self.cursor, Cursor::Done).continuation()?;
		let _span = ObsSpan::new(Component::Pager, "fetch").entered();

		obs::record_page_fetch();

		match self.retriever.fetch(continuation, self.page_size) {
			Ok(page) => {
				self.cursor = Cursor::after(&page);

				Some(Ok(page))
			},
			Err(e) => Some(Err(e)),
		}
	}
}
impl<T> Debug for Pages<T> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Pages").field("cursor", &self.cursor).finish()
	}
}

/// Iterator returned by [`BlockingPager::items`].
pub struct Items<T> {
	pages: Pages<T>,
	current: std::vec::IntoIter<T>,
}
impl<T> Iterator for Items<T> {
	type Item = Result<T>;

	fn next(&mut self) -> Option<Self::Item> {
		loop {
			if let Some(item) = self.current.next() {
				return Some(Ok(item));
			}

			match self.pages.next()? {
				Ok(page) => self.current = page.items.into_iter(),
				Err(e) => return Some(Err(e)),
			}
		}
	}
}
impl<T> Debug for Items<T> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Items").field("pages", &self.pages).finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::error::PagingError;

	fn two_pages(fetches: Arc<AtomicUsize>) -> BlockingPager<u32> {
		BlockingPager::from_fn(move |continuation, _| {
			fetches.fetch_add(1, Ordering::SeqCst);

			Ok(match continuation.as_deref() {
				None => Page::new(vec![1, 2], Some("1".into())),
				Some("1") => Page::last(vec![3]),
				Some(other) => panic!("Unexpected continuation {other}."),
			})
		})
	}

	#[test]
	fn terminates_after_the_last_page_and_restarts() {
		let fetches = Arc::new(AtomicUsize::new(0));
		let pager = two_pages(fetches.clone());

		assert_eq!(pager.pages().count(), 2);
		assert_eq!(fetches.load(Ordering::SeqCst), 2);
		assert_eq!(pager.pages().count(), 2);
		assert_eq!(two_pages(fetches.clone()).pages().count(), 2);
		assert_eq!(fetches.load(Ordering::SeqCst), 6);

		let items = pager.items().collect::<Result<Vec<_>>>().expect("Stub never fails.");

		assert_eq!(items, [1, 2, 3]);
	}

	#[test]
	fn first_item_fetches_one_page() {
		let fetches = Arc::new(AtomicUsize::new(0));
		let counter = fetches.clone();
		let pager = BlockingPager::from_fn(move |continuation: Option<String>, _| {
			let index = continuation.map_or(0, |token| token.parse::<u32>().unwrap_or_default());

			counter.fetch_add(1, Ordering::SeqCst);

			Ok(Page::new(vec![index], (index + 1 < 10_000).then(|| (index + 1).to_string())))
		});
		let first =
			pager.items().next().expect("Listing is not empty.").expect("Stub never fails.");

		assert_eq!(first, 0);
		assert_eq!(fetches.load(Ordering::SeqCst), 1);
		assert_eq!(pager.items().find(|item| matches!(item, Ok(2))).map(|_| ()), Some(()));
		assert_eq!(fetches.load(Ordering::SeqCst), 4);
	}

	#[test]
	fn page_size_is_forwarded_and_items_are_mapped() {
		let pager = BlockingPager::from_fn(|_, page_size: Option<u32>| {
			assert_eq!(page_size, Some(25));

			Ok(Page::last(vec!["a", "b"]))
		})
		.with_page_size(25)
		.map(str::to_uppercase);

		assert_eq!(pager.page_size(), Some(25));
		assert_eq!(
			pager.items().collect::<Result<Vec<_>>>().expect("Stub never fails."),
			["A", "B"],
		);
	}

	#[test]
	fn errors_are_yielded_once() {
		let pager = BlockingPager::<u32>::from_fn(|_, _| {
			Err(PagingError::UnexpectedStatus { status: 500 }.into())
		});
		let mut pages = pager.pages();

		assert!(matches!(pages.next(), Some(Err(Error::Paging(_)))));
		assert!(pages.next().is_none());
	}
}
