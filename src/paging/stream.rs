//! Reactive pager backed by [`futures::Stream`].

// crates.io
use futures::{
	StreamExt, TryStreamExt,
	stream::{self, BoxStream},
};
use tokio::{runtime::Handle, sync::mpsc};
// self
use crate::{
	_prelude::*,
	obs::{self, Component, ObsSpan},
	paging::{Cursor, Page, PageRetriever},
};

type SharedRetriever<T> = Arc<dyn PageRetriever<T>>;

/// Stream of pages returned by [`Pager::pages`].
pub type PageStream<T> = BoxStream<'static, Result<Page<T>>>;
/// Stream of items returned by [`Pager::items`].
pub type ItemStream<T> = BoxStream<'static, Result<T>>;

/// Lazy, restartable sequence of pages backed by a [`PageRetriever`].
///
/// Streams produced with a non-zero prefetch spawn their producer on the current Tokio runtime
/// when first polled. Polled outside a runtime, they fetch inline as if prefetch were `0`.
pub struct Pager<T> {
	retriever: SharedRetriever<T>,
	page_size: Option<u32>,
	prefetch: usize,
}
impl<T> Pager<T>
where
	T: 'static + Send,
{
	/// Creates a pager over `retriever`.
	pub fn new<R>(retriever: R) -> Self
	where
		R: 'static + PageRetriever<T>,
	{
		Self { retriever: Arc::new(retriever), page_size: None, prefetch: 0 }
	}

	/// Creates a pager over an async closure.
	pub fn from_fn<F, Fut>(f: F) -> Self
	where
		F: 'static + Send + Sync + Fn(Option<String>, Option<u32>) -> Fut,
		Fut: 'static + Send + Future<Output = Result<Page<T>>>,
	{
		Self::new(f)
	}

	/// Requests `page_size` items per page; forwarded verbatim to every fetch.
	pub fn with_page_size(mut self, page_size: u32) -> Self {
		self.page_size = Some(page_size);

		self
	}

	/// Reads up to `prefetch` pages ahead of the consumer (defaults to `0`).
	pub fn with_prefetch(mut self, prefetch: usize) -> Self {
		self.prefetch = prefetch;

		self
	}

	/// Requested page size, if any.
	pub fn page_size(&self) -> Option<u32> {
		self.page_size
	}

	/// Number of pages fetched ahead of the consumer.
	pub fn prefetch(&self) -> usize {
		self.prefetch
	}

	/// Stream of pages, starting from the first page.
	pub fn pages(&self) -> PageStream<T> {
		let retriever = self.retriever.clone();
		let page_size = self.page_size;

		if self.prefetch == 0 {
			return stream::try_unfold(Cursor::Start, move |cursor| {
				advance(retriever.clone(), cursor, page_size)
			})
			.boxed();
		}

		let prefetch = self.prefetch;

		stream::unfold(Prefetch::Idle(retriever, page_size, prefetch), |state| async move {
			match state {
				Prefetch::Idle(retriever, page_size, prefetch) =>
					match spawn_producer(retriever.clone(), page_size, prefetch) {
						Some(receiver) => next_buffered(receiver).await,
						None => next_inline(retriever, Cursor::Start, page_size).await,
					},
				Prefetch::Running(receiver) => next_buffered(receiver).await,
				Prefetch::Inline(retriever, cursor, page_size) =>
					next_inline(retriever, cursor, page_size).await,
			}
		})
		.boxed()
	}

	/// Stream of items, starting from the first page.
	pub fn items(&self) -> ItemStream<T> {
		self.pages()
			.map_ok(|page| stream::iter(page.items.into_iter().map(Ok::<T, Error>)))
			.try_flatten()
			.boxed()
	}

	/// Transforms every item as its page is fetched.
	pub fn map<U, F>(self, f: F) -> Pager<U>
	where
		U: 'static + Send,
		F: 'static + Send + Sync + Fn(T) -> U,
	{
		Pager {
			retriever: Arc::new(MappedRetriever { inner: self.retriever, f }),
			page_size: self.page_size,
			prefetch: self.prefetch,
		}
	}
}
impl<T> Clone for Pager<T> {
	fn clone(&self) -> Self {
		Self {
			retriever: self.retriever.clone(),
			page_size: self.page_size,
			prefetch: self.prefetch,
		}
	}
}
impl<T> Debug for Pager<T> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Pager")
			.field("page_size", &self.page_size)
			.field("prefetch", &self.prefetch)
			.finish()
	}
}

enum Prefetch<T> {
	Idle(SharedRetriever<T>, Option<u32>, usize),
	Running(mpsc::Receiver<Result<Page<T>>>),
	Inline(SharedRetriever<T>, Cursor, Option<u32>),
}

type PrefetchStep<T> = Option<(Result<Page<T>>, Prefetch<T>)>;

struct MappedRetriever<T, F> {
	inner: SharedRetriever<T>,
	f: F,
}
impl<T, U, F> PageRetriever<U> for MappedRetriever<T, F>
where
	T: 'static,
	F: Send + Sync + Fn(T) -> U,
{
	fn fetch(
		&self,
		continuation: Option<String>,
		page_size: Option<u32>,
	) -> crate::paging::PageFuture<'_, U> {
		let page = self.inner.fetch(continuation, page_size);

		Box::pin(async move { page.await.map(|page| page.map(&self.f)) })
	}
}

async fn advance<T>(
	retriever: SharedRetriever<T>,
	cursor: Cursor,
	page_size: Option<u32>,
) -> Result<Option<(Page<T>, Cursor)>> {
	let Some(continuation) = cursor.continuation() else {
		return Ok(None);
	};
	let page = fetch(&retriever, continuation, page_size).await?;
	let next = Cursor::after(&page);

	Ok(Some((page, next)))
}

async fn fetch<T>(
	retriever: &SharedRetriever<T>,
	continuation: Option<String>,
	page_size: Option<u32>,
) -> Result<Page<T>> {
	obs::record_page_fetch();

	ObsSpan::new(Component::Pager, "fetch")
		.instrument(retriever.fetch(continuation, page_size))
		.await
}

async fn next_buffered<T>(mut receiver: mpsc::Receiver<Result<Page<T>>>) -> PrefetchStep<T> {
	receiver.recv().await.map(|page| (page, Prefetch::Running(receiver)))
}

async fn next_inline<T>(
	retriever: SharedRetriever<T>,
	cursor: Cursor,
	page_size: Option<u32>,
) -> PrefetchStep<T> {
	match advance(retriever.clone(), cursor, page_size).await {
		Ok(Some((page, next))) => Some((Ok(page), Prefetch::Inline(retriever, next, page_size))),
		Ok(None) => None,
		Err(e) => Some((Err(e), Prefetch::Inline(retriever, Cursor::Done, page_size))),
	}
}

// A page waiting for channel capacity counts against the bound, hence `prefetch + 1`.
// Returns `None` when no Tokio runtime is available to run the producer.
fn spawn_producer<T>(
	retriever: SharedRetriever<T>,
	page_size: Option<u32>,
	prefetch: usize,
) -> Option<mpsc::Receiver<Result<Page<T>>>>
where
	T: 'static + Send,
{
	let runtime = Handle::try_current().ok()?;
	let (sender, receiver) = mpsc::channel(prefetch);

	runtime.spawn(async move {
		let mut cursor = Cursor::Start;

		while let Some(continuation) = cursor.continuation() {
			let fetched = fetch(&retriever, continuation, page_size).await;

			cursor = match &fetched {
				Ok(page) => Cursor::after(page),
				Err(_) => Cursor::Done,
			};

			if sender.send(fetched).await.is_err() {
				break;
			}
		}
	});

	Some(receiver)
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use futures::future::{self, Ready};
	use tokio::time::{self, Duration as StdDuration};
	// self
	use super::*;
	use crate::error::PagingError;

	fn ready(page: Page<u32>) -> Ready<Result<Page<u32>>> {
		future::ready(Ok(page))
	}

	fn index_of(continuation: Option<String>) -> u32 {
		continuation.map_or(0, |token| token.parse().unwrap_or_default())
	}

	fn numbered(fetches: Arc<AtomicUsize>, pages: u32, per_page: usize) -> Pager<u32> {
		Pager::from_fn(move |continuation, _| {
			let index = index_of(continuation);

			fetches.fetch_add(1, Ordering::SeqCst);

			let next = (index + 1 < pages).then(|| (index + 1).to_string());

			ready(Page::new(vec![index; per_page], next))
		})
	}

	#[tokio::test]
	async fn terminates_after_the_last_page_and_restarts() {
		let fetches = Arc::new(AtomicUsize::new(0));

		for prefetch in [0, 3] {
			let pager = numbered(fetches.clone(), 2, 2).with_prefetch(prefetch);

			assert_eq!(pager.pages().count().await, 2);
			assert_eq!(pager.pages().count().await, 2);
			let fresh = numbered(fetches.clone(), 2, 2).with_prefetch(prefetch);

			assert_eq!(fresh.pages().count().await, 2);
		}

		assert_eq!(fetches.load(Ordering::SeqCst), 12);
	}

	#[tokio::test]
	async fn first_item_without_prefetch_fetches_one_page() {
		let fetches = Arc::new(AtomicUsize::new(0));
		let first = numbered(fetches.clone(), 10_000, 1)
			.items()
			.next()
			.await
			.expect("Listing is not empty.")
			.expect("Stub never fails.");

		assert_eq!(first, 0);
		assert_eq!(fetches.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn prefetch_stays_within_its_bound() {
		let fetches = Arc::new(AtomicUsize::new(0));
		let mut items = numbered(fetches.clone(), 10_000, 1).with_prefetch(2).items();

		items.next().await.expect("Listing is not empty.").expect("Stub never fails.");
		// Let the producer fill the channel.
		time::sleep(StdDuration::from_millis(50)).await;

		let fetched = fetches.load(Ordering::SeqCst);

		assert!((1..=4).contains(&fetched), "fetched {fetched} pages for one consumed");

		drop(items);
		time::sleep(StdDuration::from_millis(50)).await;

		assert!(fetches.load(Ordering::SeqCst) <= 5);
	}

	#[tokio::test]
	async fn concurrent_consumers_share_one_producer() {
		let fetches = Arc::new(AtomicUsize::new(0));
		let seen = Arc::new(AtomicUsize::new(0));

		numbered(fetches.clone(), 20, 3)
			.with_prefetch(4)
			.items()
			.try_for_each_concurrent(8, |_| {
				let seen = seen.clone();

				async move {
					seen.fetch_add(1, Ordering::SeqCst);
					time::sleep(StdDuration::from_millis(1)).await;

					Ok::<(), Error>(())
				}
			})
			.await
			.expect("Stub never fails.");

		assert_eq!(seen.load(Ordering::SeqCst), 60);
		assert_eq!(fetches.load(Ordering::SeqCst), 20);
	}

	#[test]
	fn prefetch_without_a_runtime_fetches_inline() {
		let fetches = Arc::new(AtomicUsize::new(0));
		let pager = numbered(fetches.clone(), 3, 2).with_prefetch(2);
		let items = futures::executor::block_on(pager.items().try_collect::<Vec<_>>())
			.expect("Stub never fails.");

		assert_eq!(items, [0, 0, 1, 1, 2, 2]);
		assert_eq!(fetches.load(Ordering::SeqCst), 3);

		let mut pages = pager.pages();
		let first = futures::executor::block_on(pages.next())
			.expect("Listing is not empty.")
			.expect("Stub never fails.");

		assert_eq!(first.items, [0, 0]);
		assert_eq!(fetches.load(Ordering::SeqCst), 4);
	}

	#[tokio::test]
	async fn page_size_is_forwarded_and_items_are_mapped() {
		let pager = Pager::from_fn(|_, page_size: Option<u32>| {
			ready(Page::last(vec![page_size.unwrap_or_default()]))
		})
		.with_page_size(25)
		.map(|size| size * 2);
		let items = pager.items().try_collect::<Vec<_>>().await.expect("Stub never fails.");

		assert_eq!(items, [50]);
	}

	#[tokio::test]
	async fn errors_are_yielded_once() {
		for prefetch in [0, 1] {
			let pager = Pager::<u32>::from_fn(|_, _| {
				future::ready(Err(PagingError::UnexpectedStatus { status: 503 }.into()))
			})
			.with_prefetch(prefetch);
			let pages = pager.pages().collect::<Vec<_>>().await;

			assert_eq!(pages.len(), 1);
			assert!(matches!(pages[0], Err(Error::Paging(_))));
		}
	}
}
