//! Chunked concurrent iteration used by the bulk helpers.

use std::future::Future;
use std::num::NonZeroUsize;

use futures::stream::{FuturesUnordered, StreamExt};

pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Maximum number of operations in flight at once. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchSize(NonZeroUsize);

impl BatchSize {
    /// A zero size is raised to one.
    pub fn new(size: usize) -> Self {
        Self(NonZeroUsize::new(size).unwrap_or(NonZeroUsize::MIN))
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for BatchSize {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl From<usize> for BatchSize {
    fn from(size: usize) -> Self {
        Self::new(size)
    }
}

impl From<NonZeroUsize> for BatchSize {
    fn from(size: NonZeroUsize) -> Self {
        Self(size)
    }
}

/// Outcome of a batch that stopped on an error.
#[derive(Debug)]
pub struct BatchFailure<E> {
    /// Items that completed successfully before the batch stopped
    pub succeeded: usize,
    /// First error observed, in completion order
    pub error: E,
}

/// Apply `f` to every item, at most `batch` at a time.
///
/// Items are taken in order in chunks of `batch`; all operations of a chunk
/// start together and the whole chunk finishes before the next one starts.
/// After a failure the rest of the current chunk is still awaited, no further
/// chunk is started, and the first error is returned together with the number
/// of items that succeeded. Work already done is not undone.
pub async fn batched_for_each<I, F, Fut, E>(
    items: I,
    batch: impl Into<BatchSize>,
    mut f: F,
) -> Result<usize, BatchFailure<E>>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let size = batch.into().get();
    let mut items = items.into_iter();
    let mut succeeded = 0;

    loop {
        let mut chunk: FuturesUnordered<Fut> = items.by_ref().take(size).map(&mut f).collect();
        if chunk.is_empty() {
            return Ok(succeeded);
        }

        let mut first_error = None;
        while let Some(result) = chunk.next().await {
            match result {
                Ok(()) => succeeded += 1,
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(error) = first_error {
            return Err(BatchFailure { succeeded, error });
        }
    }
}
