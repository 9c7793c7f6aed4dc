use crate::error::BatchError;

/// Result of reading one item: `Ok(None)` once the source is exhausted.
pub type ItemReaderResult<R> = Result<Option<R>, BatchError>;

/// Result of processing one item.
pub type ItemProcessorResult<W> = Result<W, BatchError>;

/// Result of writing a chunk: the number of items written.
pub type ItemWriterResult = Result<usize, BatchError>;

/// Retrieval of input for a step, one item at a time.
pub trait ItemReader<R> {
    /// Reads the next item.
    ///
    /// # Returns
    /// - `Ok(Some(item))` when an item was read
    /// - `Ok(None)` when there is nothing left to read
    /// - `Err(BatchError)` when the next item could not be read
    fn read(&self) -> ItemReaderResult<R>;
}

/// Business logic applied to each item between read and write.
pub trait ItemProcessor<R, W> {
    fn process(&self, item: &R) -> ItemProcessorResult<W>;
}

/// Output of a step, one chunk at a time.
///
/// Each call to [`ItemWriter::write`] is one unit of work: either every item
/// of the chunk is persisted or none is.
pub trait ItemWriter<W> {
    fn write(&self, items: &[W]) -> ItemWriterResult;

    fn open(&self) -> Result<(), BatchError> {
        Ok(())
    }

    fn close(&self) -> Result<(), BatchError> {
        Ok(())
    }
}

/// Pass-through processor, installed by `StepBuilder::pass_through`.
#[derive(Default)]
pub struct DefaultProcessor {}

impl<R: Clone> ItemProcessor<R, R> for DefaultProcessor {
    fn process(&self, item: &R) -> ItemProcessorResult<R> {
        Ok(item.clone())
    }
}
