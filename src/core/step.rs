use std::{
    cell::Cell,
    time::{Duration, Instant},
};

use log::{debug, error, info};
use uuid::Uuid;

use crate::BatchError;

use super::{
    build_name,
    item::{DefaultProcessor, ItemProcessor, ItemReader, ItemWriter},
};

static DEFAULT_PROCESSOR: DefaultProcessor = DefaultProcessor {};

/// Outcome of reading one chunk.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ChunkStatus {
    /// The chunk reached `chunk_size` items, more input may remain.
    Full,
    /// The reader was exhausted while filling the chunk.
    Finished,
}

/// Overall status of a step, as reported to the job.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum StepStatus {
    Starting,
    Started,
    Success,
    Failed,
}

/// Phase of the chunk loop a step is currently in.
///
/// ```text
/// Idle -> Reading -> Processing -> Flushing -> Reading ... -> Done
///            \____________\_____________\______________________-> Failed
/// ```
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum StepState {
    Idle,
    Reading,
    Processing,
    Flushing,
    Done,
    Failed,
}

/// Snapshot of one step run.
#[derive(Debug, Clone)]
pub struct StepExecution {
    /// Unique identifier for this step instance
    pub id: Uuid,
    /// Human-readable name for the step
    pub name: String,
    pub status: StepStatus,
    pub start_time: Instant,
    pub end_time: Instant,
    pub duration: Duration,
    /// Number of items successfully read
    pub read_count: usize,
    /// Number of items successfully written
    pub write_count: usize,
    /// Number of chunks handed to the writer and committed
    pub commit_count: usize,
    pub read_error_count: usize,
    pub process_error_count: usize,
    pub write_error_count: usize,
    /// Number of items discarded before the first chunk on restart
    pub skip_count: usize,
}

/// A unit of work inside a job.
pub trait Step {
    /// Executes the step.
    ///
    /// # Returns
    /// - `Ok(StepExecution)`: every chunk was committed
    /// - `Err(BatchError)`: the step stopped at the first failing chunk
    fn execute(&self) -> Result<StepExecution, BatchError>;

    fn get_name(&self) -> &str;

    fn get_status(&self) -> StepStatus;
}

/// Chunk-oriented step: read up to `chunk_size` items, process each of them,
/// then hand the whole chunk to the writer as one unit of work.
///
/// There is no skip or retry policy. The first read, process or write error
/// fails the step; chunks written before it stay written.
pub struct StepInstance<'a, R, W> {
    id: Uuid,
    name: String,
    reader: &'a dyn ItemReader<R>,
    processor: &'a dyn ItemProcessor<R, W>,
    writer: &'a dyn ItemWriter<W>,
    chunk_size: usize,
    start_after: usize,
    state: Cell<StepState>,
    status: Cell<StepStatus>,
    read_count: Cell<usize>,
    write_count: Cell<usize>,
    commit_count: Cell<usize>,
    read_error_count: Cell<usize>,
    process_error_count: Cell<usize>,
    write_error_count: Cell<usize>,
    skip_count: Cell<usize>,
}

impl<R, W> Step for StepInstance<'_, R, W> {
    fn execute(&self) -> Result<StepExecution, BatchError> {
        let start_time = Instant::now();

        info!("Start of step: {}, id: {}", self.name, self.id);
        self.status.set(StepStatus::Started);

        let result = self.run_chunks();

        // The writer is closed whatever the outcome; the first error wins.
        let result = match (result, self.writer.close()) {
            (Err(err), _) => Err(err),
            (Ok(()), close) => close,
        };

        match result {
            Ok(()) => {
                self.transition(StepState::Done);
                self.status.set(StepStatus::Success);
                info!(
                    "End of step: {}, read: {}, written: {}, commits: {}",
                    self.name,
                    self.read_count.get(),
                    self.write_count.get(),
                    self.commit_count.get()
                );
                Ok(self.to_execution(start_time))
            }
            Err(err) => {
                self.transition(StepState::Failed);
                self.status.set(StepStatus::Failed);
                error!("Step {} failed: {}", self.name, err);
                Err(err)
            }
        }
    }

    fn get_name(&self) -> &str {
        &self.name
    }

    fn get_status(&self) -> StepStatus {
        self.status.get()
    }
}

impl<R, W> StepInstance<'_, R, W> {
    pub fn get_id(&self) -> Uuid {
        self.id
    }

    pub fn get_state(&self) -> StepState {
        self.state.get()
    }

    pub fn get_read_count(&self) -> usize {
        self.read_count.get()
    }

    pub fn get_write_count(&self) -> usize {
        self.write_count.get()
    }

    pub fn get_commit_count(&self) -> usize {
        self.commit_count.get()
    }

    pub fn get_read_error_count(&self) -> usize {
        self.read_error_count.get()
    }

    pub fn get_process_error_count(&self) -> usize {
        self.process_error_count.get()
    }

    pub fn get_write_error_count(&self) -> usize {
        self.write_error_count.get()
    }

    pub fn get_skip_count(&self) -> usize {
        self.skip_count.get()
    }

    fn run_chunks(&self) -> Result<(), BatchError> {
        self.writer.open()?;

        if !self.skip_committed_items()? {
            return Ok(());
        }

        loop {
            self.transition(StepState::Reading);
            let (read_items, chunk_status) = self.read_chunk()?;

            // An exhausted reader with nothing buffered has nothing to flush.
            if read_items.is_empty() {
                return Ok(());
            }

            self.transition(StepState::Processing);
            let processed_items = self.process_chunk(&read_items)?;
            drop(read_items);

            self.transition(StepState::Flushing);
            self.write_chunk(&processed_items)?;

            if chunk_status == ChunkStatus::Finished {
                return Ok(());
            }
        }
    }

    /// Discards the items a previous run already committed.
    ///
    /// Returns `false` when the reader ran out before the restart point.
    fn skip_committed_items(&self) -> Result<bool, BatchError> {
        if self.start_after == 0 {
            return Ok(true);
        }

        debug!("Skipping {} already committed items", self.start_after);
        while self.skip_count.get() < self.start_after {
            match self.reader.read() {
                Ok(Some(_)) => self.skip_count.set(self.skip_count.get() + 1),
                Ok(None) => return Ok(false),
                Err(err) => {
                    self.read_error_count.set(self.read_error_count.get() + 1);
                    return Err(err);
                }
            }
        }
        Ok(true)
    }

    fn read_chunk(&self) -> Result<(Vec<R>, ChunkStatus), BatchError> {
        debug!("Start reading chunk");
        let mut read_items = Vec::with_capacity(self.chunk_size);

        while read_items.len() < self.chunk_size {
            match self.reader.read() {
                Ok(Some(item)) => {
                    read_items.push(item);
                    self.read_count.set(self.read_count.get() + 1);
                }
                Ok(None) => {
                    debug!("End reading chunk: FINISHED ({} items)", read_items.len());
                    return Ok((read_items, ChunkStatus::Finished));
                }
                Err(err) => {
                    self.read_error_count.set(self.read_error_count.get() + 1);
                    error!("Error occured during read item: {}", err);
                    return Err(err);
                }
            }
        }

        debug!("End reading chunk: FULL");
        Ok((read_items, ChunkStatus::Full))
    }

    fn process_chunk(&self, read_items: &[R]) -> Result<Vec<W>, BatchError> {
        debug!("Start processing chunk");
        let mut processed_items = Vec::with_capacity(read_items.len());

        for item in read_items {
            match self.processor.process(item) {
                Ok(processed) => processed_items.push(processed),
                Err(err) => {
                    self.process_error_count
                        .set(self.process_error_count.get() + 1);
                    error!("Error occured during process item: {}", err);
                    return Err(err);
                }
            }
        }

        debug!("End processing chunk");
        Ok(processed_items)
    }

    fn write_chunk(&self, processed_items: &[W]) -> Result<(), BatchError> {
        debug!("Start writing chunk of {} items", processed_items.len());

        match self.writer.write(processed_items) {
            Ok(written) => {
                self.write_count.set(self.write_count.get() + written);
                self.commit_count.set(self.commit_count.get() + 1);
                debug!("End writing chunk");
                Ok(())
            }
            Err(err) => {
                self.write_error_count
                    .set(self.write_error_count.get() + processed_items.len());
                error!("ItemWriter error: {}", err);
                Err(err)
            }
        }
    }

    fn transition(&self, next: StepState) {
        debug!("Step {}: {:?} -> {:?}", self.name, self.state.get(), next);
        self.state.set(next);
    }

    fn to_execution(&self, start_time: Instant) -> StepExecution {
        StepExecution {
            id: self.id,
            name: self.name.clone(),
            status: self.status.get(),
            start_time,
            end_time: Instant::now(),
            duration: start_time.elapsed(),
            read_count: self.read_count.get(),
            write_count: self.write_count.get(),
            commit_count: self.commit_count.get(),
            read_error_count: self.read_error_count.get(),
            process_error_count: self.process_error_count.get(),
            write_error_count: self.write_error_count.get(),
            skip_count: self.skip_count.get(),
        }
    }
}

/// Builder for a chunk-oriented [`StepInstance`].
///
/// A reader, a processor and a writer are required. Use
/// [`StepBuilder::pass_through`] when items are written as they are read.
pub struct StepBuilder<'a, R, W> {
    name: Option<String>,
    reader: Option<&'a dyn ItemReader<R>>,
    processor: Option<&'a dyn ItemProcessor<R, W>>,
    writer: Option<&'a dyn ItemWriter<W>>,
    chunk_size: usize,
    start_after: usize,
}

impl<R, W> Default for StepBuilder<'_, R, W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, R, W> StepBuilder<'a, R, W> {
    pub fn new() -> StepBuilder<'a, R, W> {
        Self {
            name: None,
            reader: None,
            processor: None,
            writer: None,
            chunk_size: 1,
            start_after: 0,
        }
    }

    pub fn name(mut self, name: String) -> StepBuilder<'a, R, W> {
        self.name = Some(name);
        self
    }

    pub fn reader(mut self, reader: &'a impl ItemReader<R>) -> StepBuilder<'a, R, W> {
        self.reader = Some(reader);
        self
    }

    pub fn processor(mut self, processor: &'a impl ItemProcessor<R, W>) -> StepBuilder<'a, R, W> {
        self.processor = Some(processor);
        self
    }

    pub fn writer(mut self, writer: &'a impl ItemWriter<W>) -> StepBuilder<'a, R, W> {
        self.writer = Some(writer);
        self
    }

    /// Sets the commit interval: how many items go into one chunk.
    pub fn chunk(mut self, chunk_size: usize) -> StepBuilder<'a, R, W> {
        self.chunk_size = chunk_size;
        self
    }

    /// Discards the first `items` items of the reader before the first chunk.
    pub fn start_after(mut self, items: usize) -> StepBuilder<'a, R, W> {
        self.start_after = items;
        self
    }

    pub fn build(self) -> Result<StepInstance<'a, R, W>, BatchError> {
        let reader = self
            .reader
            .ok_or_else(|| BatchError::Configuration("a step requires a reader".to_string()))?;
        let processor = self
            .processor
            .ok_or_else(|| BatchError::Configuration("a step requires a processor".to_string()))?;
        let writer = self
            .writer
            .ok_or_else(|| BatchError::Configuration("a step requires a writer".to_string()))?;

        if self.chunk_size == 0 {
            return Err(BatchError::Configuration(
                "chunk size must be greater than zero".to_string(),
            ));
        }

        Ok(StepInstance {
            id: Uuid::new_v4(),
            name: self.name.unwrap_or_else(build_name),
            reader,
            processor,
            writer,
            chunk_size: self.chunk_size,
            start_after: self.start_after,
            state: Cell::new(StepState::Idle),
            status: Cell::new(StepStatus::Starting),
            read_count: Cell::new(0),
            write_count: Cell::new(0),
            commit_count: Cell::new(0),
            read_error_count: Cell::new(0),
            process_error_count: Cell::new(0),
            write_error_count: Cell::new(0),
            skip_count: Cell::new(0),
        })
    }
}

impl<'a, R: Clone> StepBuilder<'a, R, R> {
    /// Uses [`DefaultProcessor`]: items are written exactly as they were read.
    pub fn pass_through(mut self) -> StepBuilder<'a, R, R> {
        self.processor = Some(&DEFAULT_PROCESSOR);
        self
    }
}
