use thiserror::Error;

#[derive(Error, Debug)]
/// Batch error
pub enum BatchError {
    /// A line could not be turned into an item (field count, type conversion, malformed input).
    #[error("ItemReader from: {0}")]
    ItemReader(String),

    #[error("ItemProcessor from: {0}")]
    ItemProcessor(String),

    /// A chunk could not be persisted; its transaction was rolled back.
    #[error("ItemWriter from: {0}")]
    ItemWriter(String),

    /// The named step did not complete; `source` is the error that stopped it.
    #[error("Step {name} failed: {source}")]
    Step {
        name: String,
        #[source]
        source: Box<BatchError>,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
