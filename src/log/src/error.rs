use thiserror::Error;

/// LogError classifies the failures callers may want to match on. IO errors
/// travel as plain `anyhow` errors with context.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("chunk batch is empty")]
    EmptyBatch,

    #[error("row {row} does not match the chunk schema: {reason}")]
    SchemaMismatch { row: usize, reason: String },

    #[error("the meta block has already been written")]
    Finished,

    #[error("log closed before the meta block was written")]
    Incomplete,

    #[error("not a VIAEMSLOG1 file")]
    BadMagic,

    #[error("bad meta block: {0}")]
    BadMetaBlock(String),

    #[error("bad chunk at offset {offset}: {reason}")]
    BadChunk { offset: u64, reason: String },

    #[error("unknown compression '{0}', expected one of none, snappy, gzip")]
    UnknownCompression(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),
}
