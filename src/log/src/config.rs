use serde::{Deserialize, Serialize};

use crate::chunk::compression::Compression;
use crate::chunk::DEFAULT_CHANNEL;
use crate::error::LogError;

/// DEFAULT_CHUNK_ROWS is the number of samples packed into each chunk.
pub const DEFAULT_CHUNK_ROWS: usize = 10_001;

/// WriterOptions configures how chunks are encoded.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WriterOptions {
    /// The channel name recorded in every chunk header.
    pub channel: String,
    pub compression: Compression,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
            compression: Compression::None,
        }
    }
}

impl WriterOptions {
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.channel.is_empty() {
            return Err(LogError::InvalidOption("channel must not be empty".to_string()).into());
        }
        Ok(())
    }
}

/// ConvertOptions configures how a row source is batched into chunks.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConvertOptions {
    pub chunk_rows: usize,

    /// Stop after this many chunks and finish the file, leaving the rest of
    /// the source unread.
    pub max_chunks: Option<usize>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            chunk_rows: DEFAULT_CHUNK_ROWS,
            max_chunks: None,
        }
    }
}

impl ConvertOptions {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.chunk_rows == 0 {
            return Err(LogError::InvalidOption("chunk_rows must be positive".to_string()).into());
        }
        if self.max_chunks == Some(0) {
            return Err(LogError::InvalidOption("max_chunks must be positive".to_string()).into());
        }
        Ok(())
    }
}
