use std::path::Path;

use common_base::sample::Sample;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::chunk::encoder::{encode_chunk, EncodedChunk};
use crate::config::WriterOptions;
use crate::error::LogError;
use crate::file::index::{IndexEntries, IndexEntry};
use crate::file::meta::write_meta_block;
use crate::file::writer::chunk_writer::{write_chunk, ChunkLocation};
use crate::file::writer::SyncWrite;
use crate::file::{FSYNC_EVERY, HEADER_SIZE, MAGIC};

/// LogWriter writes VIAEMSLOG formatted chunks and the meta block.
#[async_trait]
pub trait LogWriter {
    /// write encodes samples as one chunk and appends it. The caller is
    /// responsible for passing samples in time order; the first and last
    /// timestamps are used as the bounds of the chunk's index entry.
    async fn write(&mut self, samples: &[Sample]) -> anyhow::Result<ChunkLocation>;

    /// write_chunk appends an already encoded chunk and records it in the index.
    async fn write_chunk(&mut self, chunk: &EncodedChunk) -> anyhow::Result<ChunkLocation>;

    /// write_meta writes the meta block holding the index of every chunk
    /// written so far. Nothing can be written after it.
    async fn write_meta(&mut self) -> anyhow::Result<()>;

    /// close flushes and releases the stream. Closing before the meta block
    /// has been written returns `LogError::Incomplete`.
    async fn close(self) -> anyhow::Result<()>;

    /// index returns the entries recorded so far.
    fn index(&self) -> &IndexEntries;

    /// size returns the current size in bytes of the file.
    fn size(&self) -> u64;

    /// is_finished returns true once the meta block has been written.
    fn is_finished(&self) -> bool;
}

pub struct DefaultLogWriter<W>
where
    W: SyncWrite,
{
    w: W,
    options: WriterOptions,

    index: IndexEntries,
    n: u64,
    finished: bool,

    // The bytes written count of when we last fsync'd
    last_sync: u64,
}

impl DefaultLogWriter<BufWriter<tokio::fs::File>> {
    /// create opens path for writing, replacing any existing file.
    pub async fn create(path: impl AsRef<Path>, options: WriterOptions) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let fd = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(path)
            .await
            .map_err(|e| anyhow!("create: {}: {}", path.display(), e))?;

        Self::new(BufWriter::with_capacity(1024 * 1024, fd), options)
    }
}

impl<W> DefaultLogWriter<W>
where
    W: SyncWrite,
{
    pub fn new(w: W, options: WriterOptions) -> anyhow::Result<Self> {
        options.validate()?;

        Ok(Self {
            w,
            options,
            index: IndexEntries::new(),
            n: 0,
            finished: false,
            last_sync: 0,
        })
    }

    /// into_inner flushes and returns the stream of a finished log.
    pub async fn into_inner(mut self) -> anyhow::Result<W> {
        if !self.finished {
            return Err(LogError::Incomplete.into());
        }
        self.sync().await?;
        Ok(self.w)
    }

    async fn write_header(&mut self) -> anyhow::Result<()> {
        self.w
            .write_all(&MAGIC)
            .await
            .map_err(|e| anyhow!("write: magic error: {}", e))?;
        self.n = HEADER_SIZE;

        Ok(())
    }

    async fn sync(&mut self) -> anyhow::Result<()> {
        self.w.sync().await.map_err(|e| anyhow!(e))
    }
}

#[async_trait]
impl<W> LogWriter for DefaultLogWriter<W>
where
    W: SyncWrite,
{
    async fn write(&mut self, samples: &[Sample]) -> anyhow::Result<ChunkLocation> {
        if self.finished {
            return Err(LogError::Finished.into());
        }

        let chunk = encode_chunk(
            self.options.channel.as_str(),
            samples,
            self.options.compression,
        )
        .await?;

        self.write_chunk(&chunk).await
    }

    async fn write_chunk(&mut self, chunk: &EncodedChunk) -> anyhow::Result<ChunkLocation> {
        if self.finished {
            return Err(LogError::Finished.into());
        }

        // Write header only after we have some data to write.
        if self.n == 0 {
            self.write_header().await?;
        }

        let location = write_chunk(&mut self.w, self.n, chunk).await?;

        // Record this chunk in index
        self.index.push(IndexEntry::new(
            chunk.min_time,
            chunk.max_time,
            location.offset,
            location.size,
        ));

        // Increment file position pointer
        self.n += location.size;

        tracing::debug!(
            "chunk {} written: rows={} ofs={} siz={} header={} payload={}",
            self.index.len() - 1,
            chunk.rows,
            location.offset,
            location.size,
            chunk.header_bytes.len(),
            chunk.payload.len(),
        );

        // fsync the file periodically to avoid long pauses with very big files.
        if self.n - self.last_sync > FSYNC_EVERY {
            self.sync().await?;
            self.last_sync = self.n
        }

        Ok(location)
    }

    async fn write_meta(&mut self) -> anyhow::Result<()> {
        if self.finished {
            return Err(LogError::Finished.into());
        }

        // An empty log still carries the magic.
        if self.n == 0 {
            self.write_header().await?;
        }

        let meta_pos = self.n;
        let n = write_meta_block(&mut self.w, &self.index).await?;
        self.n += n;
        self.finished = true;

        self.sync().await?;
        self.last_sync = self.n;

        tracing::info!(
            "meta block written: chunks={} ofs={} siz={} file size={}",
            self.index.len(),
            meta_pos,
            n,
            self.n
        );

        Ok(())
    }

    async fn close(mut self) -> anyhow::Result<()> {
        self.sync().await?;

        if !self.finished {
            tracing::warn!(
                "log closed without a meta block after {} chunks, {} bytes",
                self.index.len(),
                self.n
            );
            return Err(LogError::Incomplete.into());
        }

        Ok(())
    }

    fn index(&self) -> &IndexEntries {
        &self.index
    }

    fn size(&self) -> u64 {
        self.n
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}
