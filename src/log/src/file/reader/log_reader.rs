use std::io::SeekFrom;
use std::path::Path;

use common_base::sample::Sample;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

use crate::chunk::decoder::{decode_chunk, DecodedChunk};
use crate::chunk::{CHUNK_FRAME_SIZE, CHUNK_TYPE_DATA};
use crate::error::LogError;
use crate::file::index::{IndexEntries, IndexEntry};
use crate::file::meta::{parse_trailer, MetaBlock};
use crate::file::{meta_block_size, HEADER_SIZE, MAGIC, META_TRAILER_SIZE};

/// RawChunk is a chunk frame as stored in the file, payload still compressed.
#[derive(Debug, Clone)]
pub struct RawChunk {
    pub offset: u64,
    pub size: u64,
    pub typ: u8,
    pub header: Vec<u8>,
    pub payload: Vec<u8>,
}

/// LogReader reads a finished log file through its meta block.
pub struct LogReader<R> {
    r: R,
    file_size: u64,
    meta: MetaBlock,
}

impl LogReader<File> {
    pub async fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let fd = File::open(path)
            .await
            .map_err(|e| anyhow!("open: {}: {}", path.display(), e))?;
        Self::new(fd).await
    }
}

impl<R> LogReader<R>
where
    R: AsyncRead + AsyncSeek + Unpin + Send,
{
    pub async fn new(mut r: R) -> anyhow::Result<Self> {
        let file_size = r.seek(SeekFrom::End(0)).await?;
        if file_size < HEADER_SIZE {
            return Err(LogError::BadMagic.into());
        }

        Self::verify_magic(&mut r).await?;

        if file_size < HEADER_SIZE + meta_block_size(0) {
            return Err(LogError::BadMetaBlock(format!(
                "file of {} bytes is too small to hold a meta block",
                file_size
            ))
            .into());
        }

        // The meta block's size is repeated right before the trailing magic.
        let mut trailer = [0_u8; META_TRAILER_SIZE as usize];
        r.seek(SeekFrom::Start(file_size - META_TRAILER_SIZE))
            .await?;
        r.read_exact(&mut trailer)
            .await
            .map_err(|e| anyhow!("init: error reading meta trailer: {}", e))?;
        let meta_size = parse_trailer(&trailer)?;

        if meta_size < meta_block_size(0) || meta_size > file_size - HEADER_SIZE {
            return Err(LogError::BadMetaBlock(format!(
                "meta block size {} does not fit a {} byte file",
                meta_size, file_size
            ))
            .into());
        }

        let meta_offset = file_size - meta_size;
        let mut buf = vec![0_u8; meta_size as usize];
        r.seek(SeekFrom::Start(meta_offset)).await?;
        r.read_exact(buf.as_mut_slice())
            .await
            .map_err(|e| anyhow!("init: error reading meta block: {}", e))?;

        let meta = MetaBlock::unmarshal_binary(meta_offset, buf.as_slice())?;
        for (i, entry) in meta.entries.iter().enumerate() {
            if entry.offset < HEADER_SIZE || entry.end() > meta_offset {
                return Err(LogError::BadMetaBlock(format!(
                    "entry {} ({}) points outside the chunk section",
                    i, entry
                ))
                .into());
            }
        }

        tracing::debug!(
            "log opened: size={} chunks={} meta ofs={}",
            file_size,
            meta.entries.len(),
            meta_offset
        );

        Ok(Self {
            r,
            file_size,
            meta,
        })
    }

    async fn verify_magic(r: &mut R) -> anyhow::Result<()> {
        let mut magic = [0_u8; MAGIC.len()];
        r.seek(SeekFrom::Start(0)).await?;
        r.read_exact(&mut magic)
            .await
            .map_err(|e| anyhow!("init: error reading magic of file: {}", e))?;
        if magic != MAGIC {
            return Err(LogError::BadMagic.into());
        }

        Ok(())
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn meta(&self) -> &MetaBlock {
        &self.meta
    }

    pub fn entries(&self) -> &IndexEntries {
        &self.meta.entries
    }

    /// time_range returns the first and last timestamp in the log.
    pub fn time_range(&self) -> Option<(u64, u64)> {
        self.meta.entries.time_range()
    }

    /// read_raw_at reads the frame of the chunk identified by entry.
    pub async fn read_raw_at(&mut self, entry: &IndexEntry) -> anyhow::Result<RawChunk> {
        let bad = |reason: String| LogError::BadChunk {
            offset: entry.offset,
            reason,
        };

        self.r.seek(SeekFrom::Start(entry.offset)).await?;

        let size = self.r.read_u64_le().await?;
        if size < CHUNK_FRAME_SIZE {
            return Err(bad(format!("size {} is smaller than the chunk frame", size)).into());
        }
        if size != entry.size {
            return Err(bad(format!("size {} does not match index size {}", size, entry.size)).into());
        }

        let typ = self.r.read_u8().await?;
        if typ != CHUNK_TYPE_DATA {
            return Err(bad(format!("unexpected chunk type {:#04x}", typ)).into());
        }

        let header_len = self.r.read_u64_le().await?;
        if header_len > size - CHUNK_FRAME_SIZE {
            return Err(bad(format!(
                "header length {} overflows a {} byte chunk",
                header_len, size
            ))
            .into());
        }

        let mut header = vec![0_u8; header_len as usize];
        self.r.read_exact(header.as_mut_slice()).await?;

        let mut payload = vec![0_u8; (size - CHUNK_FRAME_SIZE - header_len) as usize];
        self.r.read_exact(payload.as_mut_slice()).await?;

        Ok(RawChunk {
            offset: entry.offset,
            size,
            typ,
            header,
            payload,
        })
    }

    /// read_chunk_at reads and decodes the chunk identified by entry.
    pub async fn read_chunk_at(&mut self, entry: &IndexEntry) -> anyhow::Result<DecodedChunk> {
        let raw = self.read_raw_at(entry).await?;
        let chunk = decode_chunk(raw.header.as_slice(), raw.payload.as_slice()).await?;

        match (chunk.samples.first(), chunk.samples.last()) {
            (Some(first), Some(last))
                if first.realtime_ns == entry.start_time && last.realtime_ns == entry.stop_time => {}
            _ => {
                return Err(LogError::BadChunk {
                    offset: entry.offset,
                    reason: format!("samples do not match index entry ({})", entry),
                }
                .into())
            }
        }

        Ok(chunk)
    }

    /// read_range returns every sample with a timestamp in [min, max], in file order.
    pub async fn read_range(&mut self, min: u64, max: u64) -> anyhow::Result<Vec<Sample>> {
        let entries = if self.meta.entries.is_time_ordered() {
            self.meta.entries.search(min, max).to_vec()
        } else {
            self.meta.entries.scan(min, max)
        };

        let mut samples = vec![];
        for entry in &entries {
            let chunk = self.read_chunk_at(entry).await?;
            samples.extend(
                chunk
                    .samples
                    .into_iter()
                    .filter(|s| s.realtime_ns >= min && s.realtime_ns <= max),
            );
        }

        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use common_base::sample::Sample;

    use crate::chunk::compression::Compression;
    use crate::chunk::schema::{Column, ColumnType};
    use crate::config::WriterOptions;
    use crate::error::LogError;
    use crate::file::reader::log_reader::LogReader;
    use crate::file::writer::log_writer::{DefaultLogWriter, LogWriter};

    fn batch(start: u64, rows: u64) -> Vec<Sample> {
        (0..rows)
            .map(|i| {
                Sample::new(start + i * 10)
                    .uint32("rpm", 3000 + i as u32)
                    .float("map", 90.0 + i as f32 * 0.5)
            })
            .collect()
    }

    async fn write_log(compression: Compression, batches: &[Vec<Sample>]) -> Vec<u8> {
        let opts = WriterOptions::default().with_compression(compression);
        let mut w = DefaultLogWriter::new(vec![], opts).unwrap();
        for b in batches {
            w.write(b).await.unwrap();
        }
        w.write_meta().await.unwrap();
        w.into_inner().await.unwrap()
    }

    #[tokio::test]
    async fn test_read_engine_scenario() {
        let samples = vec![
            Sample::new(1000).uint32("rpm", 4000).float("map", 97.5),
            Sample::new(2000).uint32("rpm", 4050).float("map", 98.0),
            Sample::new(3000).uint32("rpm", 4100).float("map", 98.5),
        ];
        let data = write_log(Compression::None, &[samples.clone()]).await;

        let mut r = LogReader::new(Cursor::new(data)).await.unwrap();
        assert_eq!(r.entries().len(), 1);
        let entry = r.entries().entries[0];
        assert_eq!((entry.start_time, entry.stop_time, entry.offset), (1000, 3000, 10));

        let raw = r.read_raw_at(&entry).await.unwrap();
        assert_eq!(raw.payload.len(), 48);
        assert_eq!(raw.size, 17 + raw.header.len() as u64 + 48);

        let chunk = r.read_chunk_at(&entry).await.unwrap();
        assert_eq!(
            chunk.header.columns,
            vec![
                Column::new("rpm", ColumnType::Uint32),
                Column::new("map", ColumnType::Float)
            ]
        );
        assert_eq!(chunk.samples, samples);
    }

    #[tokio::test]
    async fn test_read_index_locates_every_chunk() {
        let batches: Vec<Vec<Sample>> = (0..5).map(|i| batch(i * 1000, 40)).collect();
        for compression in [Compression::None, Compression::Snappy, Compression::Gzip] {
            let data = write_log(compression, &batches).await;
            let mut r = LogReader::new(Cursor::new(data)).await.unwrap();

            let entries = r.entries().clone();
            assert_eq!(entries.len(), batches.len());
            assert!(entries.is_time_ordered());

            for (entry, expected) in entries.iter().zip(&batches) {
                let chunk = r.read_chunk_at(entry).await.unwrap();
                assert_eq!(&chunk.samples, expected);
                assert_eq!(chunk.header.compression(), compression);
            }
        }
    }

    #[tokio::test]
    async fn test_read_range() {
        let batches: Vec<Vec<Sample>> = (0..4).map(|i| batch(i * 1000, 50)).collect();
        let data = write_log(Compression::Snappy, &batches).await;
        let mut r = LogReader::new(Cursor::new(data)).await.unwrap();

        assert_eq!(r.time_range(), Some((0, 3490)));

        let samples = r.read_range(480, 1020).await.unwrap();
        let times: Vec<u64> = samples.iter().map(|s| s.realtime_ns).collect();
        assert_eq!(times, vec![480, 490, 1000, 1010, 1020]);

        assert!(r.read_range(3500, 9000).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_empty_log() {
        let data = write_log(Compression::None, &[]).await;
        assert_eq!(data.len(), 47);

        let r = LogReader::new(Cursor::new(data)).await.unwrap();
        assert!(r.entries().is_empty());
        assert_eq!(r.meta().offset, 10);
        assert_eq!(r.time_range(), None);
    }

    #[tokio::test]
    async fn test_read_bad_magic() {
        let mut data = write_log(Compression::None, &[batch(0, 3)]).await;
        data[0] = b'X';
        let err = LogReader::new(Cursor::new(data)).await.err().unwrap();
        assert!(matches!(err.downcast_ref::<LogError>(), Some(LogError::BadMagic)));
    }

    #[tokio::test]
    async fn test_read_truncated_log() {
        let data = write_log(Compression::None, &[batch(0, 3), batch(100, 3)]).await;
        let truncated = data[..data.len() - 20].to_vec();
        assert!(LogReader::new(Cursor::new(truncated)).await.is_err());

        let err = LogReader::new(Cursor::new(b"VIAEMSLOG1".to_vec()))
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<LogError>(),
            Some(LogError::BadMetaBlock(_))
        ));
    }

    #[tokio::test]
    async fn test_read_corrupt_chunk() {
        let mut data = write_log(Compression::None, &[batch(0, 3)]).await;
        // chunk type byte of the first chunk
        data[18] = 0x07;
        let mut r = LogReader::new(Cursor::new(data)).await.unwrap();
        let entry = r.entries().entries[0];
        let err = r.read_chunk_at(&entry).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LogError>(),
            Some(LogError::BadChunk { offset: 10, .. })
        ));
    }

    #[tokio::test]
    async fn test_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.as_ref().join("reader_test.viaemslog");

        let mut w = DefaultLogWriter::create(&path, WriterOptions::default())
            .await
            .unwrap();
        w.write(&batch(0, 10)).await.unwrap();
        w.write(&batch(500, 10)).await.unwrap();
        w.write_meta().await.unwrap();
        w.close().await.unwrap();

        let mut r = LogReader::open(&path).await.unwrap();
        assert_eq!(r.entries().len(), 2);
        let samples = r.read_range(0, u64::MAX).await.unwrap();
        assert_eq!(samples.len(), 20);
    }
}
