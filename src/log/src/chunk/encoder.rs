use bytes::BufMut;
use common_base::sample::{FieldValue, Sample};

use crate::chunk::compression::Compression;
use crate::chunk::header::ChunkHeader;
use crate::chunk::schema::Schema;
use crate::chunk::{CHUNK_FRAME_SIZE, CHUNK_TYPE_DATA};
use crate::error::LogError;

/// EncodedChunk is a chunk ready to be framed into a log file.
#[derive(Debug, Clone)]
pub struct EncodedChunk {
    pub typ: u8,
    pub header: ChunkHeader,
    pub header_bytes: Vec<u8>,
    pub payload: Vec<u8>,

    /// Timestamps of the first and last sample of the chunk.
    pub min_time: u64,
    pub max_time: u64,

    pub rows: usize,
}

impl EncodedChunk {
    /// total_size is the value of the chunk's size prefix: the fixed framing
    /// plus the header and the (possibly compressed) payload.
    pub fn total_size(&self) -> u64 {
        CHUNK_FRAME_SIZE + self.header_bytes.len() as u64 + self.payload.len() as u64
    }
}

/// encode_chunk packs a batch of samples into one chunk. The schema is
/// derived from the first sample and every other sample must match it.
pub async fn encode_chunk(
    channel: &str,
    samples: &[Sample],
    compression: Compression,
) -> anyhow::Result<EncodedChunk> {
    let (first, last) = match (samples.first(), samples.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(LogError::EmptyBatch.into()),
    };

    let schema = Schema::derive(first);

    let mut payload = Vec::with_capacity(schema.row_size() * samples.len());
    for (row, sample) in samples.iter().enumerate() {
        schema.check(sample, row)?;
        pack_sample(&mut payload, sample);
    }

    let payload = compression.compress(payload).await?;

    let header = ChunkHeader::data(channel, compression, &schema);
    let header_bytes = header.marshal_binary()?;

    Ok(EncodedChunk {
        typ: CHUNK_TYPE_DATA,
        header,
        header_bytes,
        payload,
        min_time: first.realtime_ns,
        max_time: last.realtime_ns,
        rows: samples.len(),
    })
}

/// pack_sample appends one row: the timestamp as u64 then each field as a
/// u32 or an IEEE-754 f32, all little endian.
pub fn pack_sample(buf: &mut Vec<u8>, sample: &Sample) {
    buf.put_u64_le(sample.realtime_ns);
    for (_, value) in &sample.fields {
        match value {
            FieldValue::Uint32(v) => buf.put_u32_le(*v),
            FieldValue::Float(v) => buf.put_f32_le(*v),
        }
    }
}

#[cfg(test)]
mod tests {
    use common_base::sample::Sample;

    use crate::chunk::compression::Compression;
    use crate::chunk::encoder::{encode_chunk, pack_sample};
    use crate::chunk::schema::{Column, ColumnType};
    use crate::error::LogError;

    fn engine_samples() -> Vec<Sample> {
        vec![
            Sample::new(1000).uint32("rpm", 4000).float("map", 97.5),
            Sample::new(2000).uint32("rpm", 4050).float("map", 98.0),
            Sample::new(3000).uint32("rpm", 4100).float("map", 98.5),
        ]
    }

    #[test]
    fn test_pack_sample() {
        let mut buf = vec![];
        pack_sample(&mut buf, &Sample::new(1000).uint32("rpm", 4000).float("map", 97.5));
        assert_eq!(
            buf.as_slice(),
            &[
                0xe8, 0x03, 0, 0, 0, 0, 0, 0, // 1000
                0xa0, 0x0f, 0, 0, // 4000
                0x00, 0x00, 0xc3, 0x42, // 97.5
            ]
        );
    }

    #[tokio::test]
    async fn test_encode_engine_chunk() {
        let chunk = encode_chunk("feed", &engine_samples(), Compression::None)
            .await
            .unwrap();

        assert_eq!(
            chunk.header.columns,
            vec![
                Column::new("rpm", ColumnType::Uint32),
                Column::new("map", ColumnType::Float)
            ]
        );
        assert_eq!(chunk.header.name, "feed");
        assert_eq!(chunk.header.chunk_type, "data");
        assert_eq!(chunk.payload.len(), 48);
        assert_eq!(chunk.min_time, 1000);
        assert_eq!(chunk.max_time, 3000);
        assert_eq!(chunk.rows, 3);
        assert_eq!(
            chunk.total_size(),
            17 + chunk.header_bytes.len() as u64 + 48
        );
    }

    #[tokio::test]
    async fn test_encode_empty_batch() {
        let err = encode_chunk("feed", &[], Compression::None)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LogError>(),
            Some(LogError::EmptyBatch)
        ));
    }

    #[tokio::test]
    async fn test_encode_heterogeneous_batch() {
        let mut samples = engine_samples();
        samples.push(Sample::new(4000).uint32("rpm", 4150));

        let err = encode_chunk("feed", &samples, Compression::None)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LogError>(),
            Some(LogError::SchemaMismatch { row: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_encode_compressed_keeps_logical_columns() {
        let samples: Vec<Sample> = (0..2000_u64)
            .map(|i| Sample::new(i * 1000).uint32("rpm", 4000).float("map", 98.0))
            .collect();

        let plain = encode_chunk("feed", &samples, Compression::None)
            .await
            .unwrap();
        let packed = encode_chunk("feed", &samples, Compression::Gzip)
            .await
            .unwrap();

        assert_eq!(plain.header.columns, packed.header.columns);
        assert_eq!(packed.header.compression, Some(Compression::Gzip));
        assert!(packed.payload.len() < plain.payload.len());
    }
}
