use bytes::BufMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::chunk::encoder::EncodedChunk;
use crate::chunk::CHUNK_FRAME_SIZE;

/// ChunkLocation is where a chunk landed in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLocation {
    /// Position of the chunk's size prefix.
    pub offset: u64,
    /// The chunk's total size, equal to the number of bytes written.
    pub size: u64,
}

/// write_chunk frames chunk as `| size | type | header len | header | payload |`
/// and writes it to w, which is positioned at offset.
pub async fn write_chunk<W: AsyncWrite + Unpin>(
    mut w: W,
    offset: u64,
    chunk: &EncodedChunk,
) -> anyhow::Result<ChunkLocation> {
    let size = chunk.total_size();

    let mut frame = Vec::with_capacity(CHUNK_FRAME_SIZE as usize);
    frame.put_u64_le(size);
    frame.put_u8(chunk.typ);
    frame.put_u64_le(chunk.header_bytes.len() as u64);

    w.write_all(frame.as_slice())
        .await
        .map_err(|e| anyhow!("write: chunk frame error: {}", e))?;
    w.write_all(chunk.header_bytes.as_slice())
        .await
        .map_err(|e| anyhow!("write: chunk header error: {}", e))?;
    w.write_all(chunk.payload.as_slice())
        .await
        .map_err(|e| anyhow!("write: chunk payload error: {}", e))?;

    Ok(ChunkLocation { offset, size })
}

#[cfg(test)]
mod tests {
    use byteorder::{ByteOrder, LittleEndian};
    use common_base::sample::Sample;

    use crate::chunk::compression::Compression;
    use crate::chunk::encoder::encode_chunk;
    use crate::chunk::CHUNK_TYPE_DATA;
    use crate::file::writer::chunk_writer::write_chunk;

    #[tokio::test]
    async fn test_write_chunk_frame() {
        let samples = vec![
            Sample::new(1000).uint32("rpm", 4000).float("map", 97.5),
            Sample::new(2000).uint32("rpm", 4050).float("map", 98.0),
        ];
        let chunk = encode_chunk("feed", &samples, Compression::None)
            .await
            .unwrap();

        let mut buf: Vec<u8> = vec![];
        let loc = write_chunk(&mut buf, 10, &chunk).await.unwrap();

        assert_eq!(loc.offset, 10);
        assert_eq!(loc.size, buf.len() as u64);

        let header_len = LittleEndian::read_u64(&buf[9..17]) as usize;
        assert_eq!(LittleEndian::read_u64(&buf[..8]), 17 + header_len as u64 + 32);
        assert_eq!(buf[8], CHUNK_TYPE_DATA);
        assert_eq!(&buf[17..17 + header_len], chunk.header_bytes.as_slice());
        assert_eq!(&buf[17 + header_len..], chunk.payload.as_slice());
    }
}
