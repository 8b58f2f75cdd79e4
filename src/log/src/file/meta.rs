use bytes::BufMut;
use byteorder::{ByteOrder, LittleEndian};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::LogError;
use crate::file::index::IndexEntries;
use crate::file::{
    meta_block_size, BLOCK_TYPE_META, INDEX_ENTRY_SIZE, META_MAGIC, META_PREFIX_SIZE,
    META_TRAILER_SIZE,
};

/// MetaBlock is the trailing index of a log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaBlock {
    /// The absolute position of the block in the file.
    pub offset: u64,
    pub entries: IndexEntries,
}

impl MetaBlock {
    pub fn size(&self) -> u64 {
        meta_block_size(self.entries.len())
    }

    /// unmarshal_binary decodes a whole meta block, checking that both size
    /// fields agree with the block length.
    pub fn unmarshal_binary(offset: u64, b: &[u8]) -> anyhow::Result<Self> {
        if (b.len() as u64) < META_PREFIX_SIZE + META_TRAILER_SIZE {
            return Err(LogError::BadMetaBlock(format!("short block: {} bytes", b.len())).into());
        }

        let size = LittleEndian::read_u64(&b[..8]);
        if size != b.len() as u64 {
            return Err(LogError::BadMetaBlock(format!(
                "leading size {} does not match block length {}",
                size,
                b.len()
            ))
            .into());
        }

        let trailer = parse_trailer(&b[b.len() - META_TRAILER_SIZE as usize..])?;
        if trailer != size {
            return Err(LogError::BadMetaBlock(format!(
                "leading size {} does not match trailing size {}",
                size, trailer
            ))
            .into());
        }

        if b[8] != BLOCK_TYPE_META {
            return Err(LogError::BadMetaBlock(format!("unexpected block type {:#04x}", b[8])).into());
        }

        let count = LittleEndian::read_u64(&b[17..25]);
        let capacity = (size - META_PREFIX_SIZE - META_TRAILER_SIZE) / INDEX_ENTRY_SIZE as u64;
        if count > capacity || meta_block_size(count as usize) != size {
            return Err(LogError::BadMetaBlock(format!(
                "{} entries do not fit a {} byte block",
                count, size
            ))
            .into());
        }

        let start = META_PREFIX_SIZE as usize;
        let end = start + count as usize * INDEX_ENTRY_SIZE;
        let entries = IndexEntries::unmarshal_binary(&b[start..end], count as usize)?;

        Ok(Self { offset, entries })
    }
}

/// parse_trailer validates the last 12 bytes of a file and returns the meta
/// block size stored there.
pub fn parse_trailer(b: &[u8]) -> anyhow::Result<u64> {
    if b.len() != META_TRAILER_SIZE as usize {
        return Err(LogError::BadMetaBlock(format!("short trailer: {} bytes", b.len())).into());
    }
    if b[8..] != META_MAGIC {
        return Err(LogError::BadMetaBlock("missing 'meta' trailer".to_string()).into());
    }

    Ok(LittleEndian::read_u64(&b[..8]))
}

/// marshal_meta_block encodes the meta block for entries.
pub fn marshal_meta_block(entries: &IndexEntries) -> Vec<u8> {
    let size = meta_block_size(entries.len());

    let mut buf = Vec::with_capacity(size as usize);
    buf.put_u64_le(size);
    buf.put_u8(BLOCK_TYPE_META);
    buf.put_u64_le(0);
    buf.put_u64_le(entries.len() as u64);
    buf.extend_from_slice(entries.marshal_binary().as_slice());
    buf.put_u64_le(size);
    buf.extend_from_slice(&META_MAGIC);

    buf
}

/// write_meta_block writes the meta block for entries and returns its size.
pub async fn write_meta_block<W: AsyncWrite + Unpin>(
    mut w: W,
    entries: &IndexEntries,
) -> anyhow::Result<u64> {
    let buf = marshal_meta_block(entries);
    w.write_all(buf.as_slice())
        .await
        .map_err(|e| anyhow!("write: meta block error: {}", e))?;

    Ok(buf.len() as u64)
}

#[cfg(test)]
mod tests {
    use byteorder::{ByteOrder, LittleEndian};

    use crate::error::LogError;
    use crate::file::index::{IndexEntries, IndexEntry};
    use crate::file::meta::{marshal_meta_block, parse_trailer, write_meta_block, MetaBlock};
    use crate::file::meta_block_size;

    fn entries() -> IndexEntries {
        let mut ie = IndexEntries::new();
        ie.push(IndexEntry::new(1000, 3000, 10, 120));
        ie.push(IndexEntry::new(4000, 6000, 130, 120));
        ie
    }

    #[test]
    fn test_empty_meta_block() {
        let b = marshal_meta_block(&IndexEntries::new());
        assert_eq!(b.len(), 37);
        assert_eq!(
            b.as_slice(),
            &[
                37, 0, 0, 0, 0, 0, 0, 0, // size
                3, // type
                0, 0, 0, 0, 0, 0, 0, 0, // reserved
                0, 0, 0, 0, 0, 0, 0, 0, // count
                37, 0, 0, 0, 0, 0, 0, 0, // size
                b'm', b'e', b't', b'a',
            ]
        );
    }

    #[test]
    fn test_meta_block_sizes_agree() {
        let b = marshal_meta_block(&entries());
        let size = meta_block_size(2);
        assert_eq!(b.len() as u64, size);
        assert_eq!(LittleEndian::read_u64(&b[..8]), size);
        assert_eq!(parse_trailer(&b[b.len() - 12..]).unwrap(), size);
        assert_eq!(LittleEndian::read_u64(&b[17..25]), 2);
    }

    #[test]
    fn test_meta_block_unmarshal() {
        let b = marshal_meta_block(&entries());
        let meta = MetaBlock::unmarshal_binary(250, b.as_slice()).unwrap();
        assert_eq!(meta.offset, 250);
        assert_eq!(meta.entries, entries());
        assert_eq!(meta.size(), b.len() as u64);
    }

    #[test]
    fn test_meta_block_rejects_size_mismatch() {
        let mut b = marshal_meta_block(&entries());
        let n = b.len();
        b[n - 12] ^= 0x01;
        let err = MetaBlock::unmarshal_binary(0, b.as_slice()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LogError>(),
            Some(LogError::BadMetaBlock(_))
        ));
    }

    #[test]
    fn test_meta_block_rejects_count_mismatch() {
        let mut b = marshal_meta_block(&entries());
        b[17] = 3;
        assert!(MetaBlock::unmarshal_binary(0, b.as_slice()).is_err());
    }

    #[test]
    fn test_parse_trailer_rejects_magic() {
        let mut t = [0_u8; 12];
        t[8..].copy_from_slice(b"mata");
        assert!(parse_trailer(&t).is_err());
    }

    #[tokio::test]
    async fn test_write_meta_block() {
        let mut buf: Vec<u8> = vec![];
        let n = write_meta_block(&mut buf, &entries()).await.unwrap();
        assert_eq!(n, buf.len() as u64);
        assert_eq!(buf, marshal_meta_block(&entries()));
    }
}
