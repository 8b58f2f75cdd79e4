//!
//! A VIAEMSLOG file is composed of three sections: header, chunks and the meta block.
//!
//! ┌─────────┬────────────────────────────────────────────┬──────────────┐
//! │ Header  │                   Chunks                   │  Meta Block  │
//! │10 bytes │                  N bytes                   │   N bytes    │
//! └─────────┴────────────────────────────────────────────┴──────────────┘
//!
//! The header is the ASCII magic `VIAEMSLOG1`.
//!
//! Each chunk starts with its total size, which counts the whole frame including
//! the size field itself, so a reader can skip a chunk without parsing it. The
//! chunk header is a CBOR map describing the columns of the payload. All
//! integers are little endian.
//!
//! ┌──────────────────────────────────────────────────────────┐
//! │                          Chunk                           │
//! ├──────────┬────────┬────────────┬────────────┬────────────┤
//! │  Size    │  Type  │ Header Len │   Header   │  Payload   │
//! │ 8 bytes  │ 1 byte │  8 bytes   │  N bytes   │  N bytes   │
//! └──────────┴────────┴────────────┴────────────┴────────────┘
//!
//! The payload is one packed row per sample: the u64 `realtime_ns` followed by
//! every field as a u32 or an f32, in header column order. When the header has
//! a `compression` key the whole payload is compressed as one block.
//!
//! The meta block ends the file and indexes every chunk in write order. Its size
//! is stored at both ends so it can be found by reading the last 12 bytes.
//!
//! ┌───────────────────────────────────────────────────────────────────────────┐
//! │                                Meta Block                                 │
//! ├─────────┬────────┬──────────┬─────────┬─────────────┬─────────┬──────────┤
//! │  Size   │  Type  │ Reserved │  Count  │   Entries   │  Size   │ "meta"   │
//! │ 8 bytes │ 1 byte │ 8 bytes  │ 8 bytes │ 33 bytes*N  │ 8 bytes │ 4 bytes  │
//! └─────────┴────────┴──────────┴─────────┴─────────────┴─────────┴──────────┘
//!
//! ┌───────────────────────────────────────────────────────────┐
//! │                        Index Entry                        │
//! ├──────────┬──────────┬────────┬─────────────┬──────────────┤
//! │Start Time│Stop Time │  Type  │Chunk Offset │  Chunk Size  │
//! │ 8 bytes  │ 8 bytes  │ 1 byte │   8 bytes   │   8 bytes    │
//! └──────────┴──────────┴────────┴─────────────┴──────────────┘
//!

pub mod index;
pub mod meta;
pub mod reader;
pub mod writer;

/// MAGIC is written as the first bytes of a log file.
pub const MAGIC: [u8; 10] = *b"VIAEMSLOG1";

/// HEADER_SIZE is the size of the file header (the magic).
pub const HEADER_SIZE: u64 = MAGIC.len() as u64;

/// BLOCK_TYPE_META designates the trailing meta block.
pub const BLOCK_TYPE_META: u8 = 0x03;

/// META_MAGIC terminates the meta block, and so the file.
pub const META_MAGIC: [u8; 4] = *b"meta";

/// META_PREFIX_SIZE is | size(8B) | type(1B) | reserved(8B) | count(8B) |
pub const META_PREFIX_SIZE: u64 = 8 + 1 + 8 + 8;

/// META_TRAILER_SIZE is | size(8B) | "meta"(4B) |
pub const META_TRAILER_SIZE: u64 = 8 + META_MAGIC.len() as u64;

/// INDEX_ENTRY_SIZE is the size in bytes of an encoded index entry.
pub const INDEX_ENTRY_SIZE: usize = 8 + 8 + 1 + 8 + 8;

/// INDEX_ENTRY_TYPE_CHUNK marks an index entry pointing at a chunk.
pub const INDEX_ENTRY_TYPE_CHUNK: u8 = 0x01;

/// The threshold amount of data written before the log file is fsync'd.
const FSYNC_EVERY: u64 = 25 * 1024 * 1024;

/// meta_block_size returns the total size of a meta block holding `count` entries.
pub fn meta_block_size(count: usize) -> u64 {
    META_PREFIX_SIZE + (INDEX_ENTRY_SIZE * count) as u64 + META_TRAILER_SIZE
}
