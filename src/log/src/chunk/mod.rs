pub mod compression;
pub mod decoder;
pub mod encoder;
pub mod header;
pub mod schema;

/// CHUNK_TYPE_DATA designates a chunk holding packed samples.
pub const CHUNK_TYPE_DATA: u8 = 0x01;

/// CHUNK_FRAME_SIZE is the fixed framing of a chunk:
/// | total size(8B) | type(1B) | header length(8B) |
pub const CHUNK_FRAME_SIZE: u64 = 8 + 1 + 8;

/// CHUNK_KIND_DATA is the `chunk_type` recorded in a data chunk header.
pub const CHUNK_KIND_DATA: &'static str = "data";

/// DEFAULT_CHANNEL is the channel every chunk of a converted log belongs to.
pub const DEFAULT_CHANNEL: &'static str = "feed";
