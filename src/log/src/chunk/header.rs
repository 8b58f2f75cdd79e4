use serde::{Deserialize, Serialize};

use crate::chunk::compression::Compression;
use crate::chunk::schema::{Column, Schema};
use crate::chunk::CHUNK_KIND_DATA;

/// ChunkHeader describes a chunk's payload. It is stored CBOR encoded, as a
/// map with the keys `chunk_type`, `name`, `compression` (only when the
/// payload is compressed) and `columns`.
///
/// `columns` lists every field except the timestamp, in packing order, and
/// always describes the uncompressed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkHeader {
    pub chunk_type: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<Compression>,
    pub columns: Vec<Column>,
}

impl ChunkHeader {
    pub fn data(channel: &str, compression: Compression, schema: &Schema) -> Self {
        Self {
            chunk_type: CHUNK_KIND_DATA.to_string(),
            name: channel.to_string(),
            compression: if compression.is_none() {
                None
            } else {
                Some(compression)
            },
            columns: schema.fields().to_vec(),
        }
    }

    pub fn compression(&self) -> Compression {
        self.compression.unwrap_or_default()
    }

    pub fn schema(&self) -> anyhow::Result<Schema> {
        Schema::from_fields(self.columns.as_slice())
    }

    pub fn marshal_binary(&self) -> anyhow::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(64 + self.columns.len() * 24);
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| anyhow!("marshal_binary: chunk header: {:?}", e))?;
        Ok(buf)
    }

    pub fn unmarshal_binary(b: &[u8]) -> anyhow::Result<Self> {
        ciborium::from_reader(b).map_err(|e| anyhow!("unmarshal_binary: chunk header: {:?}", e))
    }
}
