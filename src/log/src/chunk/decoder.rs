use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use common_base::sample::{FieldValue, Sample};

use crate::chunk::header::ChunkHeader;
use crate::chunk::schema::{ColumnType, Schema};

/// DecodedChunk is a chunk read back into samples.
#[derive(Debug, Clone)]
pub struct DecodedChunk {
    pub header: ChunkHeader,
    pub schema: Schema,
    pub samples: Vec<Sample>,
}

/// decode_chunk decodes a chunk from its header bytes and stored payload,
/// decompressing the payload when the header names a compression.
pub async fn decode_chunk(header_bytes: &[u8], payload: &[u8]) -> anyhow::Result<DecodedChunk> {
    let header = ChunkHeader::unmarshal_binary(header_bytes)?;
    let schema = header.schema()?;

    let compression = header.compression();
    let samples = if compression.is_none() {
        decode_payload(&schema, payload)?
    } else {
        let raw = compression.decompress(payload).await?;
        decode_payload(&schema, raw.as_slice())?
    };

    Ok(DecodedChunk {
        header,
        schema,
        samples,
    })
}

/// decode_payload unpacks an uncompressed payload laid out by schema.
pub fn decode_payload(schema: &Schema, payload: &[u8]) -> anyhow::Result<Vec<Sample>> {
    let row_size = schema.row_size();
    if payload.len() % row_size != 0 {
        return Err(anyhow!(
            "decode_payload: payload of {} bytes is not a multiple of the {} byte row",
            payload.len(),
            row_size
        ));
    }

    let rows = payload.len() / row_size;
    let mut samples = Vec::with_capacity(rows);

    let mut rdr = Cursor::new(payload);
    for _ in 0..rows {
        let realtime_ns = rdr.read_u64::<LittleEndian>()?;
        let mut sample = Sample {
            realtime_ns,
            fields: Vec::with_capacity(schema.fields().len()),
        };

        for column in schema.fields() {
            let value = match column.typ {
                ColumnType::Uint32 => FieldValue::Uint32(rdr.read_u32::<LittleEndian>()?),
                ColumnType::Float => FieldValue::Float(rdr.read_f32::<LittleEndian>()?),
                ColumnType::Timestamp => {
                    return Err(anyhow!(
                        "decode_payload: column '{}' declared as timestamp",
                        column.name
                    ))
                }
            };
            sample.fields.push((column.name.clone(), value));
        }

        samples.push(sample);
    }

    Ok(samples)
}
