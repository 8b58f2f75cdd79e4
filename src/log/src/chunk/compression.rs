use std::fmt::{Display, Formatter};
use std::str::FromStr;

use async_compression::tokio::bufread::GzipDecoder;
use async_compression::tokio::write::GzipEncoder;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::LogError;

/// Compression is the whole-payload compression applied to a chunk. The
/// identifier is recorded in the chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Snappy,
    Gzip,
}

impl Compression {
    pub fn name(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Snappy => "snappy",
            Compression::Gzip => "gzip",
        }
    }

    pub fn is_none(&self) -> bool {
        *self == Compression::None
    }

    pub async fn compress(&self, data: Vec<u8>) -> anyhow::Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data),
            Compression::Snappy => snap::raw::Encoder::new()
                .compress_vec(data.as_slice())
                .map_err(|e| anyhow!("compress: snappy error: {}", e)),
            Compression::Gzip => {
                let mut enc = GzipEncoder::new(Vec::with_capacity(data.len() / 2));
                enc.write_all(data.as_slice())
                    .await
                    .map_err(|e| anyhow!("compress: gzip error: {}", e))?;
                enc.shutdown()
                    .await
                    .map_err(|e| anyhow!("compress: gzip error: {}", e))?;
                Ok(enc.into_inner())
            }
        }
    }

    pub async fn decompress(&self, data: &[u8]) -> anyhow::Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Snappy => snap::raw::Decoder::new()
                .decompress_vec(data)
                .map_err(|e| anyhow!("decompress: snappy error: {}", e)),
            Compression::Gzip => {
                let mut dec = GzipDecoder::new(data);
                let mut buf = Vec::with_capacity(data.len() * 2);
                dec.read_to_end(&mut buf)
                    .await
                    .map_err(|e| anyhow!("decompress: gzip error: {}", e))?;
                Ok(buf)
            }
        }
    }
}

impl Display for Compression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Compression {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Compression::None),
            "snappy" => Ok(Compression::Snappy),
            "gzip" => Ok(Compression::Gzip),
            _ => Err(LogError::UnknownCompression(s.to_string())),
        }
    }
}
