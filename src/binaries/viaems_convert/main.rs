use clap::Parser;
use serde::Deserialize;
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use viaems_log::chunk::compression::Compression;
use viaems_log::config::{ConvertOptions, WriterOptions, DEFAULT_CHUNK_ROWS};
use viaems_log::convert::convert_file;
use viaems_log::DEFAULT_OUTPUT;

/// Convert newline-delimited JSON samples into a VIAEMSLOG file.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Parser)]
#[clap(about, version, author)]
struct Config {
    /// Input file, one JSON object with a `realtime_ns` key per line.
    pub input: String,

    #[clap(long, short, default_value = DEFAULT_OUTPUT)]
    pub output: String,

    /// Samples per chunk.
    #[clap(long, default_value_t = DEFAULT_CHUNK_ROWS)]
    pub chunk_rows: usize,

    /// Stop after this many chunks.
    #[clap(long)]
    pub max_chunks: Option<usize>,

    /// none, snappy or gzip.
    #[clap(long, default_value = "none")]
    pub compression: Compression,

    #[clap(long, default_value = "feed")]
    pub channel: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    tracing::debug!("config: {:?}", config);
    if config.input.is_empty() {
        println!("input MUST not be empty!");
        return Ok(());
    }

    let writer_options = WriterOptions {
        channel: config.channel.clone(),
        compression: config.compression,
    };
    let options = ConvertOptions {
        chunk_rows: config.chunk_rows,
        max_chunks: config.max_chunks,
    };

    let stats = convert_file(
        config.input.as_str(),
        config.output.as_str(),
        writer_options,
        &options,
    )
    .await?;

    println!(
        "{}: {} rows in {} chunks, {} bytes{}",
        config.output,
        stats.rows,
        stats.chunks,
        stats.bytes,
        if stats.truncated { " (truncated)" } else { "" }
    );

    Ok(())
}
