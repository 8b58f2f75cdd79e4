use clap::Parser;
use serde::Deserialize;
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use viaems_log::file::reader::log_reader::LogReader;
use viaems_utils::time::{time_format, unix_nano_to_time};

/// Print the index of a VIAEMSLOG file.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Parser)]
#[clap(about, version, author)]
struct Config {
    pub path: String,

    /// Decode every chunk and print its columns and row count.
    #[clap(long)]
    pub decode: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let config = Config::parse();
    if config.path.is_empty() {
        println!("path MUST not be empty!");
        return Ok(());
    }

    let mut reader = LogReader::open(config.path.as_str()).await?;
    println!(
        "{}: {} bytes, {} chunks, meta block at {}",
        config.path,
        reader.file_size(),
        reader.entries().len(),
        reader.meta().offset
    );
    if let Some((min, max)) = reader.time_range() {
        println!(
            "time range: {} .. {}",
            time_format(unix_nano_to_time(min)),
            time_format(unix_nano_to_time(max))
        );
    }

    let entries = reader.entries().clone();
    for (i, entry) in entries.iter().enumerate() {
        println!("{:06}> {}", i, entry);

        if config.decode {
            let chunk = reader.read_chunk_at(entry).await?;
            let columns: Vec<String> = chunk
                .schema
                .columns()
                .iter()
                .map(|c| format!("{}:{}", c.name, c.typ))
                .collect();
            println!(
                "        {} {} rows={} [{}]",
                chunk.header.name,
                chunk.header.compression(),
                chunk.samples.len(),
                columns.join(", ")
            );
        }
    }

    Ok(())
}
