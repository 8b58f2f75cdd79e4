use std::path::Path;

use common_base::iterator::AsyncIterator;
use common_base::sample::Sample;

use crate::config::{ConvertOptions, WriterOptions};
use crate::file::writer::log_writer::{DefaultLogWriter, LogWriter};
use crate::source::json_lines::JsonLinesSource;
use crate::source::RowSource;

/// ConvertStats summarizes one conversion run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConvertStats {
    pub rows: u64,
    pub chunks: usize,
    /// true if the run stopped at `max_chunks`. The source is not read past
    /// the limit, so this is also set when no rows were left.
    pub truncated: bool,
    pub bytes: u64,
}

/// convert drains source into writer in batches of `chunk_rows` samples and
/// finishes the log with its meta block. The last batch may be shorter.
pub async fn convert<S, W>(
    source: &mut S,
    writer: &mut W,
    options: &ConvertOptions,
) -> anyhow::Result<ConvertStats>
where
    S: RowSource + ?Sized,
    W: LogWriter + Send,
{
    options.validate()?;

    let mut stats = ConvertStats::default();
    let mut batch: Vec<Sample> = Vec::with_capacity(options.chunk_rows);

    loop {
        if options.max_chunks == Some(stats.chunks) {
            stats.truncated = true;
            break;
        }

        let sample = match source.try_next().await? {
            Some(sample) => sample,
            None => break,
        };

        batch.push(sample);
        stats.rows += 1;

        if batch.len() >= options.chunk_rows {
            writer.write(batch.as_slice()).await?;
            batch.clear();
            stats.chunks += 1;
        }
    }

    if !batch.is_empty() {
        writer.write(batch.as_slice()).await?;
        stats.chunks += 1;
    }

    if stats.truncated {
        tracing::warn!(
            "stopped after {} chunks ({} rows), the rest of the source is not converted",
            stats.chunks,
            stats.rows
        );
    }

    writer.write_meta().await?;
    stats.bytes = writer.size();

    Ok(stats)
}

/// convert_file converts a newline-delimited JSON file into a log file at output.
pub async fn convert_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    writer_options: WriterOptions,
    options: &ConvertOptions,
) -> anyhow::Result<ConvertStats> {
    let output = output.as_ref();

    let mut source = JsonLinesSource::open(input.as_ref()).await?;
    let mut writer = DefaultLogWriter::create(output, writer_options).await?;

    let stats = match convert(&mut source, &mut writer, options).await {
        Ok(stats) => stats,
        Err(e) => {
            // Keep the chunks written so far on disk; close reports the
            // missing meta block.
            if let Err(close_err) = writer.close().await {
                tracing::debug!("close after failed conversion: {}", close_err);
            }
            return Err(e);
        }
    };
    writer.close().await?;

    tracing::info!(
        "converted {} into {}: rows={} chunks={} bytes={}",
        input.as_ref().display(),
        output.display(),
        stats.rows,
        stats.chunks,
        stats.bytes
    );

    Ok(stats)
}
