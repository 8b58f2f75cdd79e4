use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

pub mod chunk_writer;
pub mod log_writer;

/// SyncWrite is an output stream a log writer can make durable.
#[async_trait]
pub trait SyncWrite: AsyncWrite + Unpin + Send {
    async fn sync(&mut self) -> std::io::Result<()> {
        self.flush().await
    }
}

impl SyncWrite for Vec<u8> {}

#[async_trait]
impl SyncWrite for File {
    async fn sync(&mut self) -> std::io::Result<()> {
        self.flush().await?;
        self.sync_all().await
    }
}

#[async_trait]
impl SyncWrite for BufWriter<File> {
    async fn sync(&mut self) -> std::io::Result<()> {
        self.flush().await?;
        self.get_mut().sync_all().await
    }
}
