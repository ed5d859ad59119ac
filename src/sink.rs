use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};

type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Newline-framed output for discovered links: a primary writer plus an
/// optional mirror. Either one failing fails the write.
pub struct ResultSink {
    primary: Writer,
    mirror: Option<Writer>,
}

impl ResultSink {
    pub fn new<W>(primary: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        ResultSink {
            primary: Box::new(primary),
            mirror: None,
        }
    }

    pub fn stdout() -> Self {
        ResultSink::new(tokio::io::stdout())
    }

    pub fn with_mirror<W>(mut self, mirror: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        self.mirror = Some(Box::new(mirror));
        self
    }

    /// Mirror every line into a freshly created (truncated) file.
    pub async fn with_output_file(self, path: &Path) -> Result<Self> {
        let file = File::create(path).await.map_err(Error::Output)?;
        Ok(self.with_mirror(file))
    }

    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        let mut framed = String::with_capacity(line.len() + 1);
        framed.push_str(line);
        framed.push('\n');

        self.primary
            .write_all(framed.as_bytes())
            .await
            .map_err(Error::Output)?;
        if let Some(mirror) = self.mirror.as_mut() {
            mirror
                .write_all(framed.as_bytes())
                .await
                .map_err(Error::Output)?;
        }
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.primary.flush().await.map_err(Error::Output)?;
        if let Some(mirror) = self.mirror.as_mut() {
            mirror.flush().await.map_err(Error::Output)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ResultSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSink")
            .field("mirrored", &self.mirror.is_some())
            .finish()
    }
}
