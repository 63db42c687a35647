//! Streams the engine reads from and writes to.

use std::fmt;
use std::io::IsTerminal;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use crate::error::EngineError;

/// Where input comes from when no files are given.
#[derive(Default)]
pub enum InputStream {
    /// The process' standard input.
    #[default]
    Stdin,
    /// Any reader.
    Reader(Box<dyn AsyncRead + Send + Unpin>),
    /// Text supplied up front.
    Text(String),
}

impl InputStream {
    /// Reads the whole stream.
    ///
    /// Refuses to wait on an interactive terminal.
    pub async fn read_all(self) -> Result<String, EngineError> {
        match self {
            Self::Stdin => {
                if std::io::stdin().is_terminal() {
                    return Err(EngineError::setup("No input"));
                }
                let mut value = String::new();
                tokio::io::stdin().read_to_string(&mut value).await?;
                Ok(value)
            }
            Self::Reader(mut reader) => {
                let mut value = String::new();
                reader.read_to_string(&mut value).await?;
                Ok(value)
            }
            Self::Text(value) => Ok(value),
        }
    }
}

impl fmt::Debug for InputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdin => f.write_str("Stdin"),
            Self::Reader(_) => f.write_str("Reader"),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
        }
    }
}

/// Where processed documents and reports are written.
#[derive(Debug, Clone)]
pub enum OutputStream {
    Stdout,
    Stderr,
    /// Collects everything written, for embedders and tests.
    Capture(Arc<Mutex<String>>),
}

impl OutputStream {
    /// A stream that collects its output in memory.
    pub fn capture() -> Self {
        Self::Capture(Arc::default())
    }

    /// Everything written so far to a capturing stream.
    pub fn contents(&self) -> Option<String> {
        match self {
            Self::Capture(buffer) => Some(buffer.lock().clone()),
            _ => None,
        }
    }

    pub async fn write(&self, text: &str) -> std::io::Result<()> {
        match self {
            Self::Stdout => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(text.as_bytes()).await?;
                stdout.flush().await
            }
            Self::Stderr => {
                let mut stderr = tokio::io::stderr();
                stderr.write_all(text.as_bytes()).await?;
                stderr.flush().await
            }
            Self::Capture(buffer) => {
                buffer.lock().push_str(text);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_capture() {
        let stream = OutputStream::capture();
        let clone = stream.clone();
        stream.write("a").await.unwrap();
        clone.write("b\n").await.unwrap();

        assert_eq!(stream.contents().as_deref(), Some("ab\n"));
        assert_eq!(OutputStream::Stdout.contents(), None);
    }

    #[tokio::test]
    async fn test_read_reader() {
        let stream = InputStream::Reader(Box::new(&b"# hi\n"[..]));
        assert_eq!(stream.read_all().await.unwrap(), "# hi\n");
    }
}
