use tokio::io::{AsyncRead, AsyncReadExt};

use crate::protocol::ServerEvent;
use crate::websocket::EventSink;

const READ_BUF_SIZE: usize = 8 * 1024;

/// Which pipe a chunk came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    fn event(self, project_path: &str, data: String) -> ServerEvent {
        let project_path = project_path.to_string();
        match self {
            OutputStream::Stdout => ServerEvent::Stdout { project_path, data },
            OutputStream::Stderr => ServerEvent::Stderr { project_path, data },
        }
    }
}

/// Turns raw pipe reads into text without splitting a multibyte character
/// across two chunks.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    /// Trailing bytes of an incomplete UTF-8 sequence
    pending: Vec<u8>,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Option<String> {
        self.pending.extend_from_slice(bytes);

        let valid_up_to = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            // error_len() == None means the input ended mid-sequence
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => self.pending.len(),
        };

        if valid_up_to == 0 {
            return None;
        }
        let rest = self.pending.split_off(valid_up_to);
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending = rest;
        Some(text)
    }

    /// Whatever is left once the pipe closes
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(text)
    }
}

/// Forwards one pipe to `sink` until EOF. No flow control: a fast producer
/// grows the sink's queue without bound.
pub async fn pump<R>(mut reader: R, stream: OutputStream, project_path: String, sink: EventSink)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUF_SIZE];
    let mut decoder = ChunkDecoder::new();

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if let Some(text) = decoder.push(&buf[..n]) {
                    sink.emit(stream.event(&project_path, text));
                }
            }
            Err(e) => {
                tracing::warn!("Read error on {:?} for {}: {}", stream, project_path, e);
                break;
            }
        }
    }

    if let Some(text) = decoder.finish() {
        sink.emit(stream.event(&project_path, text));
    }
}
