//! Newline-delimited transport over a pair of async byte streams.
//!
//! [`LineTransport`] is used on both ends of the tool channel: by the client
//! over a child's stdout/stdin and by the server over its own stdin/stdout.
//! Partial reads survive a timed-out [`receive_line`](LineTransport::receive_line);
//! the bytes stay buffered until the line completes.

use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use toolgate_domain::TransportError;
use tracing::trace;

pub struct LineTransport<R, W> {
    reader: Option<R>,
    writer: Option<W>,
    pending: Vec<u8>,
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: Some(reader),
            writer: Some(writer),
            pending: Vec::new(),
        }
    }

    /// Write `line` plus one `\n` and flush.
    pub async fn send(&mut self, line: &str) -> Result<(), TransportError> {
        if line.contains('\n') {
            return Err(TransportError::malformed(
                "outgoing message contains a raw newline",
            ));
        }
        let writer = self.writer.as_mut().ok_or(TransportError::EndOfStream)?;
        trace!("transport send: {}", line);
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    /// Next full line, without its terminator, or `Timeout` / `EndOfStream`.
    pub async fn receive_line(&mut self, timeout: Duration) -> Result<String, TransportError> {
        match tokio::time::timeout(timeout, self.receive()).await {
            Ok(Ok(Some(line))) => Ok(line),
            Ok(Ok(None)) => Err(TransportError::EndOfStream),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(TransportError::Timeout(timeout)),
        }
    }

    /// Next full line, waiting as long as it takes. `None` at end of input.
    ///
    /// A trailing fragment without a terminator is dropped at end of input.
    pub async fn receive(&mut self) -> Result<Option<String>, TransportError> {
        let reader = self.reader.as_mut().ok_or(TransportError::EndOfStream)?;
        let read = reader.read_until(b'\n', &mut self.pending).await?;
        if read == 0 || !self.pending.ends_with(b"\n") {
            self.pending.clear();
            return Ok(None);
        }

        let mut bytes = std::mem::take(&mut self.pending);
        bytes.pop();
        if bytes.ends_with(b"\r") {
            bytes.pop();
        }
        let line = String::from_utf8(bytes)
            .map_err(|_| TransportError::malformed("line is not valid UTF-8"))?;
        trace!("transport recv: {}", line);
        Ok(Some(line))
    }

    /// Release both streams. Idempotent; later operations see `EndOfStream`.
    pub async fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.shutdown().await;
        }
        self.reader = None;
        self.pending.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none() && self.reader.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{BufReader, duplex};

    #[tokio::test]
    async fn test_send_and_receive_lines() {
        let (client, server) = duplex(1024);
        let (client_read, client_write) = tokio::io::split(client);
        let (server_read, server_write) = tokio::io::split(server);
        let mut a = LineTransport::new(BufReader::new(client_read), client_write);
        let mut b = LineTransport::new(BufReader::new(server_read), server_write);

        a.send(r#"{"id":1}"#).await.unwrap();
        a.send(r#"{"id":2}"#).await.unwrap();
        let timeout = Duration::from_secs(1);
        assert_eq!(b.receive_line(timeout).await.unwrap(), r#"{"id":1}"#);
        assert_eq!(b.receive_line(timeout).await.unwrap(), r#"{"id":2}"#);
    }

    #[tokio::test]
    async fn test_rejects_embedded_newline() {
        let (client, _server) = duplex(64);
        let (r, w) = tokio::io::split(client);
        let mut t = LineTransport::new(BufReader::new(r), w);
        assert!(matches!(
            t.send("a\nb").await,
            Err(TransportError::MalformedMessage(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_keeps_partial_line() {
        let (mut writer, reader) = duplex(64);
        let (r, w) = tokio::io::split(reader);
        let mut t = LineTransport::new(BufReader::new(r), w);

        writer.write_all(b"{\"id\":").await.unwrap();
        assert_eq!(
            t.receive_line(Duration::from_millis(50)).await,
            Err(TransportError::Timeout(Duration::from_millis(50)))
        );
        writer.write_all(b"7}\r\n").await.unwrap();
        assert_eq!(
            t.receive_line(Duration::from_millis(50)).await.unwrap(),
            "{\"id\":7}"
        );
    }

    #[tokio::test]
    async fn test_end_of_stream_and_close() {
        let (writer, reader) = duplex(64);
        let (r, w) = tokio::io::split(reader);
        let mut t = LineTransport::new(BufReader::new(r), w);

        drop(writer);
        assert_eq!(
            t.receive_line(Duration::from_secs(1)).await,
            Err(TransportError::EndOfStream)
        );

        t.close().await;
        t.close().await;
        assert!(t.is_closed());
        assert_eq!(t.send("{}").await, Err(TransportError::EndOfStream));
    }
}
