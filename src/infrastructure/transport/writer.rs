//! Outbound half of the framing protocol.

use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Appends the delimiter to `message`, producing its wire form.
pub fn encode(message: &str, delimiter: char) -> String {
    let mut frame = String::with_capacity(message.len() + delimiter.len_utf8());
    frame.push_str(message);
    frame.push(delimiter);
    frame
}

/// Writes delimiter-terminated messages to an output stream.
///
/// Performs no retry: any write or flush error is returned to the caller,
/// which must treat it as connection loss.
pub struct MessageWriter<W> {
    writer: W,
    delimiter: char,
}

impl<W> MessageWriter<W>
where
    W: AsyncWrite + Unpin,
{
    /// Wraps `writer`, terminating every message with `delimiter`.
    pub const fn new(writer: W, delimiter: char) -> Self {
        Self { writer, delimiter }
    }

    /// Writes `message` plus the delimiter as one logical write, then flushes.
    pub async fn send(&mut self, message: &str) -> io::Result<()> {
        let frame = encode(message, self.delimiter);
        self.writer.write_all(frame.as_bytes()).await?;
        self.writer.flush().await
    }

    /// Shuts down the write direction of the stream.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.writer.shutdown().await
    }

    /// Character appended to every message.
    pub const fn delimiter(&self) -> char {
        self.delimiter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[test]
    fn test_encode_appends_delimiter() {
        assert_eq!(encode("hello", '¬'), "hello¬");
        assert_eq!(encode("", '|'), "|");
    }

    #[tokio::test]
    async fn test_send_writes_message_and_delimiter() {
        let mock = Builder::new().write("hello¬".as_bytes()).build();
        let mut writer = MessageWriter::new(mock, '¬');

        writer.send("hello").await.unwrap();
    }

    #[tokio::test]
    async fn test_consecutive_sends_keep_order() {
        let mock = Builder::new()
            .write(b"first|")
            .write(b"second|")
            .build();
        let mut writer = MessageWriter::new(mock, '|');

        writer.send("first").await.unwrap();
        writer.send("second").await.unwrap();
    }

    #[tokio::test]
    async fn test_write_error_is_surfaced() {
        let mock = Builder::new()
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"))
            .build();
        let mut writer = MessageWriter::new(mock, '¬');

        let err = writer.send("lost").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_send_into_buffer() {
        let mut writer = MessageWriter::new(Vec::new(), '¬');
        writer.send("a").await.unwrap();
        writer.send("bc").await.unwrap();

        assert_eq!(String::from_utf8(writer.writer).unwrap(), "a¬bc¬");
    }
}
