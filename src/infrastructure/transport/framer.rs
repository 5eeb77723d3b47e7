//! Delimiter framing for the inbound half of a connection.
//!
//! Turns a raw byte stream into discrete messages. Each message on the wire
//! is its UTF-8 text followed by exactly one delimiter character; there is no
//! length prefix and no escaping.
//!
//! The framer never waits for data. Each [`Framer::pull`] inspects at most
//! `chunk_size` characters of whatever is already available and returns the
//! messages those characters complete. An unterminated tail is carried over
//! to the next call, so a message may span any number of pulls.
//!
//! # Example
//!
//! ```
//! use hoogas::infrastructure::transport::{Framer, Framing};
//!
//! let wire: &[u8] = "ab¬cd¬efg".as_bytes();
//! let mut framer = Framer::new(wire, Framing::new(16, '¬'));
//!
//! assert_eq!(framer.pull().unwrap(), vec!["ab".to_string(), "cd".to_string()]);
//! assert_eq!(framer.partial(), "efg");
//! ```

use futures::FutureExt;
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

use super::Framing;

/// Widest UTF-8 encoding of a single character.
const MAX_UTF8_WIDTH: usize = 4;

/// Decoded characters [`Framer::poll_closed`] buffers before it stops reading.
const PREFETCH_LIMIT: usize = 64 * 1024;

/// Splits an inbound stream into delimiter-terminated messages.
///
/// One framer belongs to one socket epoch. When a connection is replaced a
/// new framer is built and the old partial message is discarded with it.
///
/// Not internally synchronized: `pull` takes `&mut self`.
pub struct Framer<R> {
    reader: R,
    delimiter: char,
    chunk_size: usize,
    /// Scratch buffer of at most `chunk_size` characters, reused across pulls.
    chunk: Vec<char>,
    /// Decoded characters not yet inspected.
    decoded: VecDeque<char>,
    /// Trailing bytes of an incomplete UTF-8 sequence.
    undecoded: Vec<u8>,
    read_buf: Vec<u8>,
    /// Not-yet-terminated tail of the stream.
    partial: String,
    eof: bool,
}

impl<R> Framer<R>
where
    R: AsyncRead + Unpin,
{
    /// Builds a framer over `reader` with the given chunk size and delimiter.
    ///
    /// A chunk size of zero is treated as one.
    pub fn new(reader: R, framing: Framing) -> Self {
        let chunk_size = framing.chunk_size.max(1);
        Self {
            reader,
            delimiter: framing.delimiter,
            chunk_size,
            chunk: Vec::with_capacity(chunk_size),
            decoded: VecDeque::with_capacity(chunk_size),
            undecoded: Vec::with_capacity(MAX_UTF8_WIDTH),
            read_buf: vec![0; chunk_size.saturating_mul(MAX_UTF8_WIDTH)],
            partial: String::new(),
            eof: false,
        }
    }

    /// Returns the complete messages, in send order, produced from the next
    /// chunk of available characters.
    ///
    /// Returns an empty vector when nothing is available; never blocks.
    ///
    /// # Errors
    ///
    /// Fails when the stream has ended (`UnexpectedEof`, reported once every
    /// buffered character has been inspected), when the read itself fails, or
    /// when the peer sends invalid UTF-8 (`InvalidData`). After an error the
    /// connection must be treated as dead.
    pub fn pull(&mut self) -> io::Result<Vec<String>> {
        if self.decoded.len() < self.chunk_size && !self.eof {
            self.fill_available()?;
        }

        if self.decoded.is_empty() {
            if self.eof {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed by peer",
                ));
            }
            return Ok(Vec::new());
        }

        let take = self.chunk_size.min(self.decoded.len());
        self.chunk.clear();
        self.chunk.extend(self.decoded.drain(..take));

        Ok(self.scan_chunk())
    }

    /// The characters received since the last delimiter.
    pub fn partial(&self) -> &str {
        &self.partial
    }

    /// Characters inspected per pull.
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Character that terminates every message.
    pub const fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Waits for the peer to hang up without handing out any messages.
    ///
    /// Whatever arrives meanwhile is decoded into the framer's buffer, so a
    /// later [`Framer::pull`] still returns it in order. Resolves with
    /// `UnexpectedEof` once the stream ends, or with the read error. Once
    /// `PREFETCH_LIMIT` characters wait to be pulled it stops reading and
    /// stays pending until polled again.
    pub fn poll_closed(&mut self, cx: &mut Context<'_>) -> Poll<io::Error> {
        loop {
            if self.eof {
                return Poll::Ready(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed by peer",
                ));
            }
            if self.decoded.len() >= PREFETCH_LIMIT {
                return Poll::Pending;
            }

            let n = {
                let mut buf = ReadBuf::new(&mut self.read_buf);
                match Pin::new(&mut self.reader).poll_read(cx, &mut buf) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Err(err)) => return Poll::Ready(err),
                    Poll::Ready(Ok(())) => buf.filled().len(),
                }
            };

            if n == 0 {
                self.eof = true;
            } else if let Err(err) = self.decode(n) {
                return Poll::Ready(err);
            }
        }
    }

    /// Reads whatever the underlying stream can hand over without waiting.
    fn fill_available(&mut self) -> io::Result<()> {
        let read = self.reader.read(&mut self.read_buf).now_or_never();
        match read {
            // Nothing ready yet.
            None => Ok(()),
            Some(Ok(0)) => {
                self.eof = true;
                Ok(())
            }
            Some(Ok(n)) => self.decode(n),
            Some(Err(err)) if err.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Some(Err(err)) => Err(err),
        }
    }

    fn decode(&mut self, n: usize) -> io::Result<()> {
        self.undecoded.extend_from_slice(&self.read_buf[..n]);

        let consumed = match std::str::from_utf8(&self.undecoded) {
            Ok(text) => {
                self.decoded.extend(text.chars());
                self.undecoded.len()
            }
            Err(err) if err.error_len().is_none() => {
                // Incomplete sequence at the end: keep it for the next read.
                let valid = err.valid_up_to();
                let text = std::str::from_utf8(&self.undecoded[..valid])
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                self.decoded.extend(text.chars());
                valid
            }
            Err(err) => return Err(io::Error::new(io::ErrorKind::InvalidData, err)),
        };

        self.undecoded.drain(..consumed);
        Ok(())
    }

    fn scan_chunk(&mut self) -> Vec<String> {
        let mut messages = Vec::new();
        let mut current = std::mem::take(&mut self.partial);

        for &c in &self.chunk {
            if c == self.delimiter {
                messages.push(std::mem::take(&mut current));
            } else {
                current.push(c);
            }
        }

        // Empty when the chunk ended exactly on a delimiter.
        self.partial = current;
        self.chunk.clear();
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    const DELIM: char = '¬';

    fn framing(chunk_size: usize) -> Framing {
        Framing::new(chunk_size, DELIM)
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_multiple_messages_in_one_chunk() {
        let wire = "abcd¬ef¬".as_bytes();
        let mut framer = Framer::new(wire, framing(10));

        assert_eq!(framer.pull().unwrap(), strings(&["abcd", "ef"]));
        assert_eq!(framer.partial(), "");
    }

    #[test]
    fn test_call_by_call_sequence_with_chunk_of_five() {
        let wire = "abcd¬abcd¬abcdefghij¬abc¬abcdefghi¬abcd¬abcdefghij¬k¬".as_bytes();
        let mut framer = Framer::new(wire, framing(5));

        let expected: [&[&str]; 11] = [
            &["abcd"],
            &["abcd"],
            &[],
            &[],
            &["abcdefghij", "abc"],
            &[],
            &["abcdefghi"],
            &["abcd"],
            &[],
            &[],
            &["abcdefghij", "k"],
        ];
        for (call, messages) in expected.iter().enumerate() {
            assert_eq!(framer.pull().unwrap(), strings(messages), "pull #{}", call + 1);
        }

        let err = framer.pull().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_messages_straddling_chunks_with_chunk_of_five() {
        let wire = "ab¬cd¬efghijklmnoprstuvwxyz¬".as_bytes();
        let mut framer = Framer::new(wire, framing(5));

        // ab¬cd | ¬efgh | ijklm | noprs | tuvwx | yz¬
        let expected: [&[&str]; 6] = [
            &["ab"],
            &["cd"],
            &[],
            &[],
            &[],
            &["efghijklmnoprstuvwxyz"],
        ];
        for (call, messages) in expected.iter().enumerate() {
            assert_eq!(framer.pull().unwrap(), strings(messages), "pull #{}", call + 1);
        }
        assert_eq!(framer.partial(), "");

        let err = framer.pull().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_chunk_without_delimiter_extends_partial() {
        let wire = "abcdefghij".as_bytes();
        let mut framer = Framer::new(wire, framing(4));

        assert!(framer.pull().unwrap().is_empty());
        assert_eq!(framer.partial(), "abcd");
        assert!(framer.pull().unwrap().is_empty());
        assert_eq!(framer.partial(), "abcdefgh");
    }

    #[test]
    fn test_end_of_stream_reported_after_buffered_data() {
        let wire = "ab¬c".as_bytes();
        let mut framer = Framer::new(wire, framing(10));

        assert_eq!(framer.pull().unwrap(), strings(&["ab"]));
        let err = framer.pull().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_empty_messages_are_preserved() {
        let wire = "¬¬x¬".as_bytes();
        let mut framer = Framer::new(wire, framing(8));

        assert_eq!(framer.pull().unwrap(), strings(&["", "", "x"]));
    }

    #[test]
    fn test_custom_delimiter() {
        let wire = b"one|two|thr".as_slice();
        let mut framer = Framer::new(wire, Framing::new(32, '|'));

        assert_eq!(framer.pull().unwrap(), strings(&["one", "two"]));
        assert_eq!(framer.partial(), "thr");
    }

    #[test]
    fn test_invalid_utf8_is_invalid_data() {
        let wire: &[u8] = &[b'a', 0xff, b'b'];
        let mut framer = Framer::new(wire, framing(8));

        let err = framer.pull().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_zero_chunk_size_is_clamped() {
        let framer = Framer::new(b"".as_slice(), framing(0));
        assert_eq!(framer.chunk_size(), 1);
    }

    #[tokio::test]
    async fn test_no_data_available_returns_empty() {
        let (_client, server) = tokio::io::duplex(64);
        let mut framer = Framer::new(server, framing(5));

        assert!(framer.pull().unwrap().is_empty());
        assert!(framer.pull().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_message_split_across_writes() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut framer = Framer::new(server, framing(50));

        client.write_all("hello wo".as_bytes()).await.unwrap();
        assert!(framer.pull().unwrap().is_empty());
        assert_eq!(framer.partial(), "hello wo");

        client.write_all("rld¬next".as_bytes()).await.unwrap();
        assert_eq!(framer.pull().unwrap(), strings(&["hello world"]));
        assert_eq!(framer.partial(), "next");
    }

    #[tokio::test]
    async fn test_multibyte_delimiter_split_between_reads() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut framer = Framer::new(server, framing(10));
        let delimiter = DELIM.to_string();
        let bytes = delimiter.as_bytes();

        client.write_all(b"abc").await.unwrap();
        client.write_all(&bytes[..1]).await.unwrap();
        assert!(framer.pull().unwrap().is_empty());
        assert_eq!(framer.partial(), "abc");

        client.write_all(&bytes[1..]).await.unwrap();
        assert_eq!(framer.pull().unwrap(), strings(&["abc"]));
    }

    #[tokio::test]
    async fn test_poll_closed_buffers_data_until_end_of_stream() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut framer = Framer::new(server, framing(10));

        client.write_all("ab¬cd¬e".as_bytes()).await.unwrap();
        drop(client);

        let err = std::future::poll_fn(|cx| framer.poll_closed(cx)).await;
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        assert_eq!(framer.pull().unwrap(), strings(&["ab", "cd"]));
        assert_eq!(framer.partial(), "e");
        let err = framer.pull().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_poll_closed_pending_while_peer_is_open() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut framer = Framer::new(server, framing(10));

        client.write_all("hi¬".as_bytes()).await.unwrap();
        let waited = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            std::future::poll_fn(|cx| framer.poll_closed(cx)),
        )
        .await;
        assert!(waited.is_err(), "an open stream has not hung up");

        assert_eq!(framer.pull().unwrap(), strings(&["hi"]));
    }

    #[tokio::test]
    async fn test_peer_close_surfaces_error() {
        let (client, server) = tokio::io::duplex(64);
        let mut framer = Framer::new(server, framing(10));
        drop(client);

        let err = framer.pull().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
