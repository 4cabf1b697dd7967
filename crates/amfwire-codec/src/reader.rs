use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};
use tracing::trace;

use crate::codec::Codec;
use crate::deserializer::Decoded;
use crate::error::{AmfError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete AMF3 messages from any `Read` stream.
///
/// Bytes of a message that is still arriving are kept and retried after the
/// next read, so callers always get whole messages.
pub struct MessageReader<T> {
    inner: T,
    buf: BytesMut,
    codec: Codec,
}

impl<T: Read> MessageReader<T> {
    /// Create a new message reader with a default codec.
    pub fn new(inner: T) -> Self {
        Self::with_codec(inner, Codec::new())
    }

    /// Create a new message reader with an explicit codec.
    pub fn with_codec(inner: T, codec: Codec) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            codec,
        }
    }

    /// Read until at least one complete message is available (blocking).
    ///
    /// Returns every complete message buffered at that point. Returns
    /// `Err(AmfError::ConnectionClosed)` when EOF is reached.
    pub fn read_messages(&mut self) -> Result<Decoded> {
        loop {
            if !self.buf.is_empty() {
                let decoded = self.codec.deserialize(&self.buf[..])?;
                if !decoded.values.is_empty() {
                    self.buf.advance(decoded.consumed);
                    return Ok(decoded);
                }

                let max = self.codec.config().max_message_size;
                if self.buf.len() > max {
                    return Err(AmfError::MessageTooLarge {
                        size: self.buf.len(),
                        max,
                    });
                }
                trace!(pending = self.buf.len(), "waiting for rest of message");
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(AmfError::Io(err)),
            };

            if read == 0 {
                return Err(AmfError::ConnectionClosed {
                    pending: self.buf.len(),
                });
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Bytes received but not yet decoded.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn codec_mut(&mut self) -> &mut Codec {
        &mut self.codec
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::config::CodecConfig;
    use crate::value::Value;

    fn dense_array_bytes() -> Vec<u8> {
        vec![0x09, 0x07, 0x01, 0x04, 0x01, 0x04, 0x02, 0x04, 0x03]
    }

    #[test]
    fn read_buffered_messages() {
        let mut wire = dense_array_bytes();
        wire.push(0x03);

        let mut reader = MessageReader::new(Cursor::new(wire));
        let decoded = reader.read_messages().unwrap();

        assert_eq!(decoded.values.len(), 2);
        assert_eq!(decoded.values[1], Value::Bool(true));
        assert_eq!(reader.pending(), 0);
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: dense_array_bytes(),
            pos: 0,
        };
        let mut reader = MessageReader::new(byte_reader);

        let decoded = reader.read_messages().unwrap();
        let array = decoded.graph.as_array(&decoded.values[0]).unwrap();
        assert_eq!(array.dense.len(), 3);
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = MessageReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_messages().unwrap_err();
        assert!(matches!(err, AmfError::ConnectionClosed { pending: 0 }));
    }

    #[test]
    fn connection_closed_mid_message() {
        let mut reader = MessageReader::new(Cursor::new(vec![0x09, 0x07, 0x01, 0x04]));
        let err = reader.read_messages().unwrap_err();
        assert!(matches!(err, AmfError::ConnectionClosed { pending: 4 }));
    }

    #[test]
    fn oversized_message_in_stream() {
        let codec = Codec::with_config(CodecConfig {
            max_message_size: 2,
            ..CodecConfig::default()
        });
        let input = Cursor::new(vec![0x09, 0x07, 0x01, 0x04]);
        let mut reader = MessageReader::with_codec(input, codec);
        let err = reader.read_messages().unwrap_err();
        assert!(matches!(err, AmfError::MessageTooLarge { size: 4, max: 2 }));
    }

    #[test]
    fn invalid_marker_in_stream() {
        let mut reader = MessageReader::new(Cursor::new(vec![0x7F]));
        let err = reader.read_messages().unwrap_err();
        assert!(matches!(err, AmfError::InvalidMarker(0x7F)));
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            interrupted: false,
            bytes: vec![0x04, 0x05],
        };
        let mut reader = MessageReader::new(reader);
        let decoded = reader.read_messages().unwrap();
        assert_eq!(decoded.values, vec![Value::Integer(5)]);
    }

    #[test]
    fn roundtrip_over_pipe() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::MessageWriter::new(left);
        let mut reader = MessageReader::new(right);

        let graph = crate::value::Graph::new();
        writer.write_message(&graph, &Value::from("ping")).unwrap();
        let decoded = reader.read_messages().unwrap();

        assert_eq!(decoded.values, vec![Value::from("ping")]);
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        bytes: Vec<u8>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let n = self.bytes.len().min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[..n]);
            self.bytes.drain(..n);
            Ok(n)
        }
    }
}
