use std::io::{ErrorKind, Write};

use crate::codec::{Codec, Message};
use crate::error::{AmfError, Result};
use crate::value::{Graph, Value};

/// Writes complete AMF3 messages to any `Write` stream.
pub struct MessageWriter<T> {
    inner: T,
    codec: Codec,
}

impl<T: Write> MessageWriter<T> {
    /// Create a new message writer with a default codec.
    pub fn new(inner: T) -> Self {
        Self::with_codec(inner, Codec::new())
    }

    /// Create a new message writer with an explicit codec.
    pub fn with_codec(inner: T, codec: Codec) -> Self {
        Self { inner, codec }
    }

    /// Encode and send one value graph (blocking).
    pub fn write_message(&mut self, graph: &Graph, value: &Value) -> Result<()> {
        let bytes = self.codec.serialize(graph, value)?;

        let max = self.codec.config().max_message_size;
        if bytes.len() > max {
            return Err(AmfError::MessageTooLarge {
                size: bytes.len(),
                max,
            });
        }

        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.inner.write(&bytes[offset..]) {
                Ok(0) => {
                    return Err(AmfError::ConnectionClosed {
                        pending: bytes.len() - offset,
                    })
                }
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(AmfError::Io(err)),
            }
        }

        self.flush()
    }

    pub fn send(&mut self, message: &Message) -> Result<()> {
        self.write_message(&message.graph, &message.value)
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(AmfError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
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
