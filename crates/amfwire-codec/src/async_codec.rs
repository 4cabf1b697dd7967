//! `tokio_util::codec` integration for framed async streams.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{Codec, Message};
use crate::deserializer::Decoded;
use crate::error::{AmfError, Result};

/// Decodes batches of complete messages and encodes single messages.
#[derive(Debug, Clone, Default)]
pub struct AmfCodec {
    codec: Codec,
}

impl AmfCodec {
    pub fn new(codec: Codec) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn codec_mut(&mut self) -> &mut Codec {
        &mut self.codec
    }
}

impl Decoder for AmfCodec {
    type Item = Decoded;
    type Error = AmfError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Decoded>> {
        if src.is_empty() {
            return Ok(None);
        }

        let decoded = self.codec.deserialize(&src[..])?;
        if decoded.values.is_empty() {
            let max = self.codec.config().max_message_size;
            if src.len() > max {
                return Err(AmfError::MessageTooLarge {
                    size: src.len(),
                    max,
                });
            }
            return Ok(None);
        }

        src.advance(decoded.consumed);
        Ok(Some(decoded))
    }
}

impl Encoder<Message> for AmfCodec {
    type Error = AmfError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<()> {
        let bytes = self.codec.serialize_message(&item)?;
        dst.reserve(bytes.len());
        dst.put_slice(&bytes);
        Ok(())
    }
}
