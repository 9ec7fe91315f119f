//! Checkpoint codecs: token type ⇄ operand, message ⇄ tuple, block reason ⇄ bytes.
//! All 256-bit fields are fixed 32-byte big-endian.

mod block_reason;
mod message;
mod token_type;

pub use block_reason::{decode_block_reason, encode_block_reason, encoded_block_reason_len};
pub use message::{decode_message, encode_message};
pub use token_type::{is_token, token_type_from_operand, token_type_to_operand};

use primitive_types::U256;

use crate::config::{LEDGER_COUNT_SIZE, TOKEN_TYPE_SIZE, UINT256_SIZE};
use crate::errors::{CodecError, CodecResult};
use crate::types::TokenType;

/// Fixed-width big-endian encoding of a 256-bit integer.
#[must_use]
pub fn encode_uint256(value: &U256) -> [u8; UINT256_SIZE] {
    let mut out = [0u8; UINT256_SIZE];
    value.to_big_endian(&mut out);
    out
}

/// Bounds-checked sequential reader over a checkpoint buffer.
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) const fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Bytes consumed so far.
    pub(crate) const fn position(&self) -> usize {
        self.offset
    }

    pub(crate) const fn len(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub(crate) fn take(&mut self, count: usize) -> CodecResult<&'a [u8]> {
        if count > self.remaining() {
            return Err(CodecError::Truncated {
                need: self.offset + count,
                have: self.data.len(),
            });
        }
        let slice = &self.data[self.offset..self.offset + count];
        self.offset += count;
        Ok(slice)
    }

    pub(crate) fn read_u8(&mut self) -> CodecResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn read_u32_be(&mut self) -> CodecResult<u32> {
        let bytes = self.take(LEDGER_COUNT_SIZE)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn read_uint256(&mut self) -> CodecResult<U256> {
        Ok(U256::from_big_endian(self.take(UINT256_SIZE)?))
    }

    pub(crate) fn read_token_type(&mut self) -> CodecResult<TokenType> {
        TokenType::try_from(self.take(TOKEN_TYPE_SIZE)?)
    }

    /// Fails if anything is left unread.
    pub(crate) fn finish(self) -> CodecResult<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}
