//! Block reason codec: `[tag][payload]`.
//! Inbox = tag ⊕ inbox[32]; Send = tag ⊕ currency[32] ⊕ token_type[21]; others are tag only.

use tracing::debug;

use crate::codec::{encode_uint256, ByteReader};
use crate::config::{BLOCK_INBOX_SIZE, BLOCK_SEND_SIZE, BLOCK_TAG_SIZE};
use crate::errors::{CodecError, CodecResult};
use crate::types::{BlockReason, BlockType};

/// Exact encoded length for each block type.
#[must_use]
pub const fn encoded_block_reason_len(block_type: BlockType) -> usize {
    match block_type {
        BlockType::Not | BlockType::Halt | BlockType::Error | BlockType::Breakpoint => BLOCK_TAG_SIZE,
        BlockType::Inbox => BLOCK_INBOX_SIZE,
        BlockType::Send => BLOCK_SEND_SIZE,
    }
}

#[must_use]
pub fn encode_block_reason(reason: &BlockReason) -> Vec<u8> {
    let block_type = reason.block_type();
    let mut out = Vec::with_capacity(encoded_block_reason_len(block_type));
    out.push(block_type as u8);
    match reason {
        BlockReason::NotBlocked
        | BlockReason::HaltBlocked
        | BlockReason::ErrorBlocked
        | BlockReason::BreakpointBlocked => {}
        BlockReason::InboxBlocked { inbox } => {
            out.extend_from_slice(&encode_uint256(inbox));
        }
        BlockReason::SendBlocked { currency, token_type } => {
            out.extend_from_slice(&encode_uint256(currency));
            out.extend_from_slice(token_type.as_bytes());
        }
    }
    out
}

/// Decode a block reason. The buffer must be exactly the variant's length.
pub fn decode_block_reason(data: &[u8]) -> CodecResult<BlockReason> {
    let result = decode_inner(data);
    if let Err(ref e) = result {
        debug!(len = data.len(), error = %e, "block reason rejected");
    }
    result
}

fn decode_inner(data: &[u8]) -> CodecResult<BlockReason> {
    let mut reader = ByteReader::new(data);
    let block_type = BlockType::try_from(reader.read_u8()?)?;

    let expected = encoded_block_reason_len(block_type);
    if data.len() < expected {
        return Err(CodecError::Truncated {
            need: expected,
            have: data.len(),
        });
    }

    let reason = match block_type {
        BlockType::Not => BlockReason::NotBlocked,
        BlockType::Halt => BlockReason::HaltBlocked,
        BlockType::Error => BlockReason::ErrorBlocked,
        BlockType::Breakpoint => BlockReason::BreakpointBlocked,
        BlockType::Inbox => BlockReason::InboxBlocked {
            inbox: reader.read_uint256()?,
        },
        BlockType::Send => {
            let currency = reader.read_uint256()?;
            let token_type = reader.read_token_type()?;
            BlockReason::SendBlocked { currency, token_type }
        }
    };
    reader.finish()?;
    Ok(reason)
}

impl BlockReason {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        encode_block_reason(self)
    }

    pub fn decode(data: &[u8]) -> CodecResult<Self> {
        decode_block_reason(data)
    }
}
