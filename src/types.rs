//! AVM ledger type definitions: token types, NFT keys, VM operands, messages, block reasons.

use std::fmt;

use primitive_types::U256;

use crate::config::{
    BLOCK_TAG_BREAKPOINT, BLOCK_TAG_ERROR, BLOCK_TAG_HALT, BLOCK_TAG_INBOX, BLOCK_TAG_NOT,
    BLOCK_TAG_SEND, TOKEN_CLASS_SIZE, TOKEN_DISCRIMINATOR_FUNGIBLE, TOKEN_DISCRIMINATOR_INDEX,
    TOKEN_TYPE_SIZE,
};
use crate::errors::CodecError;

// ============================================================================
// Token type
// ============================================================================

/// 21-byte token identifier: 20-byte class id followed by the fungibility discriminator.
/// Ordering is byte-lexicographic, which is the canonical serialization order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenType(pub [u8; TOKEN_TYPE_SIZE]);

impl TokenType {
    /// Build a token type from a class id and a discriminator byte.
    #[must_use]
    pub fn new(class: [u8; TOKEN_CLASS_SIZE], discriminator: u8) -> Self {
        let mut bytes = [0u8; TOKEN_TYPE_SIZE];
        bytes[..TOKEN_CLASS_SIZE].copy_from_slice(&class);
        bytes[TOKEN_DISCRIMINATOR_INDEX] = discriminator;
        Self(bytes)
    }

    /// Fungible class id (discriminator 0).
    #[must_use]
    pub fn fungible(class: [u8; TOKEN_CLASS_SIZE]) -> Self {
        Self::new(class, TOKEN_DISCRIMINATOR_FUNGIBLE)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; TOKEN_TYPE_SIZE] {
        &self.0
    }

    #[must_use]
    pub const fn discriminator(&self) -> u8 {
        self.0[TOKEN_DISCRIMINATOR_INDEX]
    }

    /// True for fungible token classes.
    #[must_use]
    pub fn is_token(&self) -> bool {
        crate::codec::is_token(self)
    }

    #[must_use]
    pub fn to_operand(&self) -> U256 {
        crate::codec::token_type_to_operand(self)
    }

    /// Lossy: keeps the high 21 bytes of `value`.
    #[must_use]
    pub fn from_operand(value: &U256) -> Self {
        crate::codec::token_type_from_operand(value)
    }
}

impl TryFrom<&[u8]> for TokenType {
    type Error = CodecError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let array: [u8; TOKEN_TYPE_SIZE] = bytes
            .try_into()
            .map_err(|_| CodecError::InvalidTokenTypeLength(bytes.len()))?;
        Ok(Self(array))
    }
}

impl From<[u8; TOKEN_TYPE_SIZE]> for TokenType {
    fn from(bytes: [u8; TOKEN_TYPE_SIZE]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

/// Composite key of one non-fungible instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NftKey {
    pub token_type: TokenType,
    pub id: U256,
}

impl NftKey {
    #[must_use]
    pub const fn new(token_type: TokenType, id: U256) -> Self {
        Self { token_type, id }
    }
}

// ============================================================================
// VM operand
// ============================================================================

/// VM operand as seen by this crate. The interpreter owns the full value system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Int(U256),
    Tuple(Vec<Value>),
    CodePoint(u64),
}

impl Value {
    #[must_use]
    pub fn as_int(&self) -> Option<&U256> {
        match self {
            Value::Int(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(elements) => Some(elements),
            _ => None,
        }
    }
}

impl From<U256> for Value {
    fn from(v: U256) -> Self {
        Value::Int(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::CodePoint(pc) => write!(f, "CodePoint({pc})"),
            Value::Tuple(elements) => {
                f.write_str("Tuple(")?;
                for (i, e) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{e}")?;
                }
                f.write_str(")")
            }
        }
    }
}

// ============================================================================
// Message
// ============================================================================

/// Cross-contract transfer record. `data` passes through the codec untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub data: Value,
    pub destination: U256,
    /// Amount for fungible tokens, instance id for NFTs.
    pub currency: U256,
    pub token: TokenType,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Message({}, {}, {}, {})",
            self.data, self.destination, self.currency, self.token
        )
    }
}

// ============================================================================
// Block reason
// ============================================================================

/// Wire tag of each block reason variant.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockType {
    Not = BLOCK_TAG_NOT,
    Halt = BLOCK_TAG_HALT,
    Error = BLOCK_TAG_ERROR,
    Breakpoint = BLOCK_TAG_BREAKPOINT,
    Inbox = BLOCK_TAG_INBOX,
    Send = BLOCK_TAG_SEND,
}

impl TryFrom<u8> for BlockType {
    type Error = CodecError;

    fn try_from(tag: u8) -> Result<Self, CodecError> {
        match tag {
            BLOCK_TAG_NOT => Ok(BlockType::Not),
            BLOCK_TAG_HALT => Ok(BlockType::Halt),
            BLOCK_TAG_ERROR => Ok(BlockType::Error),
            BLOCK_TAG_BREAKPOINT => Ok(BlockType::Breakpoint),
            BLOCK_TAG_INBOX => Ok(BlockType::Inbox),
            BLOCK_TAG_SEND => Ok(BlockType::Send),
            other => Err(CodecError::UnknownBlockTag(other)),
        }
    }
}

/// Why the machine stopped after one run attempt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BlockReason {
    /// Ran out of allotted steps; resumable immediately.
    #[default]
    NotBlocked,
    HaltBlocked,
    ErrorBlocked,
    BreakpointBlocked,
    /// Waiting for an inbox message at or after `inbox`.
    InboxBlocked { inbox: U256 },
    /// The ledger cannot cover `currency` of `token_type`.
    SendBlocked { currency: U256, token_type: TokenType },
}

impl BlockReason {
    #[must_use]
    pub const fn block_type(&self) -> BlockType {
        match self {
            BlockReason::NotBlocked => BlockType::Not,
            BlockReason::HaltBlocked => BlockType::Halt,
            BlockReason::ErrorBlocked => BlockType::Error,
            BlockReason::BreakpointBlocked => BlockType::Breakpoint,
            BlockReason::InboxBlocked { .. } => BlockType::Inbox,
            BlockReason::SendBlocked { .. } => BlockType::Send,
        }
    }

    #[must_use]
    pub const fn is_resumable(&self) -> bool {
        matches!(self, BlockReason::NotBlocked)
    }
}
