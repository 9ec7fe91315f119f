//! Ledger and codec errors.

use thiserror::Error;

use crate::types::TokenType;

/// Malformed input while decoding a message, a block reason or a serialized balance tracker.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// `need` is the buffer length the record requires, `have` the actual buffer length.
    #[error("Buffer truncated: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },

    #[error("Trailing bytes after record: {0}")]
    TrailingBytes(usize),

    #[error("Unknown block reason tag: {0}")]
    UnknownBlockTag(u8),

    #[error("Invalid token type length: expected 21, got {0}")]
    InvalidTokenTypeLength(usize),

    #[error("Message is not a tuple")]
    NotATuple,

    #[error("Message tuple has {0} elements, expected 4")]
    WrongArity(usize),

    #[error("Message field `{0}` is not an integer")]
    NotAnInteger(&'static str),

    #[error("Token type {0} is in the wrong section (fungible = {1})")]
    MisclassifiedToken(TokenType, bool),

    #[error("Balance overflow while loading token type {0}")]
    BalanceOverflow(TokenType),
}

/// Checked arithmetic failure on the balance tracker.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Arithmetic overflow on token type {0}")]
    Overflow(TokenType),
}

/// Result type for decode operations
pub type CodecResult<T> = Result<T, CodecError>;
