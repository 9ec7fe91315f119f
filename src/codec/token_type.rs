//! Token type classification and operand conversion.
//! The 21 token bytes occupy the most significant end of the 32-byte big-endian operand.

use primitive_types::U256;

use crate::codec::encode_uint256;
use crate::config::{TOKEN_DISCRIMINATOR_FUNGIBLE, TOKEN_DISCRIMINATOR_INDEX, TOKEN_TYPE_SIZE, UINT256_SIZE};
use crate::types::TokenType;

/// Fungible iff the discriminator byte is zero.
#[must_use]
pub fn is_token(tok: &TokenType) -> bool {
    tok.0[TOKEN_DISCRIMINATOR_INDEX] == TOKEN_DISCRIMINATOR_FUNGIBLE
}

/// Token bytes followed by 11 zero bytes, read as a big-endian integer.
#[must_use]
pub fn token_type_to_operand(tok: &TokenType) -> U256 {
    let mut buf = [0u8; UINT256_SIZE];
    buf[..TOKEN_TYPE_SIZE].copy_from_slice(&tok.0);
    U256::from_big_endian(&buf)
}

/// First 21 bytes of the big-endian rendering; the low 11 bytes are dropped.
#[must_use]
pub fn token_type_from_operand(value: &U256) -> TokenType {
    let buf = encode_uint256(value);
    let mut tok = [0u8; TOKEN_TYPE_SIZE];
    tok.copy_from_slice(&buf[..TOKEN_TYPE_SIZE]);
    TokenType(tok)
}
