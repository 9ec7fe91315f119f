//! AVM balance tracker and block reason codec: NAPI bindings for the checkpoint loader.
//! Structure mirrors the PVM crate (config, types, codec, crypto, state_wrapper).
//!
//! Token types cross the boundary as 21-byte Buffers, 256-bit integers as BigInt.
//! Contract violations (wrong token class, overflow) come back as JS errors, never panics.

pub mod balance_tracker;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod errors;
mod state_wrapper;
pub mod types;

use napi::bindgen_prelude::{BigInt, *};
use napi_derive::napi;
use primitive_types::U256;

pub use balance_tracker::BalanceTracker;
pub use errors::{CodecError, CodecResult, LedgerError};
pub use types::{BlockReason, BlockType, Message, NftKey, TokenType, Value};

use crate::codec::encode_block_reason;
use state_wrapper::{
    get_state, init_state, load_balances_impl, reset_state, set_block_reason_impl,
    spend_or_block_impl, CheckpointState,
};

// --- Argument conversion ---

fn token_arg(token: &Buffer) -> Result<TokenType> {
    TokenType::try_from(token.as_ref()).map_err(|e| Error::from_reason(e.to_string()))
}

/// BigInt words are little-endian u64 limbs, same as U256.
fn uint256_arg(value: &BigInt) -> Result<U256> {
    let is_zero = value.words.iter().all(|&w| w == 0);
    if value.sign_bit && !is_zero {
        return Err(Error::from_reason("uint256 argument must not be negative"));
    }
    if value.words.iter().skip(4).any(|&w| w != 0) {
        return Err(Error::from_reason("uint256 argument exceeds 256 bits"));
    }
    let mut limbs = [0u64; 4];
    for (limb, &w) in limbs.iter_mut().zip(value.words.iter()) {
        *limb = w;
    }
    Ok(U256(limbs))
}

fn uint256_ret(value: U256) -> BigInt {
    BigInt {
        sign_bit: false,
        words: value.0.to_vec(),
    }
}

fn require_fungible(token: &TokenType, fungible: bool) -> Result<()> {
    if token.is_token() == fungible {
        return Ok(());
    }
    let kind = if fungible { "fungible" } else { "non-fungible" };
    Err(Error::from_reason(format!("token type {token} is not {kind}")))
}

// --- State lifecycle ---

#[napi]
pub fn init() {
    init_state();
}

#[napi]
pub fn reset() {
    reset_state();
}

// --- Balance tracker ---

#[napi]
pub fn is_token(token: Buffer) -> Result<bool> {
    Ok(token_arg(&token)?.is_token())
}

#[napi]
pub fn token_value(token: Buffer) -> Result<BigInt> {
    let tok = token_arg(&token)?;
    require_fungible(&tok, true)?;
    let g = get_state();
    Ok(uint256_ret(
        g.as_ref().map_or(U256::zero(), |s| s.balances.token_value(&tok)),
    ))
}

#[napi]
pub fn has_nft(token: Buffer, id: BigInt) -> Result<bool> {
    let tok = token_arg(&token)?;
    require_fungible(&tok, false)?;
    let id = uint256_arg(&id)?;
    let g = get_state();
    Ok(g.as_ref().map_or(false, |s| s.balances.has_nft(&tok, &id)))
}

#[napi]
pub fn can_spend(token: Buffer, amount: BigInt) -> Result<bool> {
    let tok = token_arg(&token)?;
    let amount = uint256_arg(&amount)?;
    let g = get_state();
    Ok(g.as_ref().map_or_else(
        || BalanceTracker::new().can_spend(&tok, &amount),
        |s| s.balances.can_spend(&tok, &amount),
    ))
}

#[napi]
pub fn spend(token: Buffer, amount: BigInt) -> Result<bool> {
    let tok = token_arg(&token)?;
    let amount = uint256_arg(&amount)?;
    let mut g = get_state();
    Ok(g.get_or_insert_with(CheckpointState::default)
        .balances
        .spend(&tok, &amount))
}

/// Like `spend`, but a refused spend sets the block reason to SendBlocked.
#[napi]
pub fn spend_or_block(token: Buffer, amount: BigInt) -> Result<bool> {
    let tok = token_arg(&token)?;
    let amount = uint256_arg(&amount)?;
    Ok(spend_or_block_impl(&tok, &amount))
}

#[napi]
pub fn add(token: Buffer, amount: BigInt) -> Result<()> {
    let tok = token_arg(&token)?;
    let amount = uint256_arg(&amount)?;
    let mut g = get_state();
    g.get_or_insert_with(CheckpointState::default)
        .balances
        .try_add(&tok, &amount)
        .map_err(|e| Error::from_reason(e.to_string()))
}

#[napi]
pub fn serialize_balances() -> Buffer {
    let g = get_state();
    g.as_ref()
        .map_or_else(
            || BalanceTracker::new().serialize(),
            |s| s.balances.serialize(),
        )
        .into()
}

/// Returns false (state unchanged) when the buffer is malformed.
#[napi]
pub fn load_balances(data: Buffer) -> bool {
    load_balances_impl(data.as_ref()).is_ok()
}

#[napi]
pub fn get_balances_digest() -> Buffer {
    let g = get_state();
    g.as_ref()
        .map_or_else(|| BalanceTracker::new().digest(), |s| s.balances.digest())
        .to_vec()
        .into()
}

// --- Block reason ---

#[napi]
pub fn get_block_reason() -> Buffer {
    let g = get_state();
    g.as_ref()
        .map_or_else(
            || encode_block_reason(&BlockReason::NotBlocked),
            |s| encode_block_reason(&s.block_reason),
        )
        .into()
}

/// Returns false (reason unchanged) when the buffer is malformed.
#[napi]
pub fn set_block_reason(data: Buffer) -> bool {
    set_block_reason_impl(data.as_ref()).is_ok()
}

/// Decode then re-encode. For equivalence tests against the TS codec.
#[napi]
pub fn round_trip_block_reason(data: Buffer) -> Option<Buffer> {
    BlockReason::decode(data.as_ref())
        .ok()
        .map(|reason| reason.encode().into())
}

// --- Token type operands ---

#[napi]
pub fn token_type_to_operand(token: Buffer) -> Result<BigInt> {
    Ok(uint256_ret(token_arg(&token)?.to_operand()))
}

#[napi]
pub fn token_type_from_operand(value: BigInt) -> Result<Buffer> {
    let value = uint256_arg(&value)?;
    Ok(TokenType::from_operand(&value).0.to_vec().into())
}
