//! Singleton checkpoint state for NAPI: one balance tracker and the current block reason.
//! Check-then-act sequences run under a single lock acquisition.

use std::sync::{Mutex, MutexGuard};

use primitive_types::U256;
use tracing::{info, warn};

use crate::balance_tracker::BalanceTracker;
use crate::errors::CodecResult;
use crate::types::{BlockReason, TokenType};

/// Global checkpoint state for NAPI.
#[derive(Clone, Debug, Default)]
pub struct CheckpointState {
    pub balances: BalanceTracker,
    pub block_reason: BlockReason,
}

static STATE: Mutex<Option<CheckpointState>> = Mutex::new(None);

pub fn get_state() -> MutexGuard<'static, Option<CheckpointState>> {
    // A panic inside a ledger call (fatal invariant) must not wedge every later call.
    STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn init_state() {
    *get_state() = Some(CheckpointState::default());
}

pub fn reset_state() {
    let mut g = get_state();
    if let Some(s) = g.as_mut() {
        *s = CheckpointState::default();
        info!("checkpoint state reset");
    }
}

/// Replace the balances with a decoded checkpoint. On failure the current state is kept.
pub fn load_balances_impl(data: &[u8]) -> CodecResult<()> {
    let tracker = BalanceTracker::from_bytes(data).map_err(|e| {
        warn!(len = data.len(), error = %e, "rejected balance checkpoint");
        e
    })?;
    let mut g = get_state();
    let state = g.get_or_insert_with(CheckpointState::default);
    state.balances = tracker;
    info!(len = data.len(), "balance checkpoint loaded");
    Ok(())
}

/// Replace the block reason with a decoded checkpoint. On failure the current reason is kept.
pub fn set_block_reason_impl(data: &[u8]) -> CodecResult<()> {
    let reason = BlockReason::decode(data).map_err(|e| {
        warn!(len = data.len(), error = %e, "rejected block reason checkpoint");
        e
    })?;
    let mut g = get_state();
    g.get_or_insert_with(CheckpointState::default).block_reason = reason;
    Ok(())
}

/// Spend under one lock. A refused spend records `SendBlocked` as the current block reason.
pub fn spend_or_block_impl(token: &TokenType, amount: &U256) -> bool {
    let mut g = get_state();
    let state = g.get_or_insert_with(CheckpointState::default);
    if state.balances.spend(token, amount) {
        true
    } else {
        state.block_reason = BlockReason::SendBlocked {
            currency: *amount,
            token_type: *token,
        };
        false
    }
}

/// Serializes tests that touch the global state.
#[cfg(test)]
pub(crate) static TEST_LOCK: Mutex<()> = Mutex::new(());
