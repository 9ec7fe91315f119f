//! Per-account balance tracker: fungible balances and owned NFT instances.
//!
//! Serialized form (counts are big-endian u32, every uint256 is 32 bytes big-endian):
//!
//! ```text
//! [fungible count] [token_type[21] ⊕ balance[32]]*
//! [nft count]      [token_type[21] ⊕ id[32]]*
//! ```
//!
//! Entries are written in ascending token type order (NFTs: token type, then id), and
//! zero balances are omitted, so equal ledgers serialize to identical bytes.
//!
//! The tracker does no locking. Callers that share one across threads must run
//! `can_spend`/`spend` under a single critical section (see `state_wrapper`).

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use primitive_types::U256;
use tracing::debug;

use crate::codec::{encode_uint256, ByteReader};
use crate::config::{LEDGER_COUNT_SIZE, LEDGER_ENTRY_SIZE};
use crate::crypto::blake2b256;
use crate::errors::{CodecError, CodecResult, LedgerError};
use crate::types::{BlockReason, Message, NftKey, TokenType};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BalanceTracker {
    token_lookup: BTreeMap<TokenType, U256>,
    nft_lookup: BTreeSet<NftKey>,
}

impl BalanceTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fungible balance; missing entries read as zero.
    ///
    /// # Panics
    /// If `tok_type` is non-fungible. Callers check `TokenType::is_token` first.
    #[must_use]
    pub fn token_value(&self, tok_type: &TokenType) -> U256 {
        assert!(
            tok_type.is_token(),
            "token_value on non-fungible token type {tok_type}"
        );
        self.token_lookup.get(tok_type).copied().unwrap_or_default()
    }

    /// # Panics
    /// If `tok_type` is fungible.
    #[must_use]
    pub fn has_nft(&self, tok_type: &TokenType, id: &U256) -> bool {
        assert!(
            !tok_type.is_token(),
            "has_nft on fungible token type {tok_type}"
        );
        self.nft_lookup.contains(&NftKey::new(*tok_type, *id))
    }

    /// For NFT classes `amount` is the instance id.
    #[must_use]
    pub fn can_spend(&self, tok_type: &TokenType, amount: &U256) -> bool {
        if tok_type.is_token() {
            *amount <= self.token_value(tok_type)
        } else {
            self.has_nft(tok_type, amount)
        }
    }

    /// Debit `amount` (or give up NFT `amount`). Returns false and leaves the
    /// tracker untouched when the spend is not covered.
    pub fn spend(&mut self, tok_type: &TokenType, amount: &U256) -> bool {
        if !self.can_spend(tok_type, amount) {
            debug!(token_type = %tok_type, %amount, "spend refused");
            return false;
        }

        if tok_type.is_token() {
            if let Entry::Occupied(mut entry) = self.token_lookup.entry(*tok_type) {
                // covered by can_spend
                let rest = *entry.get() - *amount;
                if rest.is_zero() {
                    entry.remove();
                } else {
                    *entry.get_mut() = rest;
                }
            }
        } else {
            self.nft_lookup.remove(&NftKey::new(*tok_type, *amount));
        }
        true
    }

    /// Credit `amount` (or take ownership of NFT `amount`). Re-adding an owned NFT is a no-op.
    ///
    /// # Panics
    /// On fungible balance overflow past 2^256 - 1.
    pub fn add(&mut self, tok_type: &TokenType, amount: &U256) {
        if let Err(e) = self.try_add(tok_type, amount) {
            panic!("{e}");
        }
    }

    /// Checked `add`. On overflow the tracker is unchanged.
    pub fn try_add(&mut self, tok_type: &TokenType, amount: &U256) -> Result<(), LedgerError> {
        if tok_type.is_token() {
            let current = self.token_lookup.get(tok_type).copied().unwrap_or_default();
            let updated = current
                .checked_add(*amount)
                .ok_or(LedgerError::Overflow(*tok_type))?;
            if !updated.is_zero() {
                self.token_lookup.insert(*tok_type, updated);
            }
        } else {
            self.nft_lookup.insert(NftKey::new(*tok_type, *amount));
        }
        Ok(())
    }

    /// Spend for an outgoing message, or the block reason the interpreter should report.
    pub fn send(&mut self, message: &Message) -> Result<(), BlockReason> {
        if self.spend(&message.token, &message.currency) {
            Ok(())
        } else {
            Err(BlockReason::SendBlocked {
                currency: message.currency,
                token_type: message.token,
            })
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.token_lookup.is_empty() && self.nft_lookup.is_empty()
    }

    /// Non-zero fungible balances in token type order.
    pub fn fungible_balances(&self) -> impl Iterator<Item = (&TokenType, &U256)> {
        self.token_lookup.iter().filter(|(_, v)| !v.is_zero())
    }

    /// Owned NFTs in (token type, id) order.
    pub fn nfts(&self) -> impl Iterator<Item = &NftKey> {
        self.nft_lookup.iter()
    }

    // ------------------------------------------------------------------------
    // Checkpoint encoding
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let fungible: Vec<_> = self.fungible_balances().collect();
        let mut out = Vec::with_capacity(
            2 * LEDGER_COUNT_SIZE + (fungible.len() + self.nft_lookup.len()) * LEDGER_ENTRY_SIZE,
        );

        write_count(&mut out, fungible.len());
        for (tok, balance) in fungible {
            out.extend_from_slice(tok.as_bytes());
            out.extend_from_slice(&encode_uint256(balance));
        }

        write_count(&mut out, self.nft_lookup.len());
        for key in &self.nft_lookup {
            out.extend_from_slice(key.token_type.as_bytes());
            out.extend_from_slice(&encode_uint256(&key.id));
        }
        out
    }

    /// Rebuild a tracker from `serialize` output. Counts must match the records that
    /// follow exactly; entries in the wrong section and trailing bytes are rejected.
    pub fn from_bytes(data: &[u8]) -> CodecResult<Self> {
        let mut reader = ByteReader::new(data);
        let mut tracker = Self::new();

        let fungible_count = reader.read_u32_be()? as usize;
        ensure_records(&reader, fungible_count)?;
        for _ in 0..fungible_count {
            let tok = reader.read_token_type()?;
            let balance = reader.read_uint256()?;
            if !tok.is_token() {
                return Err(CodecError::MisclassifiedToken(tok, false));
            }
            tracker
                .try_add(&tok, &balance)
                .map_err(|_| CodecError::BalanceOverflow(tok))?;
        }

        let nft_count = reader.read_u32_be()? as usize;
        ensure_records(&reader, nft_count)?;
        for _ in 0..nft_count {
            let tok = reader.read_token_type()?;
            let id = reader.read_uint256()?;
            if tok.is_token() {
                return Err(CodecError::MisclassifiedToken(tok, true));
            }
            tracker.nft_lookup.insert(NftKey::new(tok, id));
        }

        reader.finish()?;
        Ok(tracker)
    }

    /// BLAKE2b-256 of the canonical serialization.
    #[must_use]
    pub fn digest(&self) -> [u8; 32] {
        blake2b256(&self.serialize())
    }
}

impl TryFrom<&[u8]> for BalanceTracker {
    type Error = CodecError;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        Self::from_bytes(data)
    }
}

/// # Panics
/// If a section holds more than `u32::MAX` entries; the wire count would not fit.
fn write_count(out: &mut Vec<u8>, count: usize) {
    let count = u32::try_from(count).expect("ledger section exceeds u32::MAX entries");
    out.extend_from_slice(&count.to_be_bytes());
}

/// Reject a section header that promises more records than the buffer holds.
fn ensure_records(reader: &ByteReader<'_>, count: usize) -> CodecResult<()> {
    let need = count
        .saturating_mul(LEDGER_ENTRY_SIZE)
        .saturating_add(reader.position());
    if need > reader.len() {
        return Err(CodecError::Truncated {
            need,
            have: reader.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;
    use proptest::prelude::*;

    fn token_a() -> TokenType {
        TokenType::fungible([0x0a; 20])
    }

    fn token_b() -> TokenType {
        TokenType::fungible([0x0b; 20])
    }

    fn nft_class_x() -> TokenType {
        TokenType::new([0x58; 20], 1)
    }

    fn u(v: u64) -> U256 {
        U256::from(v)
    }

    #[test]
    fn fungible_spend_scenario() {
        let mut tracker = BalanceTracker::new();
        tracker.add(&token_a(), &u(100));
        assert!(tracker.can_spend(&token_a(), &u(50)));
        assert!(tracker.spend(&token_a(), &u(50)));
        assert_eq!(tracker.token_value(&token_a()), u(50));
    }

    #[test]
    fn nft_spend_scenario() {
        let mut tracker = BalanceTracker::new();
        tracker.add(&nft_class_x(), &u(7));
        assert!(tracker.has_nft(&nft_class_x(), &u(7)));
        assert!(tracker.spend(&nft_class_x(), &u(7)));
        assert!(!tracker.has_nft(&nft_class_x(), &u(7)));
    }

    #[test]
    fn missing_balance_reads_zero() {
        let tracker = BalanceTracker::new();
        assert_eq!(tracker.token_value(&token_a()), U256::zero());
        assert!(tracker.can_spend(&token_a(), &U256::zero()));
        assert!(!tracker.can_spend(&token_a(), &u(1)));
    }

    #[test]
    fn overspend_leaves_balance_untouched() {
        let mut tracker = BalanceTracker::new();
        tracker.add(&token_a(), &u(10));
        let before = tracker.clone();
        assert!(!tracker.spend(&token_a(), &u(11)));
        assert_eq!(tracker, before);
    }

    #[test]
    fn spend_unknown_nft_fails() {
        let mut tracker = BalanceTracker::new();
        tracker.add(&nft_class_x(), &u(1));
        assert!(!tracker.spend(&nft_class_x(), &u(2)));
        assert!(tracker.has_nft(&nft_class_x(), &u(1)));
    }

    #[test]
    fn re_adding_nft_is_idempotent() {
        let mut tracker = BalanceTracker::new();
        tracker.add(&nft_class_x(), &u(3));
        tracker.add(&nft_class_x(), &u(3));
        assert_eq!(tracker.nfts().count(), 1);
        assert!(tracker.spend(&nft_class_x(), &u(3)));
        assert!(!tracker.has_nft(&nft_class_x(), &u(3)));
    }

    #[test]
    fn spending_full_balance_prunes_entry() {
        let mut tracker = BalanceTracker::new();
        tracker.add(&token_a(), &u(5));
        assert!(tracker.spend(&token_a(), &u(5)));
        assert!(tracker.is_empty());
        assert_eq!(tracker.serialize(), BalanceTracker::new().serialize());
    }

    #[test]
    fn try_add_reports_overflow_without_mutation() {
        let mut tracker = BalanceTracker::new();
        tracker.add(&token_a(), &U256::MAX);
        assert_eq!(
            tracker.try_add(&token_a(), &u(1)),
            Err(LedgerError::Overflow(token_a()))
        );
        assert_eq!(tracker.token_value(&token_a()), U256::MAX);
    }

    #[test]
    #[should_panic(expected = "overflow")]
    fn add_overflow_is_fatal() {
        let mut tracker = BalanceTracker::new();
        tracker.add(&token_a(), &U256::MAX);
        tracker.add(&token_a(), &u(1));
    }

    #[test]
    #[should_panic(expected = "non-fungible")]
    fn token_value_on_nft_class_is_fatal() {
        let _ = BalanceTracker::new().token_value(&nft_class_x());
    }

    #[test]
    #[should_panic(expected = "fungible")]
    fn has_nft_on_fungible_class_is_fatal() {
        let _ = BalanceTracker::new().has_nft(&token_a(), &u(1));
    }

    #[test]
    fn send_blocks_when_uncovered() {
        let mut tracker = BalanceTracker::new();
        tracker.add(&token_a(), &u(10));
        let msg = Message {
            data: Value::Tuple(vec![]),
            destination: u(1),
            currency: u(1000),
            token: token_a(),
        };
        assert_eq!(
            tracker.send(&msg),
            Err(BlockReason::SendBlocked {
                currency: u(1000),
                token_type: token_a()
            })
        );
        assert_eq!(tracker.token_value(&token_a()), u(10));

        let msg = Message { currency: u(4), ..msg };
        assert_eq!(tracker.send(&msg), Ok(()));
        assert_eq!(tracker.token_value(&token_a()), u(6));
    }

    #[test]
    fn serialized_layout() {
        let mut tracker = BalanceTracker::new();
        tracker.add(&token_b(), &u(2));
        tracker.add(&token_a(), &u(1));
        tracker.add(&nft_class_x(), &u(9));

        let bytes = tracker.serialize();
        assert_eq!(bytes.len(), 4 + 2 * 53 + 4 + 53);
        assert_eq!(&bytes[..4], &[0, 0, 0, 2]);
        // sorted: token_a before token_b
        assert_eq!(&bytes[4..25], token_a().as_bytes());
        assert_eq!(bytes[4 + 52], 1);
        assert_eq!(&bytes[57..78], token_b().as_bytes());
        assert_eq!(bytes[57 + 52], 2);
        assert_eq!(&bytes[110..114], &[0, 0, 0, 1]);
        assert_eq!(&bytes[114..135], nft_class_x().as_bytes());
        assert_eq!(bytes[166], 9);
    }

    #[test]
    fn empty_tracker_round_trips() {
        let bytes = BalanceTracker::new().serialize();
        assert_eq!(bytes, vec![0u8; 8]);
        assert_eq!(BalanceTracker::from_bytes(&bytes), Ok(BalanceTracker::new()));
    }

    #[test]
    fn round_trip_keeps_nfts() {
        let mut tracker = BalanceTracker::new();
        tracker.add(&token_a(), &U256::MAX);
        tracker.add(&nft_class_x(), &U256::zero());
        tracker.add(&nft_class_x(), &U256::MAX);
        let restored = BalanceTracker::try_from(tracker.serialize().as_slice()).unwrap();
        assert_eq!(restored, tracker);
        assert_eq!(restored.digest(), tracker.digest());
    }

    #[test]
    fn rejects_missing_nft_section() {
        let mut tracker = BalanceTracker::new();
        tracker.add(&token_a(), &u(1));
        let bytes = tracker.serialize();
        let fungible_only = &bytes[..4 + 53];
        assert!(matches!(
            BalanceTracker::from_bytes(fungible_only),
            Err(CodecError::Truncated { .. })
        ));
    }

    #[test]
    fn rejects_count_larger_than_buffer() {
        let mut bytes = vec![0, 0, 0, 2];
        bytes.extend_from_slice(token_a().as_bytes());
        bytes.extend_from_slice(&[0u8; 32]);
        assert_eq!(
            BalanceTracker::from_bytes(&bytes),
            Err(CodecError::Truncated { need: 110, have: 57 })
        );
    }

    #[test]
    fn section_count_is_big_endian_u32() {
        let mut out = Vec::new();
        write_count(&mut out, 0x0102_0304);
        assert_eq!(out, vec![1, 2, 3, 4]);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    #[should_panic(expected = "exceeds u32::MAX")]
    fn section_count_past_u32_is_fatal() {
        write_count(&mut Vec::new(), u32::MAX as usize + 1);
    }

    #[test]
    fn truncation_reports_absolute_offsets() {
        let mut tracker = BalanceTracker::new();
        tracker.add(&token_a(), &u(1));
        tracker.add(&nft_class_x(), &u(2));
        let bytes = tracker.serialize();
        assert_eq!(bytes.len(), 114);

        // nft header promises one record but only 10 bytes follow it
        let cut = &bytes[..71];
        assert_eq!(
            BalanceTracker::from_bytes(cut),
            Err(CodecError::Truncated { need: 114, have: 71 })
        );
        // cut inside the nft count header, reported by the reader itself
        assert_eq!(
            BalanceTracker::from_bytes(&bytes[..59]),
            Err(CodecError::Truncated { need: 61, have: 59 })
        );
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut bytes = BalanceTracker::new().serialize();
        bytes.push(0xaa);
        assert_eq!(
            BalanceTracker::from_bytes(&bytes),
            Err(CodecError::TrailingBytes(1))
        );
    }

    #[test]
    fn rejects_misplaced_token_types() {
        let mut bytes = vec![0, 0, 0, 1];
        bytes.extend_from_slice(nft_class_x().as_bytes());
        bytes.extend_from_slice(&[0u8; 32]);
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        assert_eq!(
            BalanceTracker::from_bytes(&bytes),
            Err(CodecError::MisclassifiedToken(nft_class_x(), false))
        );

        let mut bytes = vec![0, 0, 0, 0, 0, 0, 0, 1];
        bytes.extend_from_slice(token_a().as_bytes());
        bytes.extend_from_slice(&[0u8; 32]);
        assert_eq!(
            BalanceTracker::from_bytes(&bytes),
            Err(CodecError::MisclassifiedToken(token_a(), true))
        );
    }

    #[test]
    fn duplicate_entries_accumulate_with_checked_add() {
        let mut bytes = vec![0, 0, 0, 2];
        for _ in 0..2 {
            bytes.extend_from_slice(token_a().as_bytes());
            bytes.extend_from_slice(&encode_uint256(&u(3)));
        }
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        let tracker = BalanceTracker::from_bytes(&bytes).unwrap();
        assert_eq!(tracker.token_value(&token_a()), u(6));

        let mut bytes = vec![0, 0, 0, 2];
        for _ in 0..2 {
            bytes.extend_from_slice(token_a().as_bytes());
            bytes.extend_from_slice(&[0xff; 32]);
        }
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        assert_eq!(
            BalanceTracker::from_bytes(&bytes),
            Err(CodecError::BalanceOverflow(token_a()))
        );
    }

    fn arb_uint256() -> impl Strategy<Value = U256> {
        any::<[u8; 32]>().prop_map(|b| U256::from_big_endian(&b))
    }

    fn arb_entry() -> impl Strategy<Value = (TokenType, U256)> {
        (any::<[u8; 20]>(), prop_oneof![Just(0u8), 1u8..], any::<u128>())
            .prop_map(|(class, disc, amount)| (TokenType::new(class, disc), U256::from(amount)))
    }

    proptest! {
        #[test]
        fn add_to_empty_reads_back(class in any::<[u8; 20]>(), amount in arb_uint256()) {
            let tok = TokenType::fungible(class);
            let mut tracker = BalanceTracker::new();
            tracker.add(&tok, &amount);
            prop_assert_eq!(tracker.token_value(&tok), amount);
        }

        #[test]
        fn spend_is_exact_or_refused(balance in arb_uint256(), amount in arb_uint256()) {
            let tok = token_a();
            let mut tracker = BalanceTracker::new();
            tracker.add(&tok, &balance);
            let spent = tracker.spend(&tok, &amount);
            prop_assert_eq!(spent, amount <= balance);
            if spent {
                prop_assert_eq!(tracker.token_value(&tok), balance - amount);
            } else {
                prop_assert_eq!(tracker.token_value(&tok), balance);
            }
        }

        #[test]
        fn serialization_round_trips(entries in proptest::collection::vec(arb_entry(), 0..16)) {
            let mut tracker = BalanceTracker::new();
            for (tok, amount) in &entries {
                tracker.add(tok, amount);
            }
            let restored = BalanceTracker::from_bytes(&tracker.serialize()).unwrap();
            prop_assert_eq!(restored, tracker);
        }

        #[test]
        fn serialization_ignores_insertion_order(entries in proptest::collection::vec(arb_entry(), 0..16)) {
            let mut forward = BalanceTracker::new();
            let mut backward = BalanceTracker::new();
            for (tok, amount) in &entries {
                forward.add(tok, amount);
            }
            for (tok, amount) in entries.iter().rev() {
                backward.add(tok, amount);
            }
            prop_assert_eq!(forward.serialize(), backward.serialize());
        }

        #[test]
        fn truncated_buffers_are_rejected(entries in proptest::collection::vec(arb_entry(), 1..8), cut in any::<prop::sample::Index>()) {
            let mut tracker = BalanceTracker::new();
            for (tok, amount) in &entries {
                tracker.add(tok, amount);
            }
            let bytes = tracker.serialize();
            let cut = cut.index(bytes.len());
            prop_assert!(BalanceTracker::from_bytes(&bytes[..cut]).is_err());
        }
    }
}
