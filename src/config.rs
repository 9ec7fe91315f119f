//! AVM ledger wire constants (token type layout, checkpoint record sizes, block reason tags).
//! Every 256-bit field on the wire is exactly UINT256_SIZE bytes, big-endian.

// ============================================================================
// Token Type Layout
// ============================================================================
pub const TOKEN_TYPE_SIZE: usize = 21;
/// Opaque class identifier (conventionally a contract address).
pub const TOKEN_CLASS_SIZE: usize = 20;
/// Last byte: 0 = fungible, anything else = non-fungible.
pub const TOKEN_DISCRIMINATOR_INDEX: usize = 20;
pub const TOKEN_DISCRIMINATOR_FUNGIBLE: u8 = 0;

// ============================================================================
// Integer Width
// ============================================================================
/// Native VM integer width. Balances, NFT ids, inbox sequence numbers and send amounts.
pub const UINT256_SIZE: usize = 32;

// ============================================================================
// Balance Tracker Serialization
// ============================================================================
/// Entry count header (big-endian u32) preceding each section.
pub const LEDGER_COUNT_SIZE: usize = 4;
/// One record: token type followed by balance (fungible) or instance id (NFT).
pub const LEDGER_ENTRY_SIZE: usize = TOKEN_TYPE_SIZE + UINT256_SIZE; // 53

// ============================================================================
// Message Tuple
// ============================================================================
pub const MESSAGE_TUPLE_SIZE: usize = 4;

// ============================================================================
// Block Reason Tags (stable; never reassign)
// ============================================================================
pub const BLOCK_TAG_NOT: u8 = 0;
pub const BLOCK_TAG_HALT: u8 = 1;
pub const BLOCK_TAG_ERROR: u8 = 2;
pub const BLOCK_TAG_BREAKPOINT: u8 = 3;
pub const BLOCK_TAG_INBOX: u8 = 4;
pub const BLOCK_TAG_SEND: u8 = 5;

pub const BLOCK_TAG_SIZE: usize = 1;
pub const BLOCK_INBOX_SIZE: usize = BLOCK_TAG_SIZE + UINT256_SIZE; // 33
pub const BLOCK_SEND_SIZE: usize = BLOCK_TAG_SIZE + UINT256_SIZE + TOKEN_TYPE_SIZE; // 54
