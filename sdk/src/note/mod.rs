//! Note plaintexts and their fixed serialization
//!
//! Three note kinds live in the pool: standard fungible notes, perpetual
//! position notes and AMM LP notes. A note never appears on the wire in
//! cleartext; only its commitment and its ECIES ciphertext do. The
//! serialized form below is the AEAD plaintext.
//!
//! Layout (amounts little-endian, one kind byte up front):
//!
//! ```text
//! standard: 00 || stealth_pub_x || token_mint || amount u64 || randomness   (105)
//! position: 01 || stealth_pub_x || market_id || is_long u8 || margin u64
//!              || size u64 || leverage u8 || entry_price u64 || randomness  (123)
//! lp:       02 || stealth_pub_x || pool_id || lp_amount u64 || randomness   (105)
//! ```

pub mod commitment;
pub mod encrypted;
pub mod nullifier;

use crate::constants::{MAX_LP_PLAINTEXT, MAX_POSITION_PLAINTEXT, MAX_STANDARD_PLAINTEXT};
use crate::errors::{Result, SdkError};

const KIND_STANDARD: u8 = 0;
const KIND_POSITION: u8 = 1;
const KIND_LP: u8 = 2;

/// A standard fungible note.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Note {
    pub stealth_pub_x: [u8; 32],
    /// Token mint reduced to a field element
    pub token_mint: [u8; 32],
    pub amount: u64,
    pub randomness: [u8; 32],
}

/// A perpetual-futures position note.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PositionNote {
    pub stealth_pub_x: [u8; 32],
    pub market_id: [u8; 32],
    pub is_long: bool,
    pub margin: u64,
    pub size: u64,
    pub leverage: u8,
    pub entry_price: u64,
    pub randomness: [u8; 32],
}

/// An AMM liquidity-provider note.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LpNote {
    pub stealth_pub_x: [u8; 32],
    pub pool_id: [u8; 32],
    pub lp_amount: u64,
    pub randomness: [u8; 32],
}

/// Any note kind, as recovered from a ciphertext.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotePlaintext {
    Standard(Note),
    Position(PositionNote),
    Lp(LpNote),
}

impl NotePlaintext {
    pub fn stealth_pub_x(&self) -> &[u8; 32] {
        match self {
            NotePlaintext::Standard(n) => &n.stealth_pub_x,
            NotePlaintext::Position(n) => &n.stealth_pub_x,
            NotePlaintext::Lp(n) => &n.stealth_pub_x,
        }
    }

    pub fn randomness(&self) -> &[u8; 32] {
        match self {
            NotePlaintext::Standard(n) => &n.randomness,
            NotePlaintext::Position(n) => &n.randomness,
            NotePlaintext::Lp(n) => &n.randomness,
        }
    }

    /// The spendable value of the note (margin for positions, LP units for
    /// LP notes).
    pub fn amount(&self) -> u64 {
        match self {
            NotePlaintext::Standard(n) => n.amount,
            NotePlaintext::Position(n) => n.margin,
            NotePlaintext::Lp(n) => n.lp_amount,
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        match self {
            NotePlaintext::Standard(n) => {
                let mut out = Vec::with_capacity(MAX_STANDARD_PLAINTEXT);
                out.push(KIND_STANDARD);
                out.extend_from_slice(&n.stealth_pub_x);
                out.extend_from_slice(&n.token_mint);
                out.extend_from_slice(&n.amount.to_le_bytes());
                out.extend_from_slice(&n.randomness);
                out
            }
            NotePlaintext::Position(n) => {
                let mut out = Vec::with_capacity(MAX_POSITION_PLAINTEXT);
                out.push(KIND_POSITION);
                out.extend_from_slice(&n.stealth_pub_x);
                out.extend_from_slice(&n.market_id);
                out.push(n.is_long as u8);
                out.extend_from_slice(&n.margin.to_le_bytes());
                out.extend_from_slice(&n.size.to_le_bytes());
                out.push(n.leverage);
                out.extend_from_slice(&n.entry_price.to_le_bytes());
                out.extend_from_slice(&n.randomness);
                out
            }
            NotePlaintext::Lp(n) => {
                let mut out = Vec::with_capacity(MAX_LP_PLAINTEXT);
                out.push(KIND_LP);
                out.extend_from_slice(&n.stealth_pub_x);
                out.extend_from_slice(&n.pool_id);
                out.extend_from_slice(&n.lp_amount.to_le_bytes());
                out.extend_from_slice(&n.randomness);
                out
            }
        }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let (&kind, rest) = bytes.split_first().ok_or(SdkError::DecryptFailure)?;
        match kind {
            KIND_STANDARD => {
                if rest.len() != 104 {
                    return Err(SdkError::DecryptFailure);
                }
                Ok(NotePlaintext::Standard(Note {
                    stealth_pub_x: rest[0..32].try_into().unwrap(),
                    token_mint: rest[32..64].try_into().unwrap(),
                    amount: u64::from_le_bytes(rest[64..72].try_into().unwrap()),
                    randomness: rest[72..104].try_into().unwrap(),
                }))
            }
            KIND_POSITION => {
                if rest.len() != 122 {
                    return Err(SdkError::DecryptFailure);
                }
                Ok(NotePlaintext::Position(PositionNote {
                    stealth_pub_x: rest[0..32].try_into().unwrap(),
                    market_id: rest[32..64].try_into().unwrap(),
                    is_long: rest[64] != 0,
                    margin: u64::from_le_bytes(rest[65..73].try_into().unwrap()),
                    size: u64::from_le_bytes(rest[73..81].try_into().unwrap()),
                    leverage: rest[81],
                    entry_price: u64::from_le_bytes(rest[82..90].try_into().unwrap()),
                    randomness: rest[90..122].try_into().unwrap(),
                }))
            }
            KIND_LP => {
                if rest.len() != 104 {
                    return Err(SdkError::DecryptFailure);
                }
                Ok(NotePlaintext::Lp(LpNote {
                    stealth_pub_x: rest[0..32].try_into().unwrap(),
                    pool_id: rest[32..64].try_into().unwrap(),
                    lp_amount: u64::from_le_bytes(rest[64..72].try_into().unwrap()),
                    randomness: rest[72..104].try_into().unwrap(),
                }))
            }
            _ => Err(SdkError::DecryptFailure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::u64_to_field;

    fn sample_standard() -> Note {
        Note {
            stealth_pub_x: u64_to_field(11),
            token_mint: u64_to_field(22),
            amount: 1_000_000,
            randomness: u64_to_field(33),
        }
    }

    #[test]
    fn test_standard_round_trip() {
        let note = NotePlaintext::Standard(sample_standard());
        let bytes = note.serialize();
        assert_eq!(bytes.len(), 105);
        assert!(bytes.len() <= MAX_STANDARD_PLAINTEXT);
        assert_eq!(NotePlaintext::parse(&bytes).unwrap(), note);
    }

    #[test]
    fn test_position_round_trip_at_cap() {
        let note = NotePlaintext::Position(PositionNote {
            stealth_pub_x: u64_to_field(1),
            market_id: u64_to_field(2),
            is_long: true,
            margin: 500,
            size: 5_000,
            leverage: 10,
            entry_price: 42_000,
            randomness: u64_to_field(3),
        });
        let bytes = note.serialize();
        assert_eq!(bytes.len(), MAX_POSITION_PLAINTEXT);
        assert_eq!(NotePlaintext::parse(&bytes).unwrap(), note);
    }

    #[test]
    fn test_lp_round_trip_at_cap() {
        let note = NotePlaintext::Lp(LpNote {
            stealth_pub_x: u64_to_field(4),
            pool_id: u64_to_field(5),
            lp_amount: 777,
            randomness: u64_to_field(6),
        });
        let bytes = note.serialize();
        assert_eq!(bytes.len(), MAX_LP_PLAINTEXT);
        assert_eq!(NotePlaintext::parse(&bytes).unwrap(), note);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(NotePlaintext::parse(&[]).is_err());
        assert!(NotePlaintext::parse(&[9u8; 105]).is_err());
        let mut truncated = NotePlaintext::Standard(sample_standard()).serialize();
        truncated.pop();
        assert!(NotePlaintext::parse(&truncated).is_err());
    }
}
