//! Unsigned 256-bit integer used for native currency amounts and proof
//! public inputs.
//!
//! Only the operations the escrow and the gates need are provided: checked
//! addition and subtraction, 128-bit halves, big-endian byte conversion and
//! decimal formatting/parsing.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// An unsigned 256-bit integer stored as two 128-bit halves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct U256 {
    hi: u128,
    lo: u128,
}

impl U256 {
    pub const ZERO: U256 = U256 { hi: 0, lo: 0 };
    pub const ONE: U256 = U256 { hi: 0, lo: 1 };
    pub const MAX: U256 = U256 {
        hi: u128::MAX,
        lo: u128::MAX,
    };

    /// Build a value from its high and low 128-bit halves
    pub const fn from_halves(hi: u128, lo: u128) -> Self {
        Self { hi, lo }
    }

    /// The high 128 bits
    pub const fn high_u128(&self) -> u128 {
        self.hi
    }

    /// The low 128 bits
    pub const fn low_u128(&self) -> u128 {
        self.lo
    }

    pub const fn is_zero(&self) -> bool {
        self.hi == 0 && self.lo == 0
    }

    /// True when the value fits in 128 bits
    pub const fn fits_u128(&self) -> bool {
        self.hi == 0
    }

    /// Narrow to `u64`, if the value fits
    pub fn to_u64(&self) -> Option<u64> {
        if self.hi == 0 {
            u64::try_from(self.lo).ok()
        } else {
            None
        }
    }

    pub fn checked_add(self, rhs: U256) -> Option<U256> {
        let (lo, carry) = self.lo.overflowing_add(rhs.lo);
        let hi = self.hi.checked_add(rhs.hi)?.checked_add(carry as u128)?;
        Some(U256 { hi, lo })
    }

    pub fn checked_sub(self, rhs: U256) -> Option<U256> {
        let (lo, borrow) = self.lo.overflowing_sub(rhs.lo);
        let hi = self.hi.checked_sub(rhs.hi)?.checked_sub(borrow as u128)?;
        Some(U256 { hi, lo })
    }

    /// Big-endian 32-byte encoding
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out[..16].copy_from_slice(&self.hi.to_be_bytes());
        out[16..].copy_from_slice(&self.lo.to_be_bytes());
        out
    }

    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        let mut hi = [0u8; 16];
        let mut lo = [0u8; 16];
        hi.copy_from_slice(&bytes[..16]);
        lo.copy_from_slice(&bytes[16..]);
        Self {
            hi: u128::from_be_bytes(hi),
            lo: u128::from_be_bytes(lo),
        }
    }

    // Limbs, most significant first.
    fn limbs(&self) -> [u64; 4] {
        [
            (self.hi >> 64) as u64,
            self.hi as u64,
            (self.lo >> 64) as u64,
            self.lo as u64,
        ]
    }

    fn from_limbs(l: [u64; 4]) -> Self {
        Self {
            hi: ((l[0] as u128) << 64) | l[1] as u128,
            lo: ((l[2] as u128) << 64) | l[3] as u128,
        }
    }

    fn div_rem_u64(self, divisor: u64) -> (U256, u64) {
        let mut rem: u128 = 0;
        let mut quot = [0u64; 4];
        for (i, limb) in self.limbs().iter().enumerate() {
            let cur = (rem << 64) | *limb as u128;
            quot[i] = (cur / divisor as u128) as u64;
            rem = cur % divisor as u128;
        }
        (U256::from_limbs(quot), rem as u64)
    }

    fn checked_mul_add_u64(self, mul: u64, add: u64) -> Option<U256> {
        let mut carry: u128 = add as u128;
        let mut out = [0u64; 4];
        let limbs = self.limbs();
        for i in (0..4).rev() {
            let cur = limbs[i] as u128 * mul as u128 + carry;
            out[i] = cur as u64;
            carry = cur >> 64;
        }
        if carry != 0 {
            return None;
        }
        Some(U256::from_limbs(out))
    }
}

impl From<u64> for U256 {
    fn from(v: u64) -> Self {
        Self { hi: 0, lo: v as u128 }
    }
}

impl From<u128> for U256 {
    fn from(v: u128) -> Self {
        Self { hi: 0, lo: v }
    }
}

impl From<bool> for U256 {
    fn from(v: bool) -> Self {
        Self {
            hi: 0,
            lo: v as u128,
        }
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hi.cmp(&other.hi).then(self.lo.cmp(&other.lo))
    }
}

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0");
        }
        // 10^19 is the largest power of ten below 2^64
        const CHUNK: u64 = 10_000_000_000_000_000_000;
        let mut chunks = Vec::new();
        let mut cur = *self;
        while !cur.is_zero() {
            let (q, r) = cur.div_rem_u64(CHUNK);
            chunks.push(r);
            cur = q;
        }
        let mut out = String::new();
        for (i, chunk) in chunks.iter().rev().enumerate() {
            if i == 0 {
                out.push_str(&chunk.to_string());
            } else {
                out.push_str(&format!("{:019}", chunk));
            }
        }
        f.pad_integral(true, "", &out)
    }
}

/// Error returned when parsing a decimal `U256` fails
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseU256Error {
    #[error("empty string")]
    Empty,
    #[error("invalid digit in {0:?}")]
    InvalidDigit(String),
    #[error("value overflows 256 bits")]
    Overflow,
}

impl FromStr for U256 {
    type Err = ParseU256Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseU256Error::Empty);
        }
        let s = s.replace('_', "");
        let mut acc = U256::ZERO;
        for c in s.chars() {
            let digit = c
                .to_digit(10)
                .ok_or_else(|| ParseU256Error::InvalidDigit(s.clone()))?;
            acc = acc
                .checked_mul_add_u64(10, digit as u64)
                .ok_or(ParseU256Error::Overflow)?;
        }
        Ok(acc)
    }
}

impl Serialize for U256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for U256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
