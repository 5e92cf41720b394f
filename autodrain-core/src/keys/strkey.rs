//! Strkey encoding of ed25519 public keys (`G...`) and secret seeds (`S...`).
//!
//! A strkey is the RFC 4648 base32 encoding (no padding) of
//! `version byte || 32-byte payload || CRC16-XModem (little endian)`.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const VERSION_ACCOUNT_ID: u8 = 6 << 3;
const VERSION_SECRET_SEED: u8 = 18 << 3;

/// Encoded length of a 32-byte payload.
pub const STRKEY_LEN: usize = 56;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrkeyError {
    #[error("expected {STRKEY_LEN} characters, got {0}")]
    Length(usize),

    #[error("invalid base32")]
    Encoding,

    #[error("unexpected version byte")]
    Version,

    #[error("checksum mismatch")]
    Checksum,
}

/// A validated account identifier (ed25519 public key strkey).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AccountId {
    encoded: String,
    key: [u8; 32],
}

impl AccountId {
    pub fn from_public_key(key: [u8; 32]) -> Self {
        Self {
            encoded: encode(VERSION_ACCOUNT_ID, &key),
            key,
        }
    }

    pub fn public_key(&self) -> &[u8; 32] {
        &self.key
    }

    pub fn as_str(&self) -> &str {
        &self.encoded
    }
}

impl FromStr for AccountId {
    type Err = StrkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = decode(VERSION_ACCOUNT_ID, s)?;
        Ok(Self {
            encoded: s.to_owned(),
            key,
        })
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.encoded)
    }
}

/// Decode an `S...` secret seed into the raw ed25519 seed.
pub fn decode_secret_seed(s: &str) -> Result<[u8; 32], StrkeyError> {
    decode(VERSION_SECRET_SEED, s)
}

/// Encode a raw ed25519 seed as an `S...` strkey.
pub fn encode_secret_seed(seed: &[u8; 32]) -> String {
    encode(VERSION_SECRET_SEED, seed)
}

/// Whether `s` has the shape of a secret seed strkey. The checksum is not
/// verified.
pub fn looks_like_secret_seed(s: &str) -> bool {
    s.len() == STRKEY_LEN && s.starts_with('S') && s.bytes().all(|b| b.is_ascii_alphanumeric())
}

fn encode(version: u8, payload: &[u8; 32]) -> String {
    let mut data = Vec::with_capacity(35);
    data.push(version);
    data.extend_from_slice(payload);
    let crc = crc16_xmodem(&data);
    data.extend_from_slice(&crc.to_le_bytes());
    fast32::base32::RFC4648_NOPAD.encode(&data)
}

fn decode(version: u8, s: &str) -> Result<[u8; 32], StrkeyError> {
    if s.len() != STRKEY_LEN {
        return Err(StrkeyError::Length(s.len()));
    }
    let data = fast32::base32::RFC4648_NOPAD
        .decode_str(s)
        .map_err(|_| StrkeyError::Encoding)?;
    let [found_version, body @ .., crc_lo, crc_hi] = data.as_slice() else {
        return Err(StrkeyError::Encoding);
    };
    if *found_version != version {
        return Err(StrkeyError::Version);
    }
    let expected = crc16_xmodem(&data[..data.len() - 2]);
    if expected != u16::from_le_bytes([*crc_lo, *crc_hi]) {
        return Err(StrkeyError::Checksum);
    }
    <[u8; 32]>::try_from(body).map_err(|_| StrkeyError::Encoding)
}

fn crc16_xmodem(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}
